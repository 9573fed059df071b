use thiserror::Error;

/// Errors raised while training, loading or sampling a Markov chain model.
///
/// Recoverable prefix problems are not errors: they are reported as a
/// [`Diagnostic`](crate::model::prefix::Diagnostic) next to the substituted context.
#[derive(Error, Debug)]
pub enum ChainError {
	#[error("corpus too short: {tokens} token(s) cannot form an ngram of order {n}")]
	DegenerateCorpus { tokens: usize, n: usize },

	#[error("ngram order must be >= 1, got {0}")]
	InvalidOrder(usize),

	#[error("corpus ngram '{0}' collides with the reserved unknown symbol")]
	ReservedSymbol(String),

	#[error("context '{0}' has no observed continuation")]
	EmptyContinuation(String),

	#[error("context '{0}' is not part of the model")]
	UnknownContext(String),

	#[error("temperature must be a finite value > 0, got {0}")]
	InvalidTemperature(f64),

	#[error("invalid model: {0}")]
	InvalidModel(String),

	#[error("invalid request: {0}")]
	InvalidRequest(String),

	#[error("model '{0}' not found")]
	ModelNotFound(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Serialization error: {0}")]
	Serialization(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, ChainError>;
