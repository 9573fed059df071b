use std::fmt;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ngram::{NGRAM_SEPARATOR, NgramIndex, join_ngram};
use super::prefix::{Diagnostic, PrefixResolver, Resolution};
use super::sampler::{Sampler, validate_temperature};
use super::transition::{CountMatrix, TransitionMatrix};
use crate::error::{ChainError, Result};
use crate::io::{build_model_path, read_text};
use crate::text::format::join_tokens;
use crate::text::tokenizer::tokenize;
use crate::text::vocabulary::Vocabulary;

/// Word-level n-gram Markov chain trained on a corpus.
///
/// The model holds two vocabularies (tokens and distinct ngrams) and a
/// row-normalized sparse transition matrix of shape
/// `(ngram vocabulary, token vocabulary)`. It is immutable once trained:
/// generation only reads it, so one model can serve concurrent requests
/// behind a shared reference.
///
/// # Invariants
/// - `n >= 1`
/// - `matrix.shape() == (ngrams.len(), tokens.len())`
/// - `ngrams` holds at least one corpus ngram besides the sentinel
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrainedModel {
	n: usize,
	tokens: Vocabulary,
	ngrams: Vocabulary,
	matrix: TransitionMatrix,
}

/// Size figures of a trained model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelSummary {
	pub order: usize,
	pub distinct_tokens: usize,
	pub distinct_ngrams: usize,
	pub observed_rows: usize,
	pub nnz: usize,
}

impl fmt::Display for ModelSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"ngrams level: {}, distinct tokens: {}, distinct ngrams: {}, observed contexts: {}, transitions: {}",
			self.order,
			self.distinct_tokens,
			self.distinct_ngrams,
			self.observed_rows,
			self.nnz
		)
	}
}

/// A generated text and the tokens it was assembled from.
#[derive(Clone, Debug, PartialEq)]
pub struct Generation {
	pub text: String,
	/// Resolved context tokens followed by the sampled ones.
	pub tokens: Vec<String>,
	/// Set when the caller prefix was replaced by a random context.
	pub diagnostic: Option<Diagnostic>,
}

impl TrainedModel {
	/// Trains a model of order `n`, building the token vocabulary from `tokens`.
	///
	/// # Errors
	/// Fails with [`ChainError::InvalidOrder`] or [`ChainError::DegenerateCorpus`]
	/// when no ngram of order `n` can be formed.
	pub fn train<S: AsRef<str>>(tokens: &[S], n: usize) -> Result<Self> {
		Self::train_with_vocabulary(tokens, Vocabulary::from_symbols(tokens), n)
	}

	/// Trains against an existing token vocabulary.
	///
	/// Tokens missing from `vocabulary` are counted under its unknown index.
	pub fn train_with_vocabulary<S: AsRef<str>>(tokens: &[S], vocabulary: Vocabulary, n: usize) -> Result<Self> {
		Self::build(tokens, vocabulary, n, 1)
	}

	/// Trains with the counting spread over `partitions` worker threads.
	///
	/// Each worker counts a contiguous range of training pairs into its own
	/// [`CountMatrix`]; partial counts are summed before the single
	/// normalization pass, so the result equals [`TrainedModel::train`].
	pub fn train_parallel<S: AsRef<str>>(tokens: &[S], n: usize, partitions: usize) -> Result<Self> {
		Self::build(tokens, Vocabulary::from_symbols(tokens), n, partitions)
	}

	fn build<S: AsRef<str>>(tokens: &[S], vocabulary: Vocabulary, n: usize, partitions: usize) -> Result<Self> {
		let index = NgramIndex::new(tokens, n)?;
		let next_tokens: Vec<usize> = tokens.iter().map(|t| vocabulary.index_or_unknown(t.as_ref())).collect();
		let shape = (index.vocabulary().len(), vocabulary.len());

		let pairs = index.pair_count();
		let partitions = partitions.clamp(1, pairs.max(1));
		let counts = if partitions == 1 {
			count_pairs(&index, &next_tokens, shape, 0..pairs)
		} else {
			let chunk_size = pairs.div_ceil(partitions);
			let (tx, rx) = mpsc::channel();
			thread::scope(|scope| {
				for start in (0..pairs).step_by(chunk_size) {
					let tx = tx.clone();
					let (index, next_tokens) = (&index, &next_tokens);
					scope.spawn(move || {
						let range = start..(start + chunk_size).min(pairs);
						debug!("counting training pairs {range:?}");
						let partial = count_pairs(index, next_tokens, shape, range);
						tx.send(partial).expect("Failed to send from thread");
					});
				}
			});
			drop(tx);

			let mut counts = CountMatrix::new(shape.0, shape.1);
			for partial in rx.iter() {
				counts.merge(&partial)?;
			}
			counts
		};

		info!(
			"total tokens: {}, ngrams level: {}, total ngrams: {}",
			tokens.len(),
			n,
			index.ngrams().len()
		);
		let model = Self {
			n,
			tokens: vocabulary,
			matrix: TransitionMatrix::from_counts(&counts),
			ngrams: index.into_vocabulary(),
		};
		info!("{}", model.summary());
		Ok(model)
	}

	/// Rebuilds a model from its vocabularies and matrix triples.
	///
	/// # Errors
	/// Returns [`ChainError::InvalidModel`] if the order is zero, the shape does
	/// not match the vocabularies, there is no corpus ngram, or the triples are invalid
	/// (see [`TransitionMatrix::from_triples`]).
	pub fn from_parts(
		n: usize,
		tokens: Vocabulary,
		ngrams: Vocabulary,
		shape: (usize, usize),
		triples: &[(usize, usize, f64)],
	) -> Result<Self> {
		let matrix = TransitionMatrix::from_triples(shape, triples)?;
		let model = Self { n, tokens, ngrams, matrix };
		model.validate()?;
		Ok(model)
	}

	/// Checks the invariants that deserialization alone cannot guarantee.
	fn validate(&self) -> Result<()> {
		if self.n < 1 {
			return Err(ChainError::InvalidModel(format!("ngram order must be >= 1, got {}", self.n)));
		}
		let shape = self.matrix.shape();
		if shape != (self.ngrams.len(), self.tokens.len()) {
			return Err(ChainError::InvalidModel(format!(
				"shape {shape:?} does not match vocabularies ({}, {})",
				self.ngrams.len(),
				self.tokens.len()
			)));
		}
		if self.ngrams.known_symbols().is_empty() {
			return Err(ChainError::InvalidModel("no ngram in vocabulary".to_owned()));
		}
		Ok(())
	}

	pub fn order(&self) -> usize {
		self.n
	}

	pub fn token_vocabulary(&self) -> &Vocabulary {
		&self.tokens
	}

	pub fn ngram_vocabulary(&self) -> &Vocabulary {
		&self.ngrams
	}

	/// Distinct ngrams, in first-occurrence order.
	pub fn distinct_ngrams(&self) -> &[String] {
		self.ngrams.known_symbols()
	}

	pub fn matrix(&self) -> &TransitionMatrix {
		&self.matrix
	}

	pub fn summary(&self) -> ModelSummary {
		ModelSummary {
			order: self.n,
			distinct_tokens: self.tokens.known_symbols().len(),
			distinct_ngrams: self.distinct_ngrams().len(),
			observed_rows: self.matrix.observed_rows(),
			nnz: self.matrix.nnz(),
		}
	}

	pub fn resolver(&self) -> PrefixResolver<'_> {
		PrefixResolver::new(self.n, &self.ngrams)
	}

	pub fn sampler(&self) -> Sampler<'_> {
		Sampler::new(&self.matrix, &self.tokens, &self.ngrams)
	}

	/// Resolves `prefix` into a context known to the model.
	pub fn resolve<R: Rng + ?Sized>(&self, prefix: &str, rng: &mut R) -> Resolution {
		self.resolver().resolve(prefix, rng)
	}

	/// Uniformly random distinct ngram, usable as a generation seed.
	pub fn random_ngram<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
		self.resolver().random_ngram(rng)
	}

	/// Resolves `prefix` and samples the single token that follows it.
	pub fn next_token<R: Rng + ?Sized>(&self, prefix: &str, temperature: f64, rng: &mut R) -> Result<String> {
		let resolution = self.resolve(prefix, rng);
		self.sampler()
			.sample(&resolution.context, temperature, rng)
			.map(str::to_owned)
	}

	/// Generates `k` tokens after `prefix` and returns the readable text.
	///
	/// # Errors
	/// - [`ChainError::InvalidTemperature`] for a non-positive temperature
	/// - [`ChainError::EmptyContinuation`] if generation reaches a context
	///   that was never followed by anything in the corpus
	pub fn generate<R: Rng + ?Sized>(&self, prefix: &str, k: usize, temperature: f64, rng: &mut R) -> Result<String> {
		self.generate_detailed(prefix, k, temperature, rng).map(|g| g.text)
	}

	/// Same as [`TrainedModel::generate`], keeping tokens and the prefix diagnostic.
	pub fn generate_detailed<R: Rng + ?Sized>(
		&self,
		prefix: &str,
		k: usize,
		temperature: f64,
		rng: &mut R,
	) -> Result<Generation> {
		let temperature = validate_temperature(temperature)?;
		let resolution = self.resolve(prefix, rng);
		let sampler = self.sampler();

		let mut tokens: Vec<String> = resolution.context.split(NGRAM_SEPARATOR).map(str::to_owned).collect();
		tokens.reserve(k);
		for _ in 0..k {
			let window = join_ngram(&tokens[tokens.len().saturating_sub(self.n)..]);
			let next = sampler.sample(&window, temperature, rng)?;
			tokens.push(next.to_owned());
		}

		Ok(Generation { text: join_tokens(&tokens), tokens, diagnostic: resolution.diagnostic })
	}

	/// Runs [`TrainedModel::generate`] `samples` times with the same parameters.
	///
	/// Each sample consumes fresh draws from `rng`; the first error aborts
	/// the batch.
	pub fn bulk_generate<R: Rng + ?Sized>(
		&self,
		prefix: &str,
		k: usize,
		samples: usize,
		temperature: f64,
		rng: &mut R,
	) -> Result<Vec<String>> {
		(0..samples)
			.map(|_| self.generate(prefix, k, temperature, rng))
			.collect()
	}

	/// Writes the model with `postcard`.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let bytes = postcard::to_stdvec(self)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Reads a model written by [`TrainedModel::save`].
	///
	/// # Errors
	/// Returns [`ChainError::InvalidModel`] if the decoded model breaks the
	/// type invariants (order, shape, at least one ngram).
	pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
		let bytes = std::fs::read(path)?;
		let model: Self = postcard::from_bytes(&bytes)?;
		model.validate()?;
		Ok(model)
	}

	/// Loads the cached model next to a corpus, or trains and caches it.
	///
	/// - The cache path is `<stem>.n<N>.bin` (see [`build_model_path`])
	/// - Training tokenizes the whole corpus and counts on one thread per CPU
	pub fn load_or_train<P: AsRef<Path>>(corpus_path: P, n: usize) -> Result<Self> {
		let model_path = build_model_path(&corpus_path, n)?;
		if model_path.exists() {
			info!("loading cached model {}", model_path.display());
			return Self::load(&model_path);
		}

		let tokens = tokenize(&read_text(&corpus_path)?);
		let model = Self::train_parallel(&tokens, n, num_cpus::get())?;
		model.save(&model_path)?;
		info!("model cached to {}", model_path.display());
		Ok(model)
	}
}

/// Counts training pairs `range` into a fresh matrix of the given shape.
fn count_pairs(
	index: &NgramIndex,
	next_tokens: &[usize],
	shape: (usize, usize),
	range: std::ops::Range<usize>,
) -> CountMatrix {
	let mut counts = CountMatrix::new(shape.0, shape.1);
	for (context, position) in index.pairs(range) {
		counts.add(context, next_tokens[position]);
	}
	counts
}
