//! N-gram Markov chain text generation library.
//!
//! This crate learns word-level transition probabilities from a corpus and
//! samples pastiche text from them. It provides:
//! - Tokenization and vocabulary indexing of raw corpus text
//! - Sparse, row-normalized transition matrices indexed by n-token contexts
//! - Prefix resolution with random fallback and structured diagnostics
//! - Temperature-controlled sampling and autoregressive generation
//! - Parallel training, postcard persistence and corpus preparation helpers
//!
//! Every random decision goes through a caller-supplied `rand::Rng`, so a
//! seeded generator replays a generation exactly.

/// Error type shared by the whole crate.
pub mod error;

/// Tokenizer, vocabularies and de-tokenization.
pub mod text;

/// Markov chain model: indexing, transition matrix, sampling and generation.
pub mod model;

/// Corpus preparation (document flattening, train/test split, summaries).
pub mod corpus;

/// I/O utilities (file loading, path helpers).
pub mod io;

pub use error::{ChainError, Result};
pub use model::chain::TrainedModel;
