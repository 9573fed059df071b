//! Top-level module for the Markov chain text generator.
//!
//! Training and generation are split into small pieces:
//! - Sliding-window ngram indexing (`NgramIndex`)
//! - Count accumulation and row normalization (`CountMatrix`, `TransitionMatrix`)
//! - Prefix validation with random fallback (`PrefixResolver`)
//! - Temperature-scaled categorical sampling (`Sampler`)
//! - The trained model and its generation loop (`TrainedModel`)
//! - A multi-model front (`Generator`) driven by `GenerationRequest`s

/// Sliding-window ngram indexing of a token sequence.
pub mod ngram;

/// Sparse count and probability matrices.
pub mod transition;

/// Resolution of caller prefixes into known contexts.
pub mod prefix;

/// Temperature reweighting and next-token draws.
pub mod sampler;

/// Trained model: training entrypoints, generation, persistence.
pub mod chain;

/// Generation parameters.
pub mod request;

/// High-level interface over several named models.
pub mod generator;
