//! Text handling around the Markov chain: turning corpus text into indexed
//! tokens, and generated tokens back into readable text.

/// Bidirectional symbol ↔ index mapping with a reserved unknown entry.
pub mod vocabulary;

/// Corpus normalization and tokenization.
pub mod tokenizer;

/// Reversal of the tokenizer's spacing conventions.
pub mod format;

pub use format::detokenize;
pub use tokenizer::{TokenizedText, tokenize};
pub use vocabulary::{UNKNOWN_TOKEN, Vocabulary};
