use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;

use crate::error::{ChainError, Result};

/// Token appended after each document of a joined corpus.
pub const END_OF_TEXT: &str = "<| end of text |>";

static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());

/// Puts a whole document on one line: line breaks become spaces and runs of
/// spaces are collapsed.
pub fn flatten_document(text: &str) -> String {
	SPACES.replace_all(&text.replace('\n', " "), " ").into_owned()
}

/// Concatenates documents into one corpus, each followed by [`END_OF_TEXT`].
pub fn join_documents<S: AsRef<str>>(documents: &[S]) -> String {
	let mut corpus = String::new();
	for document in documents {
		corpus.push_str(&flatten_document(document.as_ref()));
		corpus.push(' ');
		corpus.push_str(END_OF_TEXT);
		corpus.push(' ');
	}
	corpus
}

/// Documents partitioned into a training and a test set.
#[derive(Clone, Debug, PartialEq)]
pub struct CorpusSplit<T> {
	pub train: Vec<T>,
	pub test: Vec<T>,
}

/// Shuffles `documents` with `rng` and holds out `ceil(len × test_ratio)` of them.
///
/// # Errors
/// Returns an error if `test_ratio` is not within `[0, 1]`.
pub fn split_documents<T, R: Rng + ?Sized>(
	mut documents: Vec<T>,
	test_ratio: f64,
	rng: &mut R,
) -> Result<CorpusSplit<T>> {
	if !(0.0..=1.0).contains(&test_ratio) {
		return Err(ChainError::InvalidRequest(format!(
			"test ratio must be between 0.0 and 1.0, got {test_ratio}"
		)));
	}

	documents.shuffle(rng);
	let test_size = (documents.len() as f64 * test_ratio).ceil() as usize;
	let test = documents.split_off(documents.len() - test_size);

	Ok(CorpusSplit { train: documents, test })
}

/// Word counts of a corpus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorpusSummary {
	pub unique_words: usize,
	pub total_words: usize,
}

impl CorpusSummary {
	/// Counts whitespace-separated words, ignoring those listed in `exclude`.
	///
	/// Excluded entries spanning several words (such as [`END_OF_TEXT`]) are
	/// removed from the text before splitting.
	pub fn from_text(text: &str, exclude: &[&str]) -> Self {
		let mut flat = text.to_owned();
		for phrase in exclude.iter().filter(|e| e.contains(char::is_whitespace)) {
			flat = flat.replace(phrase, " ");
		}

		let mut counter: HashMap<&str, usize> = HashMap::new();
		for word in flat.split_whitespace() {
			if !exclude.contains(&word) {
				*counter.entry(word).or_insert(0) += 1;
			}
		}

		Self { unique_words: counter.len(), total_words: counter.values().sum() }
	}
}

impl fmt::Display for CorpusSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unique words: {}, total words: {}", self.unique_words, self.total_words)
	}
}
