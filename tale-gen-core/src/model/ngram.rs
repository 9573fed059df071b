use crate::error::{ChainError, Result};
use crate::text::vocabulary::{UNKNOWN_TOKEN, Vocabulary};

/// Separator placed between the tokens of an ngram symbol.
pub const NGRAM_SEPARATOR: &str = " ";

/// Joins a window of tokens into an ngram symbol.
pub fn join_ngram<S: AsRef<str>>(window: &[S]) -> String {
	window.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(NGRAM_SEPARATOR)
}

/// Sliding-window view of a token sequence at a fixed order `n`.
///
/// Window `i` covers `tokens[i..i + n]`; there are `L - n + 1` of them.
/// Only the first `L - n` windows have a successor token and form training
/// pairs, but the last window still gets a vocabulary entry so that it can
/// be matched as a generation context.
///
/// # Invariants
/// - `n >= 1`
/// - `windows.len() == L - n + 1 >= 1`
/// - `windows[i]` is the vocabulary index of `ngram_i`
#[derive(Clone, Debug)]
pub struct NgramIndex {
	n: usize,
	/// Ngram symbols in corpus order.
	ngrams: Vec<String>,
	/// Vocabulary index of each entry of `ngrams`.
	windows: Vec<usize>,
	/// Distinct ngrams in first-occurrence order, plus the unknown sentinel.
	vocabulary: Vocabulary,
}

impl NgramIndex {
	/// Slides a window of size `n` over `tokens`.
	///
	/// # Errors
	/// - [`ChainError::InvalidOrder`] if `n < 1`
	/// - [`ChainError::DegenerateCorpus`] if there are fewer than `n` tokens
	/// - [`ChainError::ReservedSymbol`] if an ngram spells the unknown sentinel
	pub fn new<S: AsRef<str>>(tokens: &[S], n: usize) -> Result<Self> {
		if n < 1 {
			return Err(ChainError::InvalidOrder(n));
		}
		if tokens.len() < n {
			return Err(ChainError::DegenerateCorpus { tokens: tokens.len(), n });
		}

		let ngrams: Vec<String> = tokens.windows(n).map(join_ngram).collect();
		// The sentinel row must stay unused by training
		if let Some(ngram) = ngrams.iter().find(|g| g.as_str() == UNKNOWN_TOKEN) {
			return Err(ChainError::ReservedSymbol(ngram.clone()));
		}
		let vocabulary = Vocabulary::from_symbols(&ngrams);
		// Every ngram was just inserted, so the lookup cannot miss
		let windows = ngrams.iter().map(|g| vocabulary.index_or_unknown(g)).collect();

		Ok(Self { n, ngrams, windows, vocabulary })
	}

	pub fn order(&self) -> usize {
		self.n
	}

	/// All ngrams in corpus order (`L - n + 1` entries).
	pub fn ngrams(&self) -> &[String] {
		&self.ngrams
	}

	/// Distinct ngrams in first-occurrence order.
	pub fn distinct(&self) -> &[String] {
		self.vocabulary.known_symbols()
	}

	pub fn vocabulary(&self) -> &Vocabulary {
		&self.vocabulary
	}

	pub fn into_vocabulary(self) -> Vocabulary {
		self.vocabulary
	}

	/// Number of training pairs (`L - n`).
	pub fn pair_count(&self) -> usize {
		self.windows.len() - 1
	}

	/// Training pairs `(ngram_index, position of the next token)` for pair
	/// indices in `range`.
	///
	/// Pair `i` links window `i` to `tokens[i + n]`.
	pub fn pairs(&self, range: std::ops::Range<usize>) -> impl Iterator<Item = (usize, usize)> + '_ {
		let end = range.end.min(self.pair_count());
		let start = range.start.min(end);
		(start..end).map(move |i| (self.windows[i], i + self.n))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TOKENS: [&str; 6] = ["the", "cat", "sat", "on", "the", "mat"];

	#[test]
	fn bigrams_cover_every_window() {
		let index = NgramIndex::new(&TOKENS, 2).unwrap();
		assert_eq!(index.ngrams(), ["the cat", "cat sat", "sat on", "on the", "the mat"]);
		assert_eq!(index.distinct(), index.ngrams());
		assert_eq!(index.vocabulary().len(), 6);
		assert_eq!(index.pair_count(), 4);
	}

	#[test]
	fn last_window_has_no_pair() {
		let index = NgramIndex::new(&TOKENS, 2).unwrap();
		let pairs: Vec<_> = index.pairs(0..usize::MAX).collect();
		assert_eq!(pairs, [(0, 2), (1, 3), (2, 4), (3, 5)]);
	}

	#[test]
	fn repeated_ngrams_share_an_index() {
		let index = NgramIndex::new(&["a", "a", "a"], 1).unwrap();
		assert_eq!(index.ngrams().len(), 3);
		assert_eq!(index.distinct(), ["a"]);
		let pairs: Vec<_> = index.pairs(0..2).collect();
		assert_eq!(pairs, [(0, 1), (0, 2)]);
	}

	#[test]
	fn corpus_shorter_than_order_is_rejected() {
		assert!(matches!(
			NgramIndex::new(&["a", "b"], 3),
			Err(ChainError::DegenerateCorpus { tokens: 2, n: 3 })
		));
		assert!(matches!(NgramIndex::new(&TOKENS, 0), Err(ChainError::InvalidOrder(0))));
	}

	#[test]
	fn ngram_spelling_the_sentinel_is_rejected() {
		let tokens = crate::text::tokenize("a <| unknown |> b");
		assert!(matches!(
			NgramIndex::new(&tokens, 3),
			Err(ChainError::ReservedSymbol(g)) if g == UNKNOWN_TOKEN
		));
		assert!(matches!(NgramIndex::new(&["a", UNKNOWN_TOKEN], 1), Err(ChainError::ReservedSymbol(_))));
		assert!(NgramIndex::new(&tokens, 2).is_ok());
	}

	#[test]
	fn single_window_corpus_has_no_pairs() {
		let index = NgramIndex::new(&["a", "b"], 2).unwrap();
		assert_eq!(index.pair_count(), 0);
		assert_eq!(index.pairs(0..10).count(), 0);
	}
}
