use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Reserved entry appended once at the end of every vocabulary.
pub const UNKNOWN_TOKEN: &str = "<| unknown |>";

/// Bijective mapping between symbols (tokens or ngrams) and dense indices.
///
/// Lookups go through a forward hash map (symbol → index) and a backward
/// dense array (index → symbol). Iteration order is the order in which
/// symbols were first seen, never the hashing order.
///
/// # Invariants
/// - Index range is `[0, len)` and every index maps to exactly one symbol
/// - The last index is always [`UNKNOWN_TOKEN`]
///
/// Serialized as the backward array alone; the forward map is rebuilt on load.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(into = "Vec<String>", try_from = "Vec<String>")]
pub struct Vocabulary {
	/// Index → symbol.
	symbols: Vec<String>,
	/// Symbol → index.
	indices: HashMap<String, usize>,
}

impl Vocabulary {
	/// Builds a vocabulary from a sequence of symbols.
	///
	/// Repeated symbols keep their first index. The unknown sentinel is
	/// appended once after all of them, even if it already appeared.
	pub fn from_symbols<I, S>(symbols: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut vocabulary = Self { symbols: Vec::new(), indices: HashMap::new() };
		for symbol in symbols {
			let symbol = symbol.as_ref();
			if symbol == UNKNOWN_TOKEN || vocabulary.indices.contains_key(symbol) {
				continue;
			}
			vocabulary.indices.insert(symbol.to_owned(), vocabulary.symbols.len());
			vocabulary.symbols.push(symbol.to_owned());
		}
		vocabulary.indices.insert(UNKNOWN_TOKEN.to_owned(), vocabulary.symbols.len());
		vocabulary.symbols.push(UNKNOWN_TOKEN.to_owned());
		vocabulary
	}

	/// Number of entries, the unknown sentinel included.
	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	/// A vocabulary always holds the sentinel, so it is never empty.
	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	/// Index of a symbol, or `None` if it is not part of the vocabulary.
	pub fn index_of(&self, symbol: &str) -> Option<usize> {
		self.indices.get(symbol).copied()
	}

	/// Index of a symbol, falling back to the unknown sentinel.
	pub fn index_or_unknown(&self, symbol: &str) -> usize {
		self.index_of(symbol).unwrap_or_else(|| self.unknown_index())
	}

	/// Symbol stored at `index`.
	pub fn symbol_at(&self, index: usize) -> Option<&str> {
		self.symbols.get(index).map(String::as_str)
	}

	pub fn unknown_index(&self) -> usize {
		self.symbols.len() - 1
	}

	pub fn contains(&self, symbol: &str) -> bool {
		self.indices.contains_key(symbol)
	}

	/// Corpus-derived symbols, in index order, without the sentinel.
	pub fn known_symbols(&self) -> &[String] {
		&self.symbols[..self.unknown_index()]
	}
}

impl From<Vocabulary> for Vec<String> {
	fn from(vocabulary: Vocabulary) -> Self {
		vocabulary.symbols
	}
}

impl TryFrom<Vec<String>> for Vocabulary {
	type Error = String;

	/// Accepts a backward array only if it is duplicate-free and ends with the sentinel.
	fn try_from(symbols: Vec<String>) -> Result<Self, Self::Error> {
		if symbols.last().map(String::as_str) != Some(UNKNOWN_TOKEN) {
			return Err("vocabulary must end with the unknown token".to_owned());
		}
		let indices: HashMap<String, usize> = symbols
			.iter()
			.enumerate()
			.map(|(i, s)| (s.clone(), i))
			.collect();
		if indices.len() != symbols.len() {
			return Err("vocabulary contains duplicate symbols".to_owned());
		}
		Ok(Self { symbols, indices })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sentinel_is_appended_once_at_the_end() {
		let vocabulary = Vocabulary::from_symbols(["b", "a", UNKNOWN_TOKEN, "b"]);
		assert_eq!(vocabulary.len(), 3);
		assert_eq!(vocabulary.index_of("b"), Some(0));
		assert_eq!(vocabulary.index_of("a"), Some(1));
		assert_eq!(vocabulary.index_of(UNKNOWN_TOKEN), Some(2));
		assert_eq!(vocabulary.unknown_index(), 2);
		assert_eq!(vocabulary.known_symbols(), ["b", "a"]);
	}

	#[test]
	fn lookups_are_bijective() {
		let vocabulary = Vocabulary::from_symbols(["the", "cat", "sat"]);
		for i in 0..vocabulary.len() {
			let symbol = vocabulary.symbol_at(i).unwrap();
			assert_eq!(vocabulary.index_of(symbol), Some(i));
		}
		assert_eq!(vocabulary.symbol_at(vocabulary.len()), None);
	}

	#[test]
	fn missing_symbols_fall_back_to_unknown() {
		let vocabulary = Vocabulary::from_symbols(["the"]);
		assert_eq!(vocabulary.index_or_unknown("dog"), vocabulary.unknown_index());
		assert!(!vocabulary.contains("dog"));
	}

	#[test]
	fn backward_array_rebuilds_forward_map() {
		let symbols: Vec<String> = Vocabulary::from_symbols(["x", "y"]).into();
		let vocabulary = Vocabulary::try_from(symbols).unwrap();
		assert_eq!(vocabulary.index_of("y"), Some(1));
	}

	#[test]
	fn malformed_backward_arrays_are_rejected() {
		assert!(Vocabulary::try_from(vec!["x".to_owned()]).is_err());
		let duplicated = vec!["x".to_owned(), "x".to_owned(), UNKNOWN_TOKEN.to_owned()];
		assert!(Vocabulary::try_from(duplicated).is_err());
	}
}
