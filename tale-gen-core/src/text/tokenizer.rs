use std::sync::LazyLock;

use regex::Regex;

use super::vocabulary::Vocabulary;

/// Punctuation that becomes a token of its own.
const PUNCTUATION_PAD: &[char] = &['!', '?', '.', ',', ':', '-', ';'];

/// Characters dropped from the corpus before tokenization.
const PUNCTUATION_REMOVE: &[char] = &['"', '(', ')', '_', '\n'];

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S)\n(\S)").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());

/// Normalizes raw corpus text so that splitting on a single space yields tokens.
///
/// - Line breaks glued between two words are spaced out first, so that
///   removing them does not merge the words
/// - Quotes, parentheses, underscores and line breaks are removed
/// - Each punctuation mark of `! ? . , : - ;` is padded with spaces
/// - Runs of spaces are collapsed and the result is trimmed
pub fn preprocess(text: &str) -> String {
	let spaced = LINE_BREAK.replace_all(text, "$1 \n $2");

	let mut padded = String::with_capacity(spaced.len());
	for c in spaced.chars() {
		if PUNCTUATION_REMOVE.contains(&c) {
			continue;
		}
		if PUNCTUATION_PAD.contains(&c) {
			padded.push(' ');
			padded.push(c);
			padded.push(' ');
		} else {
			padded.push(c);
		}
	}

	SPACES.replace_all(&padded, " ").trim().to_owned()
}

/// Splits raw text into word and punctuation tokens.
pub fn tokenize(text: &str) -> Vec<String> {
	let content = preprocess(text);
	if content.is_empty() {
		return Vec::new();
	}
	content.split(' ').map(str::to_owned).collect()
}

/// A tokenized text together with the vocabulary used to index it.
#[derive(Clone, Debug)]
pub struct TokenizedText {
	pub tokens: Vec<String>,
	pub vocabulary: Vocabulary,
	/// `tokens` mapped through `vocabulary`; unseen tokens map to the unknown index.
	pub indices: Vec<usize>,
}

impl TokenizedText {
	/// Tokenizes `text` and builds a fresh vocabulary from its tokens.
	pub fn new(text: &str) -> Self {
		let tokens = tokenize(text);
		let vocabulary = Vocabulary::from_symbols(&tokens);
		Self::index(tokens, vocabulary)
	}

	/// Tokenizes `text` against an existing vocabulary (ex. held-out text
	/// indexed with the training vocabulary).
	pub fn with_vocabulary(text: &str, vocabulary: Vocabulary) -> Self {
		Self::index(tokenize(text), vocabulary)
	}

	fn index(tokens: Vec<String>, vocabulary: Vocabulary) -> Self {
		let indices = tokens.iter().map(|t| vocabulary.index_or_unknown(t)).collect();
		Self { tokens, vocabulary, indices }
	}

	/// Number of distinct corpus tokens (sentinel excluded).
	pub fn distinct_tokens(&self) -> usize {
		self.vocabulary.known_symbols().len()
	}
}
