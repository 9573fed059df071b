use std::sync::LazyLock;

use regex::Regex;

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r#"\s+([!?"'().,;-])"#).unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").unwrap());

/// Turns space-joined tokens back into readable text.
///
/// Whitespace in front of `! ? " ' ( ) . , ; -` is removed, then runs of
/// spaces are collapsed into one.
///
/// ```
/// use tale_gen_core::text::format::detokenize;
/// assert_eq!(detokenize("word1 ! word2"), "word1! word2");
/// ```
pub fn detokenize(text: &str) -> String {
	let glued = SPACE_BEFORE_PUNCTUATION.replace_all(text, "$1");
	SPACES.replace_all(&glued, " ").into_owned()
}

/// Joins tokens with single spaces and detokenizes the result.
pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
	let joined = tokens.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
	detokenize(&joined)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn punctuation_is_glued_to_previous_word() {
		assert_eq!(detokenize("word1 ! word2"), "word1! word2");
		assert_eq!(detokenize("well , then ."), "well, then.");
		assert_eq!(detokenize("mother - in - law"), "mother- in- law");
	}

	#[test]
	fn spaces_are_collapsed() {
		assert_eq!(detokenize("a   b"), "a b");
	}

	#[test]
	fn colon_keeps_its_space() {
		assert_eq!(detokenize("said : go"), "said : go");
	}

	#[test]
	fn join_tokens_detokenizes() {
		assert_eq!(join_tokens(&["the", "end", "."]), "the end.");
	}
}
