use std::fmt;

use log::warn;
use rand::Rng;

use super::ngram::join_ngram;
use crate::text::vocabulary::Vocabulary;

/// Why a caller prefix could not be used as-is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
	/// Fewer than `n` whitespace-separated tokens.
	PrefixTooShort,
	/// The last `n` tokens do not form a known ngram.
	UnknownContext,
}

/// Report attached to a resolution that substituted a random context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
	pub kind: DiagnosticKind,
	/// Prefix as given by the caller.
	pub prefix: String,
	/// Model order.
	pub expected_len: usize,
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind {
			DiagnosticKind::PrefixTooShort => write!(
				f,
				"prefix '{}' is too short, expected length {}; random ngram used instead",
				self.prefix, self.expected_len
			),
			DiagnosticKind::UnknownContext => write!(
				f,
				"prefix context '{}' is unknown to the model; random ngram used instead",
				self.prefix
			),
		}
	}
}

/// Outcome of [`PrefixResolver::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
	/// Always a distinct ngram of the model.
	pub context: String,
	/// Set when `context` is a random substitute.
	pub diagnostic: Option<Diagnostic>,
}

/// Turns arbitrary caller text into a context known to the model.
///
/// Resolution never fails: an unusable prefix is replaced by a uniformly
/// drawn distinct ngram, and the substitution is logged at warn level and
/// reported through [`Resolution::diagnostic`].
#[derive(Clone, Copy, Debug)]
pub struct PrefixResolver<'a> {
	n: usize,
	ngrams: &'a Vocabulary,
}

impl<'a> PrefixResolver<'a> {
	/// `ngrams` must hold at least one corpus ngram besides the sentinel.
	pub fn new(n: usize, ngrams: &'a Vocabulary) -> Self {
		Self { n, ngrams }
	}

	/// Keeps the last `n` whitespace-separated tokens of `prefix` when they
	/// form a known ngram, otherwise draws a random one from `rng`.
	pub fn resolve<R: Rng + ?Sized>(&self, prefix: &str, rng: &mut R) -> Resolution {
		let tokens: Vec<&str> = prefix.split_whitespace().collect();

		let kind = if tokens.len() < self.n {
			DiagnosticKind::PrefixTooShort
		} else {
			let candidate = join_ngram(&tokens[tokens.len() - self.n..]);
			if self.is_known(&candidate) {
				return Resolution { context: candidate, diagnostic: None };
			}
			DiagnosticKind::UnknownContext
		};

		let diagnostic = Diagnostic { kind, prefix: prefix.to_owned(), expected_len: self.n };
		warn!("{diagnostic}");
		Resolution { context: self.random_ngram(rng), diagnostic: Some(diagnostic) }
	}

	/// Uniformly random distinct ngram.
	pub fn random_ngram<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
		let known = self.ngrams.known_symbols();
		known[rng.random_range(0..known.len())].clone()
	}

	/// Membership in the distinct ngrams; the unknown sentinel is not a member.
	fn is_known(&self, symbol: &str) -> bool {
		self.ngrams
			.index_of(symbol)
			.is_some_and(|i| i != self.ngrams.unknown_index())
	}
}
