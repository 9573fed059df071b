use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use super::transition::{SparseRow, TransitionMatrix};
use crate::error::{ChainError, Result};
use crate::text::vocabulary::Vocabulary;

/// Added to probabilities before taking their logarithm.
pub const TEMPERATURE_EPSILON: f64 = 1e-10;

/// Checks that a temperature is usable for reweighting.
///
/// # Errors
/// Returns [`ChainError::InvalidTemperature`] unless `temperature` is finite and > 0.
pub fn validate_temperature(temperature: f64) -> Result<f64> {
	if temperature.is_finite() && temperature > 0.0 {
		Ok(temperature)
	} else {
		Err(ChainError::InvalidTemperature(temperature))
	}
}

/// Sampling weights of a row at a given temperature.
///
/// At `temperature == 1` the row probabilities are returned untouched.
/// Otherwise each nonzero `p` becomes `exp(ln(p + ε) / temperature)` and the
/// weights are renormalized. Only the row's support is reweighted, so an
/// unobserved token can never gain mass.
///
/// The largest log-weight is subtracted before exponentiating: the result
/// is the same distribution, but it cannot underflow to all zeros at very
/// low temperatures.
pub fn apply_temperature(row: &SparseRow, temperature: f64) -> Vec<(usize, f64)> {
	if temperature == 1.0 || row.is_zero() {
		return row.entries().to_vec();
	}

	let scaled: Vec<(usize, f64)> = row
		.entries()
		.iter()
		.map(|&(token, p)| (token, (p + TEMPERATURE_EPSILON).ln() / temperature))
		.collect();
	let max = scaled.iter().map(|(_, w)| *w).fold(f64::NEG_INFINITY, f64::max);

	let weights: Vec<(usize, f64)> = scaled.into_iter().map(|(token, w)| (token, (w - max).exp())).collect();
	let total: f64 = weights.iter().map(|(_, w)| w).sum();

	weights.into_iter().map(|(token, w)| (token, w / total)).collect()
}

/// Draws next tokens from the rows of a transition matrix.
#[derive(Clone, Copy, Debug)]
pub struct Sampler<'a> {
	matrix: &'a TransitionMatrix,
	tokens: &'a Vocabulary,
	ngrams: &'a Vocabulary,
}

impl<'a> Sampler<'a> {
	pub fn new(matrix: &'a TransitionMatrix, tokens: &'a Vocabulary, ngrams: &'a Vocabulary) -> Self {
		Self { matrix, tokens, ngrams }
	}

	/// Draws the index of the token following `context`.
	///
	/// # Errors
	/// - [`ChainError::UnknownContext`] if `context` has no row
	/// - [`ChainError::EmptyContinuation`] if the row was never observed
	/// - [`ChainError::InvalidTemperature`] for a non-positive temperature
	pub fn sample_index<R: Rng + ?Sized>(&self, context: &str, temperature: f64, rng: &mut R) -> Result<usize> {
		let temperature = validate_temperature(temperature)?;
		let row = self
			.ngrams
			.index_of(context)
			.and_then(|i| self.matrix.row(i))
			.ok_or_else(|| ChainError::UnknownContext(context.to_owned()))?;
		if row.is_zero() {
			return Err(ChainError::EmptyContinuation(context.to_owned()));
		}

		let weights = apply_temperature(row, temperature);
		let distribution = WeightedIndex::new(weights.iter().map(|(_, w)| *w))
			.map_err(|e| ChainError::InvalidModel(format!("row of '{context}': {e}")))?;

		Ok(weights[distribution.sample(rng)].0)
	}

	/// Draws the token following `context`.
	pub fn sample<R: Rng + ?Sized>(&self, context: &str, temperature: f64, rng: &mut R) -> Result<&'a str> {
		let index = self.sample_index(context, temperature, rng)?;
		self.tokens
			.symbol_at(index)
			.ok_or_else(|| ChainError::InvalidModel(format!("token index {index} out of vocabulary")))
	}
}
