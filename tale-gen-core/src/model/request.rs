use crate::error::{ChainError, Result};
use crate::model::sampler::validate_temperature;

/// Parameters of a (bulk) generation.
///
/// # Responsibilities
/// - Carry the prefix and the number of tokens to append (`k`)
/// - Validate the temperature and sample count when they are set
///
/// # Invariants
/// - `temperature` is finite and > 0
/// - `samples >= 1`
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
	/// Text the generation starts from. Only its last `n` tokens matter.
	pub prefix: String,

	/// Number of tokens appended after the prefix.
	pub k: usize,

	/// Number of independent generations.
	samples: usize,

	/// Sampling temperature (1.0 = row probabilities unchanged).
	temperature: f64,
}

impl GenerationRequest {
	/// Creates a request for one sample at temperature 1.
	pub fn new(prefix: &str, k: usize) -> Self {
		Self { prefix: prefix.to_owned(), k, samples: 1, temperature: 1.0 }
	}

	pub fn temperature(&self) -> f64 {
		self.temperature
	}

	pub fn samples(&self) -> usize {
		self.samples
	}

	/// Sets the sampling temperature.
	///
	/// # Errors
	/// Returns an error unless the value is finite and > 0.
	pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
		self.temperature = validate_temperature(temperature)?;
		Ok(())
	}

	/// Sets the number of independent samples.
	///
	/// # Errors
	/// Returns an error if `samples` is 0.
	pub fn set_samples(&mut self, samples: usize) -> Result<()> {
		if samples == 0 {
			return Err(ChainError::InvalidRequest("samples must be >= 1".to_owned()));
		}
		self.samples = samples;
		Ok(())
	}
}
