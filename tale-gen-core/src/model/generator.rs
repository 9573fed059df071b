use std::collections::HashMap;
use std::path::Path;

use log::info;
use rand::Rng;

use crate::error::{ChainError, Result};
use crate::io;
use crate::model::chain::TrainedModel;
use crate::model::request::GenerationRequest;

/// High-level generator managing several named Markov chain models.
///
/// # Responsibilities
/// - Load or train one `TrainedModel` per corpus file of a directory
/// - Route generation requests to a model by name
///
/// Models are never mutated after loading, so a `Generator` can be shared
/// between threads behind a plain `Arc`.
#[derive(Debug, Default)]
pub struct Generator {
	models: HashMap<String, TrainedModel>,
}

impl Generator {
	/// Creates a generator from every `.txt` corpus of a directory.
	///
	/// # Parameters
	/// - `filepath`: Path to a directory containing corpus files.
	///   Both `"folder"` and `"folder/"` are accepted.
	/// - `n`: Order of the models.
	///
	/// # Behavior
	/// - Each corpus is loaded from its `<stem>.n<N>.bin` cache when present,
	///   otherwise trained and cached (see [`TrainedModel::load_or_train`]).
	/// - The model name is the file name without extension.
	///
	/// # Errors
	/// - Returns an error if the path is not a directory.
	/// - Returns an error if a model fails to load or train.
	pub fn new<P: AsRef<Path>>(filepath: P, n: usize) -> Result<Self> {
		let mut generator = Self::default();

		let folder = io::normalize_folder(&filepath.as_ref().to_string_lossy());
		if !folder.is_dir() {
			return Err(ChainError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Expected a directory, got: {}", folder.display()),
			)));
		}

		for file in io::list_files(&folder, "txt")? {
			let full_path = folder.join(&file);
			let model = TrainedModel::load_or_train(&full_path, n)?;
			generator.insert(&io::get_filename(&full_path)?, model)?;
		}

		Ok(generator)
	}

	/// Registers a model under `name`.
	///
	/// # Errors
	/// Returns an error if a model with that name is already loaded.
	pub fn insert(&mut self, name: &str, model: TrainedModel) -> Result<()> {
		if self.models.contains_key(name) {
			return Err(ChainError::InvalidModel(format!("model '{name}' already loaded")));
		}
		info!("model '{name}' ready ({})", model.summary());
		self.models.insert(name.to_owned(), model);
		Ok(())
	}

	/// Names of the loaded models, sorted.
	pub fn model_names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.models.keys().cloned().collect();
		names.sort();
		names
	}

	pub fn model(&self, name: &str) -> Result<&TrainedModel> {
		self.models
			.get(name)
			.ok_or_else(|| ChainError::ModelNotFound(name.to_owned()))
	}

	/// Runs a bulk generation on the model called `name`.
	///
	/// # Returns
	/// - `Ok(Vec<String>)` with `request.samples()` generated texts
	/// - `Err(ChainError::ModelNotFound)` for an unknown name
	/// - Any error raised by [`TrainedModel::bulk_generate`]
	pub fn generate<R: Rng + ?Sized>(&self, name: &str, request: &GenerationRequest, rng: &mut R) -> Result<Vec<String>> {
		self.model(name)?.bulk_generate(
			&request.prefix,
			request.k,
			request.samples(),
			request.temperature(),
			rng,
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn generator() -> Generator {
		let mut generator = Generator::default();
		let model = TrainedModel::train(&["the", "cat", "sat", "on", "the", "mat"], 2).unwrap();
		generator.insert("cats", model).unwrap();
		generator
	}

	#[test]
	fn routes_requests_by_name() {
		let generator = generator();
		let mut request = GenerationRequest::new("the cat", 2);
		request.set_samples(2).unwrap();
		let texts = generator.generate("cats", &request, &mut StdRng::seed_from_u64(0)).unwrap();
		assert_eq!(texts, ["the cat sat on", "the cat sat on"]);
		assert_eq!(generator.model_names(), ["cats"]);
	}

	#[test]
	fn unknown_model_is_reported() {
		let generator = generator();
		let request = GenerationRequest::new("the cat", 2);
		assert!(matches!(
			generator.generate("dogs", &request, &mut StdRng::seed_from_u64(0)),
			Err(ChainError::ModelNotFound(name)) if name == "dogs"
		));
	}

	#[test]
	fn names_are_unique() {
		let mut generator = generator();
		let model = TrainedModel::train(&["a", "b"], 1).unwrap();
		assert!(generator.insert("cats", model).is_err());
	}
}
