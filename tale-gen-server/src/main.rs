use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use clap::Parser;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;

use tale_gen_core::ChainError;
use tale_gen_core::io::list_files;
use tale_gen_core::model::generator::Generator;
use tale_gen_core::model::request::GenerationRequest;

/// Server configuration.
#[derive(Parser, Debug)]
#[command(about = "HTTP front-end of the tale generator")]
struct Config {
	#[arg(long, default_value = "127.0.0.1")]
	host: String,
	#[arg(long, default_value = "5000")]
	port: u16,
	#[arg(long, default_value = "./data", help = "Directory of .txt corpora (one model per file)")]
	data: PathBuf,
	#[arg(short = 'n', long, default_value = "2", help = "Number of tokens in a context")]
	order: usize,
}

/// Struct representing query parameters for the `/v1/generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	model: String,
	prefix: Option<String>,
	k: Option<usize>,
	samples: Option<usize>,
	temperature: Option<f64>,
	seed: Option<u64>,
}

impl GenerateParams {
	/// Builds a validated generation request.
	fn request(&self) -> Result<GenerationRequest, ChainError> {
		let mut request = GenerationRequest::new(self.prefix.as_deref().unwrap_or(""), self.k.unwrap_or(50));
		request.set_samples(self.samples.unwrap_or(1))?;
		request.set_temperature(self.temperature.unwrap_or(1.0))?;
		Ok(request)
	}
}

/// Maps a library error to an HTTP response.
fn error_response(error: ChainError) -> HttpResponse {
	match error {
		ChainError::ModelNotFound(_) => HttpResponse::NotFound().body(error.to_string()),
		ChainError::InvalidTemperature(_) | ChainError::InvalidRequest(_) => {
			HttpResponse::BadRequest().body(error.to_string())
		}
		_ => HttpResponse::InternalServerError().body(error.to_string()),
	}
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `samples` texts with the requested model.
/// Returns the texts separated by blank lines.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<Generator>, query: web::Query<GenerateParams>) -> impl Responder {
	let request = match query.request() {
		Ok(r) => r,
		Err(e) => return error_response(e),
	};

	let mut rng = match query.seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_os_rng(),
	};

	match data.generate(&query.model, &request, &mut rng) {
		Ok(texts) => HttpResponse::Ok().body(texts.join("\n\n")),
		Err(e) => {
			warn!("generation with model '{}' failed: {e}", query.model);
			error_response(e)
		}
	}
}

/// HTTP GET endpoint `/v1/models`: corpora available in the data directory.
#[get("/v1/models")]
async fn get_models(config: web::Data<PathBuf>) -> impl Responder {
	match list_files(config.as_path(), "txt") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".txt", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list models"),
	}
}

/// HTTP GET endpoint `/v1/loaded_models`: models ready to generate.
#[get("/v1/loaded_models")]
async fn get_loaded_models(data: web::Data<Generator>) -> impl Responder {
	HttpResponse::Ok().body(data.model_names().join("\n"))
}

/// Main entry point for the server.
///
/// Loads (or trains) one model per corpus of the data directory and serves
/// them. Models are read-only, so handlers share them without locking.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let config = Config::parse();

	let generator = Generator::new(&config.data, config.order)
		.map_err(|e| std::io::Error::other(format!("Failed to load models: {e}")))?;
	info!("{} model(s) loaded from {}", generator.model_names().len(), config.data.display());

	let generator = web::Data::new(generator);
	let data_dir = web::Data::new(config.data.clone());

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(generator.clone())
			.app_data(data_dir.clone())
			.service(get_generated)
			.service(get_models)
			.service(get_loaded_models)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await
}
