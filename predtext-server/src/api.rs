use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::{HttpResponse, Responder, get, put, web};
use serde::{Deserialize, Serialize};

use predtext_core::PredTextError;
use predtext_core::config::Settings;
use predtext_core::model::chain::Chain;
use predtext_core::model::generator::{Generate, GenerationMode};
use predtext_core::model::prediction::predict;
use predtext_core::store::{ChainStore, FileChainStore, identity_key};

/// State shared by every worker of the server.
///
/// Loaded chains are immutable snapshots: the cache lock is only held to
/// look one up or to insert it, never while generating or predicting.
pub struct SharedData {
	pub settings: Settings,
	pub store: FileChainStore,
	chains: Mutex<HashMap<String, Arc<Chain>>>,
}

impl SharedData {
	pub fn new(settings: Settings) -> Self {
		let store = FileChainStore::new(&settings.data_dir, settings.store_format);
		Self { settings, store, chains: Mutex::new(HashMap::new()) }
	}

	/// Returns the cached chain of `users`, loading it from the store on a miss.
	fn chain_for(&self, users: &[String]) -> Result<Arc<Chain>, PredTextError> {
		let key = identity_key(users);
		if let Some(chain) = self.cached(&key) {
			return Ok(chain);
		}
		self.load(users)
	}

	/// Reads the chain of `users` from the store and replaces the cached copy.
	fn load(&self, users: &[String]) -> Result<Arc<Chain>, PredTextError> {
		let key = identity_key(users);
		let chain = Arc::new(self.store.get_chain(users)?.to_chain()?);
		log::info!("Loaded chain '{key}' ({} prefixes)", chain.len());

		let mut chains = self
			.chains
			.lock()
			.map_err(|_| PredTextError::Config("Chain cache lock failed".to_owned()))?;
		chains.insert(key, Arc::clone(&chain));
		Ok(chain)
	}

	fn cached(&self, key: &str) -> Option<Arc<Chain>> {
		self.chains.lock().ok()?.get(key).cloned()
	}

	fn loaded_keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = match self.chains.lock() {
			Ok(chains) => chains.keys().cloned().collect(),
			Err(_) => Vec::new(),
		};
		keys.sort();
		keys
	}
}

/// Splits a comma separated `users` parameter.
fn parse_users(users: Option<&str>) -> Vec<String> {
	users
		.unwrap_or_default()
		.split(',')
		.map(|s| s.trim().to_owned())
		.filter(|s| !s.is_empty())
		.collect()
}

fn error_response(error: &PredTextError) -> HttpResponse {
	match error {
		PredTextError::NoData(key) => HttpResponse::NotFound()
			.json(ErrorBody { error: format!("No data for '{key}', build the chain first") }),
		PredTextError::InvalidPrefixLength(_) | PredTextError::PrefixLengthMismatch { .. } => {
			HttpResponse::BadRequest().json(ErrorBody { error: error.to_string() })
		}
		_ => {
			log::error!("{error}");
			HttpResponse::InternalServerError().json(ErrorBody { error: error.to_string() })
		}
	}
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
	HttpResponse::BadRequest().json(ErrorBody { error: message.into() })
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
	pub error: String,
}

/// Query parameters of `/api/prediction`.
#[derive(Deserialize)]
struct PredictionQuery {
	input: Option<String>,
	users: Option<String>,
	depth: Option<usize>,
	top: Option<usize>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PredictionResponse {
	pub input: String,
	pub predictions: Vec<String>,
}

/// HTTP GET endpoint `/api/prediction`
///
/// Returns the most likely continuations of `input` for the chain of
/// `users`.
#[get("/api/prediction")]
async fn get_prediction(data: web::Data<SharedData>, query: web::Query<PredictionQuery>) -> impl Responder {
	let input = query.input.clone().unwrap_or_default();
	let users = parse_users(query.users.as_deref());

	let mut options = data.settings.prediction_options();
	if let Some(depth) = query.depth {
		if depth > data.settings.max_prediction_depth {
			return bad_request(format!("depth must be <= {}", data.settings.max_prediction_depth));
		}
		options.depth = depth;
	}
	if let Some(top) = query.top {
		if top == 0 {
			return bad_request("top must be >= 1");
		}
		options.top_n = top;
	}

	let chain = match data.chain_for(&users) {
		Ok(chain) => chain,
		Err(e) => return error_response(&e),
	};

	let phrase = input.clone();
	let predictions = match web::block(move || predict(&chain, &phrase, &options)).await {
		Ok(predictions) => predictions,
		Err(e) => {
			log::error!("Prediction task failed: {e}");
			return HttpResponse::InternalServerError().json(ErrorBody { error: e.to_string() });
		}
	};
	log::debug!("Predicted {} continuations for '{input}'", predictions.len());
	HttpResponse::Ok().json(PredictionResponse { input, predictions })
}

/// Query parameters of `/v1/generate`.
#[derive(Deserialize)]
struct GenerateQuery {
	users: Option<String>,
	length: Option<usize>,
	mode: Option<String>,
	seed: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct GenerateResponse {
	pub text: String,
}

/// HTTP GET endpoint `/v1/generate`
///
/// Generates `length` words (or sentences) from the chain of `users`.
#[get("/v1/generate")]
async fn get_generated(data: web::Data<SharedData>, query: web::Query<GenerateQuery>) -> impl Responder {
	let length = query.length.unwrap_or(20);
	if length > data.settings.max_generate_length {
		return bad_request(format!("length must be <= {}", data.settings.max_generate_length));
	}
	let mode = match query.mode.as_deref().map(str::parse::<GenerationMode>) {
		None => GenerationMode::default(),
		Some(Ok(mode)) => mode,
		Some(Err(e)) => return bad_request(e),
	};
	let seed = query.seed.clone().filter(|s| !s.trim().is_empty());
	let users = parse_users(query.users.as_deref());

	let chain = match data.chain_for(&users) {
		Ok(chain) => chain,
		Err(e) => return error_response(&e),
	};

	let generator = mode.generator(seed, data.settings.max_sentence_words);
	match web::block(move || generator.generate_text(&chain, length)).await {
		Ok(text) => HttpResponse::Ok().json(GenerateResponse { text }),
		Err(e) => {
			log::error!("Generation task failed: {e}");
			HttpResponse::InternalServerError().json(ErrorBody { error: e.to_string() })
		}
	}
}

/// HTTP GET endpoint `/v1/chains`
///
/// Lists the identity keys of every stored chain.
#[get("/v1/chains")]
async fn get_chains(data: web::Data<SharedData>) -> impl Responder {
	match data.store.list() {
		Ok(keys) => HttpResponse::Ok().json(keys),
		Err(e) => error_response(&e),
	}
}

/// HTTP GET endpoint `/v1/loaded_chains`
#[get("/v1/loaded_chains")]
async fn get_loaded_chains(data: web::Data<SharedData>) -> impl Responder {
	HttpResponse::Ok().json(data.loaded_keys())
}

#[derive(Deserialize)]
struct LoadQuery {
	users: Option<String>,
}

/// HTTP PUT endpoint `/v1/load_chain`
///
/// (Re)loads the stored chain of `users` into the cache, picking up a
/// rebuild without restarting the server.
#[put("/v1/load_chain")]
async fn put_chain(data: web::Data<SharedData>, query: web::Query<LoadQuery>) -> impl Responder {
	let users = parse_users(query.users.as_deref());
	match data.load(&users) {
		Ok(chain) => HttpResponse::Ok().body(format!(
			"Chain '{}' loaded ({} prefixes)",
			identity_key(&users),
			chain.len()
		)),
		Err(e) => error_response(&e),
	}
}

const DEMO_PAGE: &str = include_str!("../static/index.html");
const DEMO_SCRIPT: &str = include_str!("../static/demo.js");

/// HTTP GET endpoint `/`
///
/// Demo page calling `/api/prediction` from the browser.
#[get("/")]
async fn get_demo() -> impl Responder {
	HttpResponse::Ok().content_type("text/html; charset=utf-8").body(DEMO_PAGE)
}

#[get("/static/demo.js")]
async fn get_demo_script() -> impl Responder {
	HttpResponse::Ok().content_type("application/javascript; charset=utf-8").body(DEMO_SCRIPT)
}

#[get("/favicon.ico")]
async fn get_favicon() -> impl Responder {
	HttpResponse::NoContent().finish()
}

/// Registers every endpoint.
pub fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(get_demo)
		.service(get_demo_script)
		.service(get_favicon)
		.service(get_prediction)
		.service(get_generated)
		.service(get_chains)
		.service(get_loaded_chains)
		.service(put_chain);
}
