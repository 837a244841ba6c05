use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};

use predtext_core::config::Settings;

mod api;

use api::SharedData;

/// Main entry point for the server.
///
/// Reads the settings from the environment, then starts an Actix-web HTTP
/// server serving predictions and generated text from stored chains.
///
/// # Notes
/// - Chains are loaded lazily on first use, or explicitly with
///   `PUT /v1/load_chain`.
/// - `GET /` serves a demo page calling `/api/prediction`.
/// - CORS is permissive so the API can be called from any page.
/// - Client supplied depth and length are capped by the settings.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let settings = Settings::from_env().map_err(std::io::Error::other)?;
	let bind = (settings.host.clone(), settings.port);
	log::info!(
		"Serving chains from {} on {}:{}",
		settings.data_dir.display(),
		bind.0,
		bind.1
	);

	let shared_data = web::Data::new(SharedData::new(settings));

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.wrap(Logger::default())
			.app_data(shared_data.clone())
			.configure(api::configure)
	})
		.bind(bind)?
		.run()
		.await
}
