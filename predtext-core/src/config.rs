use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PredTextError, Result};
use crate::model::generator::DEFAULT_MAX_SENTENCE_WORDS;
use crate::model::prediction::{PredictionOptions, Scoring};
use crate::store::StoreFormat;

/// Runtime settings shared by the CLI and the server.
///
/// Start from [`Settings::default`] or [`Settings::from_env`]; command-line
/// flags override individual fields afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
	/// Directory holding stored chains.
	pub data_dir: PathBuf,

	/// Order of newly built chains.
	pub prefix_len: usize,

	pub prediction_depth: usize,
	pub prediction_breadth: Option<usize>,
	pub prediction_top_n: usize,

	/// Largest depth a client may request.
	pub max_prediction_depth: usize,

	/// Largest generation length a client may request.
	pub max_generate_length: usize,

	/// Number of concurrent fetch workers.
	pub workers: usize,

	/// Pages fetched per user, 0 for no limit.
	pub page_limit: usize,

	pub max_sentence_words: usize,
	pub store_format: StoreFormat,

	pub host: String,
	pub port: u16,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			prefix_len: 2,
			prediction_depth: 2,
			prediction_breadth: Some(3),
			prediction_top_n: 3,
			max_prediction_depth: 4,
			max_generate_length: 1000,
			workers: 3,
			page_limit: 0,
			max_sentence_words: DEFAULT_MAX_SENTENCE_WORDS,
			store_format: StoreFormat::Binary,
			host: "127.0.0.1".to_owned(),
			port: 5000,
		}
	}
}

impl Settings {
	/// Defaults overridden by `PREDTEXT_*` variables (and `PORT`).
	///
	/// # Errors
	/// Returns an error if a variable is set but cannot be parsed.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Same as [`Settings::from_env`] with a custom variable source.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| lookup(name).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let mut settings = Self::default();

		if let Some(dir) = get("PREDTEXT_DATA_DIR") {
			settings.data_dir = PathBuf::from(dir);
		}
		if let Some(v) = get("PREDTEXT_PREFIX_LEN") {
			settings.prefix_len = parse("PREDTEXT_PREFIX_LEN", &v)?;
		}
		if let Some(v) = get("PREDTEXT_DEPTH") {
			settings.prediction_depth = parse("PREDTEXT_DEPTH", &v)?;
		}
		if let Some(v) = get("PREDTEXT_BREADTH") {
			let breadth: usize = parse("PREDTEXT_BREADTH", &v)?;
			settings.prediction_breadth = (breadth > 0).then_some(breadth);
		}
		if let Some(v) = get("PREDTEXT_TOP_N") {
			settings.prediction_top_n = parse("PREDTEXT_TOP_N", &v)?;
		}
		if let Some(v) = get("PREDTEXT_MAX_DEPTH") {
			settings.max_prediction_depth = parse("PREDTEXT_MAX_DEPTH", &v)?;
		}
		if let Some(v) = get("PREDTEXT_MAX_LENGTH") {
			settings.max_generate_length = parse("PREDTEXT_MAX_LENGTH", &v)?;
		}
		if let Some(v) = get("PREDTEXT_WORKERS") {
			settings.workers = parse("PREDTEXT_WORKERS", &v)?;
		}
		if let Some(v) = get("PREDTEXT_PAGE_LIMIT") {
			settings.page_limit = parse("PREDTEXT_PAGE_LIMIT", &v)?;
		}
		if let Some(v) = get("PREDTEXT_MAX_SENTENCE_WORDS") {
			settings.max_sentence_words = parse("PREDTEXT_MAX_SENTENCE_WORDS", &v)?;
		}
		if let Some(v) = get("PREDTEXT_STORE_FORMAT") {
			settings.store_format = v.parse().map_err(PredTextError::Config)?;
		}
		if let Some(host) = get("PREDTEXT_HOST") {
			settings.host = host;
		}
		if let Some(v) = get("PORT") {
			settings.port = parse("PORT", &v)?;
		}

		settings.validate()?;
		Ok(settings)
	}

	/// Checks value ranges.
	pub fn validate(&self) -> Result<()> {
		if self.prefix_len < 1 {
			return Err(PredTextError::Config("prefix_len must be >= 1".to_owned()));
		}
		if self.workers < 1 {
			return Err(PredTextError::Config("workers must be >= 1".to_owned()));
		}
		if self.prediction_top_n < 1 {
			return Err(PredTextError::Config("prediction_top_n must be >= 1".to_owned()));
		}
		if self.prediction_depth > self.max_prediction_depth {
			return Err(PredTextError::Config(format!(
				"prediction_depth {} exceeds max_prediction_depth {}",
				self.prediction_depth, self.max_prediction_depth
			)));
		}
		if self.max_generate_length < 1 {
			return Err(PredTextError::Config("max_generate_length must be >= 1".to_owned()));
		}
		Ok(())
	}

	/// Prediction parameters derived from these settings.
	pub fn prediction_options(&self) -> PredictionOptions {
		PredictionOptions {
			depth: self.prediction_depth,
			breadth: self.prediction_breadth,
			top_n: self.prediction_top_n,
			scoring: Scoring::Frequency,
		}
	}
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T> {
	value
		.parse()
		.map_err(|_| PredTextError::Config(format!("{name}: invalid value '{value}'")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> =
			vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
		move |name: &str| vars.get(name).cloned()
	}

	#[test]
	fn defaults_without_variables() {
		let settings = Settings::from_lookup(lookup(&[])).unwrap();
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.prediction_options(), PredictionOptions::default());
	}

	#[test]
	fn variables_override_defaults() {
		let settings = Settings::from_lookup(lookup(&[
			("PREDTEXT_DATA_DIR", "/tmp/chains"),
			("PREDTEXT_PREFIX_LEN", "3"),
			("PREDTEXT_BREADTH", "4"),
			("PREDTEXT_MAX_DEPTH", "6"),
			("PREDTEXT_STORE_FORMAT", "json"),
			("PORT", "8080"),
		]))
		.unwrap();

		assert_eq!(settings.data_dir, PathBuf::from("/tmp/chains"));
		assert_eq!(settings.prefix_len, 3);
		assert_eq!(settings.prediction_breadth, Some(4));
		assert_eq!(settings.max_prediction_depth, 6);
		assert_eq!(settings.store_format, StoreFormat::Json);
		assert_eq!(settings.port, 8080);
	}

	#[test]
	fn invalid_values_are_rejected() {
		assert!(matches!(
			Settings::from_lookup(lookup(&[("PORT", "eighty")])),
			Err(PredTextError::Config(_))
		));
		assert!(matches!(
			Settings::from_lookup(lookup(&[("PREDTEXT_PREFIX_LEN", "0")])),
			Err(PredTextError::Config(_))
		));
		assert!(matches!(
			Settings::from_lookup(lookup(&[("PREDTEXT_DEPTH", "9"), ("PREDTEXT_MAX_DEPTH", "4")])),
			Err(PredTextError::Config(_))
		));
	}
}
