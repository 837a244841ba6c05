use thiserror::Error;

/// Errors raised by the predictive text core.
///
/// Input problems while reading a token stream are not part of this enum:
/// a build stops early and keeps what it read (see `Chain::build_reader`).
#[derive(Error, Debug)]
pub enum PredTextError {
	#[error("Invalid prefix length: {0} (must be >= 1)")]
	InvalidPrefixLength(usize),

	#[error("Prefix length mismatch: expected {expected}, got {got}")]
	PrefixLengthMismatch { expected: usize, got: usize },

	/// No chain has been built for the requested identity.
	#[error("No data for '{0}'")]
	NoData(String),

	#[error("Configuration error: {0}")]
	Config(String),

	#[error("Fetch error: {0}")]
	Fetch(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Binary encoding error: {0}")]
	Binary(#[from] postcard::Error),

	#[error("Persist error: {0}")]
	Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, PredTextError>;
