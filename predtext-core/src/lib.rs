//! Markov-chain predictive text library.
//!
//! This crate provides a word-level Markov chain system including:
//! - Tokenization and token filtering of raw comments
//! - Chain building, merging and frequency counting
//! - Random text generation in word and sentence modes
//! - Weighted next-words prediction
//! - Chain persistence and concurrent comment harvesting
//!
//! Only the high-level API is exposed publicly. Low-level file helpers
//! are kept internal.

/// Chain model, generation and prediction.
pub mod model;

/// Tokenizer and token filters.
pub mod text;

/// Error type shared by the whole crate.
pub mod error;

/// Runtime settings loaded from the environment.
pub mod config;

/// Chain persistence.
pub mod store;

/// Concurrent comment fetching feeding a chain.
pub mod harvest;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{PredTextError, Result};
