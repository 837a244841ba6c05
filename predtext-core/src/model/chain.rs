use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};

use super::frequency::FrequencyCounter;
use super::prefix::Prefix;
use crate::error::{PredTextError, Result};
use crate::io::{build_output_path, is_up_to_date, read_paragraphs};
use crate::text::{ReaderTokens, filter_token, tokenize};

/// Word-level Markov chain.
///
/// Maps the serialized form of a [`Prefix`] to the [`FrequencyCounter`] of
/// the tokens observed right after it.
///
/// # Responsibilities
/// - Accumulate successor counts from one or more token streams
/// - Serve successor lookups to the generators and the prediction engine
/// - Merge with another chain of the same prefix length
///
/// # Invariants
/// - `prefix_len` is always >= 1 and never changes
/// - Every key is a serialized prefix of `prefix_len` slots
/// - Entries are only ever added or incremented, never removed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Chain {
	/// Order of the model (number of tokens in a prefix)
	prefix_len: usize,

	/// Mapping from a serialized prefix to its successors
	links: HashMap<String, FrequencyCounter>,
}

impl Chain {
	/// Creates an empty chain of order `prefix_len`.
	///
	/// # Errors
	/// Returns an error if `prefix_len < 1`.
	pub fn new(prefix_len: usize) -> Result<Self> {
		if prefix_len < 1 {
			return Err(PredTextError::InvalidPrefixLength(prefix_len));
		}
		Ok(Self { prefix_len, links: HashMap::new() })
	}

	/// Rebuilds a chain from stored `prefix -> {successor -> count}` data.
	pub fn from_parts<I, C>(prefix_len: usize, links: I) -> Result<Self>
	where
		I: IntoIterator<Item = (String, C)>,
		C: IntoIterator<Item = (String, u64)>,
	{
		let mut chain = Self::new(prefix_len)?;
		for (key, successors) in links {
			let counter: FrequencyCounter = successors.into_iter().collect();
			if !counter.is_empty() {
				chain.links.entry(key).or_default().union(&counter);
			}
		}
		Ok(chain)
	}

	pub fn prefix_len(&self) -> usize {
		self.prefix_len
	}

	/// Number of distinct prefixes.
	pub fn len(&self) -> usize {
		self.links.len()
	}

	pub fn is_empty(&self) -> bool {
		self.links.is_empty()
	}

	/// Successors recorded under a serialized prefix.
	pub fn get(&self, key: &str) -> Option<&FrequencyCounter> {
		self.links.get(key)
	}

	/// Successors recorded for `prefix`, if any.
	pub fn successors(&self, prefix: &Prefix) -> Option<&FrequencyCounter> {
		self.links.get(&prefix.key()).filter(|counter| !counter.is_empty())
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &FrequencyCounter)> {
		self.links.iter().map(|(key, counter)| (key.as_str(), counter))
	}

	/// Scans a token stream into the chain.
	///
	/// Every call starts from an empty window; statistics accumulate across
	/// calls. Tokens that filter to nothing are skipped.
	///
	/// Returns the number of tokens recorded.
	pub fn build<I, S>(&mut self, tokens: I) -> usize
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut prefix = Prefix::new(self.prefix_len);
		let mut recorded = 0;

		for raw in tokens {
			let token = filter_token(raw.as_ref());
			if token.is_empty() {
				continue;
			}
			self.links.entry(prefix.key()).or_default().add(&token);
			prefix.shift(&token);
			recorded += 1;
		}

		recorded
	}

	/// Builds the chain from free text.
	pub fn build_text(&mut self, text: &str) -> usize {
		self.build(tokenize(text))
	}

	/// Builds the chain from a reader.
	///
	/// A read error ends the scan early; everything read before it is kept
	/// and the error is only logged.
	pub fn build_reader<R: BufRead>(&mut self, reader: R) -> usize {
		let mut tokens = ReaderTokens::new(reader);
		let recorded = self.build(&mut tokens);
		if let Some(e) = tokens.error() {
			log::warn!("Build stopped after {recorded} tokens: {e}");
		}
		recorded
	}

	/// Merges another chain into this one.
	///
	/// Counts for matching prefixes and successors are summed.
	///
	/// # Errors
	/// Returns an error if the prefix lengths do not match.
	pub fn merge(&mut self, other: &Self) -> Result<()> {
		if self.prefix_len != other.prefix_len {
			return Err(PredTextError::PrefixLengthMismatch {
				expected: self.prefix_len,
				got: other.prefix_len,
			});
		}

		for (key, counter) in &other.links {
			if let Some(existing) = self.links.get_mut(key) {
				existing.union(counter);
			} else {
				self.links.insert(key.clone(), counter.clone());
			}
		}

		Ok(())
	}

	/// Loads a chain from a text file.
	///
	/// - Paragraphs (runs of lines separated by blank lines) are separate
	///   documents, each built from an empty window; wrapped lines inside a
	///   paragraph form one token stream.
	/// - A `.bin` file next to `filepath` is used as a cache when it is at
	///   least as recent as the source and has the same prefix length.
	/// - Otherwise paragraphs are split into chunks, partial chains are built
	///   in parallel, merged, and the result is written to the cache.
	pub fn from_file<P: AsRef<Path>>(filepath: P, prefix_len: usize) -> Result<Self> {
		let binary_data_path = build_output_path(&filepath, "bin")?;
		if is_up_to_date(&binary_data_path, &filepath)? {
			let bytes = std::fs::read(&binary_data_path)?;
			let chain: Chain = postcard::from_bytes(&bytes)?;
			if chain.prefix_len == prefix_len {
				log::info!("Loaded cached chain from {}", binary_data_path.display());
				return Ok(chain);
			}
			log::info!(
				"Ignoring cache {} (prefix length {} != {})",
				binary_data_path.display(),
				chain.prefix_len,
				prefix_len
			);
		}

		let chain = Self::build_parallel(read_paragraphs(&filepath)?, prefix_len)?;

		let bytes = postcard::to_stdvec(&chain)?;
		std::fs::write(&binary_data_path, bytes)?;
		log::info!("Chain cached to {}", binary_data_path.display());

		Ok(chain)
	}

	/// Builds one partial chain per chunk of documents on worker threads and
	/// merges them on the calling thread.
	fn build_parallel(documents: Vec<String>, prefix_len: usize) -> Result<Self> {
		let mut final_chain = Self::new(prefix_len)?;
		if documents.is_empty() {
			return Ok(final_chain);
		}

		let cpus = num_cpus::get();
		let factor = 8;
		let chunks = cpus * factor;
		let chunk_size = documents.len().div_ceil(chunks);

		let (tx, rx) = mpsc::channel();
		for chunk in documents.chunks(chunk_size) {
			let tx = tx.clone();
			let chunk: Vec<String> = chunk.to_vec();

			thread::spawn(move || {
				let mut partial_chain = Chain { prefix_len, links: HashMap::new() };
				for document in chunk {
					partial_chain.build_text(&document);
				}
				// The receiver only goes away if the merge loop failed
				let _ = tx.send(partial_chain);
			});
		}
		drop(tx);

		for partial_chain in rx.iter() {
			final_chain.merge(&partial_chain)?;
		}

		log::info!(
			"Built chain with {} prefixes from {} paragraphs",
			final_chain.len(),
			documents.len()
		);
		Ok(final_chain)
	}
}
