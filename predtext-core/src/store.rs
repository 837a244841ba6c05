use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{PredTextError, Result};
use crate::io::list_keys;
use crate::model::chain::Chain;

/// Identity key of a chain built without user names (stdin, files).
pub const ANONYMOUS_KEY: &str = "_stdin";

/// Persistence boundary for chains, keyed by a group of user names.
pub trait ChainStore {
	/// Inserts or replaces the chain stored for `identity`.
	fn upsert_chain(&self, identity: &[String], chain: &Chain) -> Result<()>;

	/// Returns the chain stored for `identity`.
	///
	/// # Errors
	/// [`PredTextError::NoData`] if nothing was stored for it.
	fn get_chain(&self, identity: &[String]) -> Result<StoredChain>;

	/// Identity keys of every stored chain.
	fn list(&self) -> Result<Vec<String>>;
}

/// Persisted representation of a chain.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredChain {
	/// Sorted, de-duplicated user names.
	pub users: Vec<String>,
	pub prefix_len: usize,
	/// prefix -> successor -> count
	pub data: BTreeMap<String, BTreeMap<String, u64>>,
	pub last_modified: SystemTime,
}

impl StoredChain {
	pub fn new(identity: &[String], chain: &Chain) -> Self {
		let data = chain
			.iter()
			.map(|(key, counter)| {
				let successors: BTreeMap<String, u64> =
					counter.iter().map(|(t, c)| (t.to_owned(), c)).collect();
				(key.to_owned(), successors)
			})
			.collect();

		Self {
			users: normalize_identity(identity),
			prefix_len: chain.prefix_len(),
			data,
			last_modified: SystemTime::now(),
		}
	}

	/// Rebuilds the in-memory chain.
	pub fn to_chain(&self) -> Result<Chain> {
		Chain::from_parts(
			self.prefix_len,
			self.data.iter().map(|(key, successors)| {
				(key.clone(), successors.iter().map(|(t, c)| (t.clone(), *c)).collect::<Vec<_>>())
			}),
		)
	}
}

/// Trims, lowercases, sorts and de-duplicates user names.
pub fn normalize_identity(identity: &[String]) -> Vec<String> {
	let mut users: Vec<String> = identity
		.iter()
		.map(|u| u.trim().to_lowercase())
		.filter(|u| !u.is_empty())
		.collect();
	users.sort();
	users.dedup();
	users
}

/// File-name safe key for a group of user names.
///
/// `["Bob", "alice"]` → `alice+bob`; an empty group → [`ANONYMOUS_KEY`].
pub fn identity_key(identity: &[String]) -> String {
	let users = normalize_identity(identity);
	if users.is_empty() {
		return ANONYMOUS_KEY.to_owned();
	}

	users
		.iter()
		.map(|u| {
			u.chars()
				.map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
				.collect::<String>()
		})
		.collect::<Vec<_>>()
		.join("+")
}

/// On-disk encoding of stored chains.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreFormat {
	/// Compact `postcard` encoding (`.chain.bin`).
	#[default]
	Binary,
	/// Readable JSON documents (`.chain.json`).
	Json,
}

impl StoreFormat {
	/// File name suffix of stored chains.
	///
	/// Distinct from the plain `.bin` caches written next to text corpora.
	pub fn suffix(self) -> &'static str {
		match self {
			StoreFormat::Binary => ".chain.bin",
			StoreFormat::Json => ".chain.json",
		}
	}

	fn other(self) -> Self {
		match self {
			StoreFormat::Binary => StoreFormat::Json,
			StoreFormat::Json => StoreFormat::Binary,
		}
	}

	fn encode(self, stored: &StoredChain) -> Result<Vec<u8>> {
		Ok(match self {
			StoreFormat::Binary => postcard::to_stdvec(stored)?,
			StoreFormat::Json => serde_json::to_vec_pretty(stored)?,
		})
	}

	fn decode(self, bytes: &[u8]) -> Result<StoredChain> {
		Ok(match self {
			StoreFormat::Binary => postcard::from_bytes(bytes)?,
			StoreFormat::Json => serde_json::from_slice(bytes)?,
		})
	}
}

impl FromStr for StoreFormat {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"binary" | "bin" => Ok(StoreFormat::Binary),
			"json" => Ok(StoreFormat::Json),
			other => Err(format!("Unknown store format '{other}' (expected 'binary' or 'json')")),
		}
	}
}

impl fmt::Display for StoreFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreFormat::Binary => write!(f, "binary"),
			StoreFormat::Json => write!(f, "json"),
		}
	}
}

/// Stores one file per identity in a directory.
///
/// Writes go to a temporary file in the same directory which then replaces
/// the target, so readers never see a partial document.
#[derive(Clone, Debug)]
pub struct FileChainStore {
	dir: PathBuf,
	format: StoreFormat,
}

impl FileChainStore {
	pub fn new<P: AsRef<Path>>(dir: P, format: StoreFormat) -> Self {
		Self { dir: dir.as_ref().to_path_buf(), format }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path_for(&self, key: &str, format: StoreFormat) -> PathBuf {
		self.dir.join(format!("{key}{}", format.suffix()))
	}
}

impl ChainStore for FileChainStore {
	fn upsert_chain(&self, identity: &[String], chain: &Chain) -> Result<()> {
		let key = identity_key(identity);
		let stored = StoredChain::new(identity, chain);
		let bytes = self.format.encode(&stored)?;

		fs::create_dir_all(&self.dir)?;
		let mut temp_file = NamedTempFile::new_in(&self.dir)?;
		temp_file.write_all(&bytes)?;
		temp_file.persist(self.path_for(&key, self.format))?;

		log::info!("Saved chain '{key}' ({} prefixes, {} format)", chain.len(), self.format);
		Ok(())
	}

	fn get_chain(&self, identity: &[String]) -> Result<StoredChain> {
		let key = identity_key(identity);

		for format in [self.format, self.format.other()] {
			let path = self.path_for(&key, format);
			if path.is_file() {
				let bytes = fs::read(&path)?;
				log::debug!("Loading chain '{key}' from {}", path.display());
				return format.decode(&bytes);
			}
		}

		Err(PredTextError::NoData(key))
	}

	fn list(&self) -> Result<Vec<String>> {
		let mut keys = list_keys(&self.dir, StoreFormat::Binary.suffix())?;
		keys.extend(list_keys(&self.dir, StoreFormat::Json.suffix())?);
		keys.sort();
		keys.dedup();
		Ok(keys)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn users(names: &[&str]) -> Vec<String> {
		names.iter().map(|n| n.to_string()).collect()
	}

	fn sample_chain() -> Chain {
		let mut chain = Chain::new(2).unwrap();
		chain.build_text("the cat sat. the cat ran.");
		chain
	}

	#[test]
	fn identity_key_is_order_independent() {
		assert_eq!(identity_key(&users(&["Bob", "alice", "bob"])), "alice+bob");
		assert_eq!(identity_key(&users(&["alice", "Bob"])), "alice+bob");
		assert_eq!(identity_key(&[]), ANONYMOUS_KEY);
		assert_eq!(identity_key(&users(&["../etc"])), "___etc");
	}

	#[test]
	fn stored_chain_restores_chain() {
		let chain = sample_chain();
		let stored = StoredChain::new(&users(&["alice"]), &chain);
		assert_eq!(stored.users, vec!["alice"]);
		assert_eq!(stored.to_chain().unwrap(), chain);
	}

	#[test]
	fn upsert_then_get_in_both_formats() {
		for format in [StoreFormat::Binary, StoreFormat::Json] {
			let dir = tempfile::tempdir().unwrap();
			let store = FileChainStore::new(dir.path(), format);
			let chain = sample_chain();

			store.upsert_chain(&users(&["bob", "alice"]), &chain).unwrap();
			let stored = store.get_chain(&users(&["alice", "bob"])).unwrap();

			assert_eq!(stored.users, vec!["alice", "bob"]);
			assert_eq!(stored.prefix_len, 2);
			assert_eq!(stored.to_chain().unwrap(), chain);
			assert_eq!(store.list().unwrap(), vec!["alice+bob"]);
		}
	}

	#[test]
	fn upsert_replaces_previous_chain() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileChainStore::new(dir.path(), StoreFormat::Binary);

		store.upsert_chain(&[], &Chain::new(2).unwrap()).unwrap();
		store.upsert_chain(&[], &sample_chain()).unwrap();

		assert_eq!(store.get_chain(&[]).unwrap().to_chain().unwrap(), sample_chain());
	}

	#[test]
	fn missing_chain_is_no_data() {
		let dir = tempfile::tempdir().unwrap();
		let store = FileChainStore::new(dir.path(), StoreFormat::Binary);
		assert!(matches!(
			store.get_chain(&users(&["nobody"])),
			Err(PredTextError::NoData(key)) if key == "nobody"
		));
	}

	#[test]
	fn get_falls_back_to_other_format() {
		let dir = tempfile::tempdir().unwrap();
		FileChainStore::new(dir.path(), StoreFormat::Json)
			.upsert_chain(&users(&["carol"]), &sample_chain())
			.unwrap();

		let binary_store = FileChainStore::new(dir.path(), StoreFormat::Binary);
		assert!(binary_store.get_chain(&users(&["carol"])).is_ok());
	}

	#[test]
	fn list_ignores_corpus_caches() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("corpus.txt");
		fs::write(&source, "the cat sat.").unwrap();
		Chain::from_file(&source, 2).unwrap();
		assert!(dir.path().join("corpus.bin").is_file());

		let store = FileChainStore::new(dir.path(), StoreFormat::Binary);
		store.upsert_chain(&users(&["alice"]), &sample_chain()).unwrap();

		assert_eq!(store.list().unwrap(), vec!["alice"]);
		assert!(dir.path().join("alice.chain.bin").is_file());
		assert!(matches!(store.get_chain(&users(&["corpus"])), Err(PredTextError::NoData(_))));
	}

	#[test]
	fn format_parses() {
		assert_eq!("JSON".parse::<StoreFormat>(), Ok(StoreFormat::Json));
		assert_eq!("bin".parse::<StoreFormat>(), Ok(StoreFormat::Binary));
		assert!("xml".parse::<StoreFormat>().is_err());
	}
}
