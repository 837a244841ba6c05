use std::fs;

use rand::SeedableRng;
use rand::rngs::StdRng;

use predtext_core::PredTextError;
use predtext_core::model::chain::Chain;
use predtext_core::model::generator::{Generate, GenerationMode, SentenceGenerator};
use predtext_core::model::prediction::{PredictionOptions, predict};
use predtext_core::store::{ChainStore, FileChainStore, StoreFormat};

const CORPUS: &str = "The cat sat on the mat. The cat ran home!\n\
	Dr. Who saw the cat sat on the sofa. Is the cat hungry? The dog sat.";

fn users(names: &[&str]) -> Vec<String> {
	names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn build_store_load_and_predict() {
	let dir = tempfile::tempdir().unwrap();
	let store = FileChainStore::new(dir.path().join("chains"), StoreFormat::Binary);

	let mut chain = Chain::new(2).unwrap();
	chain.build_reader(CORPUS.as_bytes());
	store.upsert_chain(&users(&["Alice", "bob"]), &chain).unwrap();

	let loaded = store.get_chain(&users(&["bob", "alice"])).unwrap().to_chain().unwrap();
	assert_eq!(loaded, chain);

	let predictions = predict(&loaded, "I think the cat", &PredictionOptions { depth: 1, ..Default::default() });
	assert_eq!(predictions[0], "sat");
	assert!(predictions.contains(&"ran".to_owned()));
}

#[test]
fn generated_sentences_are_capitalized_and_terminated() {
	let mut chain = Chain::new(2).unwrap();
	chain.build_text(CORPUS);

	let mut rng = StdRng::seed_from_u64(7);
	let text = SentenceGenerator::new(None).generate(&chain, 5, &mut rng);

	assert!(!text.is_empty());
	let first = text.chars().next().unwrap();
	assert!(first.is_uppercase());
	assert!(text.ends_with(['.', '!', '?']));
}

#[test]
fn word_mode_produces_at_least_the_requested_words() {
	let mut chain = Chain::new(2).unwrap();
	chain.build_text(CORPUS);

	let mut rng = StdRng::seed_from_u64(11);
	let text = GenerationMode::Words.generator(None, 200).generate(&chain, 12, &mut rng);
	assert!(text.split_whitespace().count() >= 12);
}

#[test]
fn merged_chains_combine_counts() {
	let mut left = Chain::new(2).unwrap();
	left.build_text("the cat sat.");
	let mut right = Chain::new(2).unwrap();
	right.build_text("the cat sat. the cat ran.");

	left.merge(&right).unwrap();
	let successors = left.get("the cat").unwrap();
	assert_eq!(successors.get("sat."), Some(2));
	assert_eq!(successors.get("ran."), Some(1));

	let other_order = Chain::new(3).unwrap();
	assert!(matches!(left.merge(&other_order), Err(PredTextError::PrefixLengthMismatch { .. })));
}

#[test]
fn file_build_writes_binary_cache() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("corpus.txt");
	fs::write(&path, CORPUS).unwrap();

	let built = Chain::from_file(&path, 2).unwrap();
	assert!(dir.path().join("corpus.bin").is_file());

	let cached = Chain::from_file(&path, 2).unwrap();
	assert_eq!(built, cached);
}
