use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::chain::Chain;
use super::prefix::Prefix;
use crate::text::{ends_sentence, tokenize};

/// Default cap on the number of words in one sentence.
pub const DEFAULT_MAX_SENTENCE_WORDS: usize = 200;

/// Shared contract of the text generators.
pub trait Generate {
	/// Generates text of size `n` (words or sentences, depending on the
	/// strategy) from `chain`.
	fn generate<R: Rng>(&self, chain: &Chain, n: usize, rng: &mut R) -> String;

	/// Same as [`Generate::generate`] with the thread-local generator.
	fn generate_text(&self, chain: &Chain, n: usize) -> String {
		self.generate(chain, n, &mut rand::rng())
	}
}

/// Emits whole sentences until at least `n` words were written.
///
/// The last sentence is never truncated, so the output may be slightly
/// longer than requested.
#[derive(Clone, Debug)]
pub struct WordGenerator {
	/// Optional beginning of the first sentence.
	pub seed: Option<String>,
	pub max_sentence_words: usize,
}

/// Emits exactly `n` independently built sentences.
#[derive(Clone, Debug)]
pub struct SentenceGenerator {
	/// Optional beginning of the first sentence.
	pub seed: Option<String>,
	pub max_sentence_words: usize,
}

impl WordGenerator {
	pub fn new(seed: Option<String>) -> Self {
		Self { seed, max_sentence_words: DEFAULT_MAX_SENTENCE_WORDS }
	}
}

impl SentenceGenerator {
	pub fn new(seed: Option<String>) -> Self {
		Self { seed, max_sentence_words: DEFAULT_MAX_SENTENCE_WORDS }
	}
}

impl Default for WordGenerator {
	fn default() -> Self {
		Self::new(None)
	}
}

impl Default for SentenceGenerator {
	fn default() -> Self {
		Self::new(None)
	}
}

impl Generate for WordGenerator {
	fn generate<R: Rng>(&self, chain: &Chain, n: usize, rng: &mut R) -> String {
		let mut sentences = Vec::new();
		let mut seed = self.seed.as_deref();
		let mut written = 0;

		while written < n {
			let words = make_sentence(chain, seed.take(), self.max_sentence_words, rng);
			if words.is_empty() {
				// Nothing to start a sentence from
				break;
			}
			written += words.len();
			sentences.push(words.join(" "));
		}

		sentences.join(" ")
	}
}

impl Generate for SentenceGenerator {
	fn generate<R: Rng>(&self, chain: &Chain, n: usize, rng: &mut R) -> String {
		let mut sentences = Vec::with_capacity(n);
		let mut seed = self.seed.as_deref();

		for _ in 0..n {
			let words = make_sentence(chain, seed.take(), self.max_sentence_words, rng);
			if words.is_empty() {
				break;
			}
			sentences.push(words.join(" "));
		}

		sentences.join(" ")
	}
}

/// Unit in which the requested generation length is expressed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
	#[default]
	Words,
	Sentences,
}

impl GenerationMode {
	/// Selects the generation strategy for this mode.
	pub fn generator(self, seed: Option<String>, max_sentence_words: usize) -> Generator {
		match self {
			GenerationMode::Words => Generator::Words(WordGenerator { seed, max_sentence_words }),
			GenerationMode::Sentences => {
				Generator::Sentences(SentenceGenerator { seed, max_sentence_words })
			}
		}
	}
}

impl FromStr for GenerationMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"words" | "word" | "w" => Ok(GenerationMode::Words),
			"sentences" | "sentence" | "s" => Ok(GenerationMode::Sentences),
			other => Err(format!("Unknown generation mode '{other}' (expected 'words' or 'sentences')")),
		}
	}
}

impl fmt::Display for GenerationMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			GenerationMode::Words => write!(f, "words"),
			GenerationMode::Sentences => write!(f, "sentences"),
		}
	}
}

/// A generation strategy picked at runtime.
#[derive(Clone, Debug)]
pub enum Generator {
	Words(WordGenerator),
	Sentences(SentenceGenerator),
}

impl Generate for Generator {
	fn generate<R: Rng>(&self, chain: &Chain, n: usize, rng: &mut R) -> String {
		match self {
			Generator::Words(g) => g.generate(chain, n, rng),
			Generator::Sentences(g) => g.generate(chain, n, rng),
		}
	}
}

/// Builds one sentence and returns its words.
///
/// # Behavior
/// - With a seed, the window starts from its last tokens (see `init_sentence`).
/// - Each step looks up the window; on a miss the window is reduced, oldest
///   slot first. A mid-sentence reduction that empties the window ends the
///   sentence, and a period is appended to the last word.
/// - Successors are drawn proportionally to their counts.
/// - A sentence-terminal token ends the sentence.
/// - At most `max_words` words are produced.
///
/// An empty result means the chain has no sentence start at all.
pub fn make_sentence<R: Rng>(
	chain: &Chain,
	seed: Option<&str>,
	max_words: usize,
	rng: &mut R,
) -> Vec<String> {
	let mut words: Vec<String> = Vec::new();
	let mut prefix = Prefix::new(chain.prefix_len());

	if let Some(seed) = seed {
		init_sentence(chain, seed, &mut words, &mut prefix);
	}

	let mut closed = false;
	while words.len() < max_words.max(1) {
		let Some(next) = next_word(chain, &mut prefix, rng) else {
			break;
		};

		closed = ends_sentence(&next);
		if closed {
			words.push(next);
			break;
		}
		prefix.shift(&next);
		words.push(next);
	}

	if !closed {
		if let Some(last) = words.last_mut() {
			if !ends_sentence(last) {
				last.push('.');
			}
		}
	}

	if let Some(first) = words.first_mut() {
		*first = capitalize(first);
	}

	words
}

/// Draws the next word, reducing the window on misses.
///
/// Returns `None` once a reduction empties the window, or immediately when
/// even the empty window has no successors.
fn next_word<R: Rng>(chain: &Chain, prefix: &mut Prefix, rng: &mut R) -> Option<String> {
	loop {
		if let Some(successors) = chain.successors(prefix) {
			return successors.choose(rng).map(str::to_owned);
		}
		if prefix.is_empty() {
			return None;
		}
		prefix.reduce();
		if prefix.is_empty() {
			return None;
		}
	}
}

/// Positions the window after the seed phrase.
///
/// The last `prefix_len` seed tokens are shifted into the window, which is
/// then reduced until it has successors. If it empties first, the seed is
/// dropped and the sentence starts cold.
fn init_sentence(chain: &Chain, seed: &str, words: &mut Vec<String>, prefix: &mut Prefix) {
	let tokens: Vec<String> = tokenize(seed).collect();
	let start = tokens.len().saturating_sub(chain.prefix_len());
	for token in &tokens[start..] {
		prefix.shift(token);
	}

	loop {
		if prefix.is_empty() {
			prefix.clear();
			return;
		}
		if chain.successors(prefix).is_some() {
			words.extend(tokens);
			return;
		}
		prefix.reduce();
	}
}

/// Uppercases the first character of `word`.
fn capitalize(word: &str) -> String {
	let mut chars = word.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
