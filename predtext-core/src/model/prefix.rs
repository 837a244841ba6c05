use crate::text::{clean_key, ends_sentence, tokenize};

/// Serialized form of a window whose slots are all empty.
pub const EMPTY_KEY: &str = " ";

/// Fixed-length sliding window over the most recent tokens.
///
/// Slots hold filtered tokens (terminal punctuation kept) so that sentence
/// boundaries stay visible; [`Prefix::key`] derives the lookup key from the
/// cleaned form of each slot.
///
/// ## Invariants
/// - The number of slots never changes after construction
/// - An empty slot is the empty string
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prefix {
	words: Vec<String>,
}

impl Prefix {
	/// Creates an all-empty window of `len` slots.
	pub fn new(len: usize) -> Self {
		Self { words: vec![String::new(); len] }
	}

	/// Builds a window from the last `len` tokens of `phrase`.
	///
	/// Tokens are shifted in one at a time, so the sentence-boundary rule
	/// applies exactly as it does while building a chain.
	pub fn from_phrase(phrase: &str, len: usize) -> Self {
		let tokens: Vec<String> = tokenize(phrase).collect();
		let start = tokens.len().saturating_sub(len);

		let mut prefix = Self::new(len);
		for token in &tokens[start..] {
			prefix.shift(token);
		}
		prefix
	}

	/// Number of slots.
	pub fn len(&self) -> usize {
		self.words.len()
	}

	/// Most recent token (empty string if the slot is empty).
	pub fn last(&self) -> &str {
		self.words.last().map(String::as_str).unwrap_or("")
	}

	/// Lookup key: cleaned slots joined with single spaces.
	///
	/// Returns [`EMPTY_KEY`] when every slot cleans to nothing.
	pub fn key(&self) -> String {
		let cleaned: Vec<String> = self.words.iter().map(|w| clean_key(w)).collect();
		if cleaned.iter().all(String::is_empty) {
			return EMPTY_KEY.to_owned();
		}
		cleaned.join(" ")
	}

	/// Returns true once all reductions are exhausted.
	pub fn is_empty(&self) -> bool {
		self.key() == EMPTY_KEY
	}

	/// Appends `word` (an already filtered token), dropping the oldest slot.
	///
	/// If the most recent token ends a sentence, the whole window is cleared
	/// first: a new sentence does not continue the previous one.
	pub fn shift(&mut self, word: &str) {
		if self.words.is_empty() {
			return;
		}

		if ends_sentence(self.last()) {
			self.clear();
		} else {
			self.words.rotate_left(1);
		}

		if let Some(slot) = self.words.last_mut() {
			*slot = word.to_owned();
		}
	}

	/// Empties the oldest non-empty slot.
	pub fn reduce(&mut self) {
		if let Some(slot) = self.words.iter_mut().find(|w| !w.is_empty()) {
			slot.clear();
		}
	}

	/// Empties every slot.
	pub fn clear(&mut self) {
		self.words.iter_mut().for_each(String::clear);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn prefix_of(words: &[&str]) -> Prefix {
		let mut prefix = Prefix::new(words.len());
		for word in words {
			prefix.shift(word);
		}
		prefix
	}

	#[test]
	fn new_prefix_is_empty() {
		let prefix = Prefix::new(2);
		assert!(prefix.is_empty());
		assert_eq!(prefix.key(), EMPTY_KEY);
	}

	#[test]
	fn shift_slides_window() {
		let mut prefix = Prefix::new(2);
		prefix.shift("The");
		assert_eq!(prefix.key(), " the");
		prefix.shift("cat");
		assert_eq!(prefix.key(), "the cat");
		prefix.shift("sat");
		assert_eq!(prefix.key(), "cat sat");
	}

	#[test]
	fn shift_after_terminal_clears_window() {
		let mut prefix = prefix_of(&["the", "end."]);
		prefix.shift("new");
		assert_eq!(prefix.key(), " new");
	}

	#[test]
	fn shift_after_abbreviation_keeps_window() {
		let mut prefix = prefix_of(&["see", "Dr."]);
		prefix.shift("Smith");
		assert_eq!(prefix.key(), "dr smith");
	}

	#[test]
	fn reduce_clears_oldest_first() {
		let mut prefix = prefix_of(&["the", "cat"]);
		prefix.reduce();
		assert_eq!(prefix.key(), " cat");
		prefix.reduce();
		assert_eq!(prefix.key(), EMPTY_KEY);
	}

	#[test]
	fn reduce_reaches_empty_in_exactly_len_steps() {
		for len in 1..=5 {
			let words: Vec<String> = (0..len).map(|i| format!("w{i}")).collect();
			let refs: Vec<&str> = words.iter().map(String::as_str).collect();
			let mut prefix = prefix_of(&refs);

			for _ in 0..len {
				assert!(!prefix.is_empty());
				prefix.reduce();
			}
			assert!(prefix.is_empty());
		}
	}

	#[test]
	fn clear_resets_all_slots() {
		let mut prefix = prefix_of(&["a", "b", "c"]);
		prefix.clear();
		assert!(prefix.is_empty());
		assert_eq!(prefix.len(), 3);
	}

	#[test]
	fn from_phrase_uses_last_tokens() {
		let prefix = Prefix::from_phrase("I think the cat", 2);
		assert_eq!(prefix.key(), "the cat");

		let short = Prefix::from_phrase("cat", 2);
		assert_eq!(short.key(), " cat");
	}
}
