use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Successor tokens of one prefix with their occurrence counts.
///
/// Tokens are stored in their filtered form, so `Sat.` and `sat` are
/// counted apart; the prediction engine merges them when displaying.
///
/// ## Invariants
/// - Every stored count is strictly positive
/// - The empty string is never stored as a key
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyCounter {
	/// Successor token to occurrence count.
	/// Example: { "sat." => 5, "ran" => 2 }
	counts: HashMap<String, u64>,
}

impl FrequencyCounter {
	/// Creates an empty counter.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records one occurrence of `token`.
	pub fn add(&mut self, token: &str) {
		self.add_count(token, 1);
	}

	/// Records `count` occurrences of `token`.
	///
	/// Empty tokens and zero counts are ignored.
	pub fn add_count(&mut self, token: &str, count: u64) {
		if token.is_empty() || count == 0 {
			return;
		}
		*self.counts.entry(token.to_owned()).or_insert(0) += count;
	}

	/// Adds every count of `other` into this counter (key-wise sum).
	pub fn union(&mut self, other: &Self) {
		for (token, count) in &other.counts {
			*self.counts.entry(token.clone()).or_insert(0) += *count;
		}
	}

	/// Occurrence count of `token`, if recorded.
	pub fn get(&self, token: &str) -> Option<u64> {
		self.counts.get(token).copied()
	}

	/// Count of `token` divided by the number of distinct tokens.
	///
	/// This is not a probability: the denominator is the number of distinct
	/// successors, not the number of occurrences. Stored chains and earlier
	/// outputs rely on this definition.
	pub fn weight(&self, token: &str) -> Option<f64> {
		let count = self.get(token)?;
		Some(count as f64 / self.counts.len() as f64)
	}

	/// Total number of recorded occurrences.
	pub fn total(&self) -> u64 {
		self.counts.values().sum()
	}

	/// Number of distinct tokens.
	pub fn len(&self) -> usize {
		self.counts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counts.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.counts.iter().map(|(token, count)| (token.as_str(), *count))
	}

	/// Tokens with their counts, most frequent first.
	///
	/// The relative order of equal counts is unspecified.
	pub fn to_ranked(&self) -> Vec<(String, u64)> {
		let mut ranked: Vec<(String, u64)> = self.counts.iter().map(|(t, c)| (t.clone(), *c)).collect();
		ranked.sort_by(|a, b| b.1.cmp(&a.1));
		ranked
	}

	/// Draws the next word: a token with probability proportional to its
	/// count, or `None` when nothing was ever seen after this prefix.
	pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<&str> {
		let total = self.total();
		if total == 0 {
			return None;
		}

		let mut r = rng.random_range(0..total);

		let mut fallback: Option<&str> = None;
		for (token, count) in &self.counts {
			if r < *count {
				return Some(token.as_str());
			}
			r -= count;
			fallback = Some(token.as_str());
		}

		// Unreachable while counts sum to `total`
		fallback
	}
}

impl FromIterator<(String, u64)> for FrequencyCounter {
	fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
		let mut counter = Self::new();
		for (token, count) in iter {
			counter.add_count(&token, count);
		}
		counter
	}
}
