use serde::{Deserialize, Serialize};

use super::chain::Chain;
use super::frequency::FrequencyCounter;
use super::prefix::Prefix;
use crate::text::ends_sentence;

/// How a completion is scored.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
	/// Product of the successor counts along the path.
	#[default]
	Frequency,
	/// Every path counts once.
	PathCount,
}

/// Parameters of a prediction search.
///
/// The search visits up to `breadth^depth` paths, so both must stay small
/// on dense chains.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionOptions {
	/// Maximum number of words appended to the input.
	pub depth: usize,

	/// Maximum number of successors expanded per node, most frequent first.
	/// `None` expands every successor, which is only reasonable on sparse
	/// chains.
	pub breadth: Option<usize>,

	/// Number of completions returned.
	pub top_n: usize,

	pub scoring: Scoring,
}

impl Default for PredictionOptions {
	fn default() -> Self {
		Self { depth: 2, breadth: Some(3), top_n: 3, scoring: Scoring::Frequency }
	}
}

/// Returns the `top_n` most likely continuations of `input`.
///
/// Each continuation only holds the new words, lowercased and without
/// terminal punctuation, ready to be appended to the input.
pub fn predict(chain: &Chain, input: &str, options: &PredictionOptions) -> Vec<String> {
	predict_scored(chain, input, options)
		.into_iter()
		.map(|(completion, _)| completion)
		.collect()
}

/// Same as [`predict`], with the accumulated weight of each continuation.
///
/// Results are sorted by descending weight; equal weights are ordered by
/// text.
pub fn predict_scored(chain: &Chain, input: &str, options: &PredictionOptions) -> Vec<(String, u64)> {
	let prefix = Prefix::from_phrase(input, chain.prefix_len());
	let candidates = expand(chain, &prefix, options.depth, "", 1, options);

	let mut ranked: Vec<(String, u64)> = candidates.iter().map(|(c, w)| (c.to_owned(), w)).collect();
	ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	ranked.truncate(options.top_n);
	ranked
}

/// Recursively collects completions reachable from `prefix`.
///
/// A branch ends at depth 0, when the window has no successors, or right
/// after a sentence-terminal successor. The completion built so far is then
/// recorded with the branch weight; completions reached through several
/// branches add up.
fn expand(
	chain: &Chain,
	prefix: &Prefix,
	depth: usize,
	continuation: &str,
	weight: u64,
	options: &PredictionOptions,
) -> FrequencyCounter {
	let mut results = FrequencyCounter::new();

	let successors = if depth == 0 { None } else { chain.successors(prefix) };
	let Some(successors) = successors else {
		results.add_count(continuation.trim(), weight);
		return results;
	};

	let mut ranked = successors.to_ranked();
	ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	if let Some(breadth) = options.breadth {
		ranked.truncate(breadth);
	}

	for (token, count) in ranked {
		let branch_weight = match options.scoring {
			Scoring::Frequency => weight.saturating_mul(count),
			Scoring::PathCount => 1,
		};

		let word = display_word(&token);
		let extended = if word.is_empty() {
			continuation.to_owned()
		} else {
			format!("{continuation} {word}")
		};

		if ends_sentence(&token) {
			results.add_count(extended.trim(), branch_weight);
			continue;
		}

		let mut next = prefix.clone();
		next.shift(&token);
		results.union(&expand(chain, &next, depth - 1, &extended, branch_weight, options));
	}

	results
}

/// Lowercased token without trailing punctuation.
fn display_word(token: &str) -> String {
	token
		.trim_end_matches(['.', '!', '?', ','])
		.to_lowercase()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chain_of(texts: &[&str]) -> Chain {
		let mut chain = Chain::new(2).unwrap();
		for text in texts {
			chain.build_text(text);
		}
		chain
	}

	fn depth(depth: usize) -> PredictionOptions {
		PredictionOptions { depth, ..Default::default() }
	}

	#[test]
	fn ranks_by_successor_count() {
		let chain = Chain::from_parts(
			2,
			vec![("the cat".to_owned(), vec![("sat".to_owned(), 5), ("ran".to_owned(), 2)])],
		)
		.unwrap();

		let scored = predict_scored(&chain, "the cat", &depth(1));
		assert_eq!(scored, vec![("sat".to_owned(), 5), ("ran".to_owned(), 2)]);
	}

	#[test]
	fn end_to_end_two_sentences() {
		let chain = chain_of(&["the cat sat.", "the cat ran."]);
		let mut predictions = predict(&chain, "the cat", &PredictionOptions::default());
		predictions.sort();
		assert_eq!(predictions, vec!["ran", "sat"]);
	}

	#[test]
	fn continues_up_to_depth() {
		let chain = chain_of(&["the cat sat on the mat."]);
		assert_eq!(predict(&chain, "the cat", &depth(2)), vec!["sat on"]);
		assert_eq!(predict(&chain, "the cat", &depth(3)), vec!["sat on the"]);
		assert_eq!(predict(&chain, "the cat", &depth(1)), vec!["sat"]);
	}

	#[test]
	fn stops_at_sentence_end() {
		let chain = chain_of(&["the cat sat. then it slept."]);
		assert_eq!(predict(&chain, "the cat", &depth(3)), vec!["sat"]);
	}

	#[test]
	fn depth_zero_predicts_nothing() {
		let chain = chain_of(&["the cat sat."]);
		assert!(predict(&chain, "the cat", &depth(0)).is_empty());
	}

	#[test]
	fn unknown_prefix_predicts_nothing() {
		let chain = chain_of(&["the cat sat."]);
		assert!(predict(&chain, "purple elephants", &PredictionOptions::default()).is_empty());
	}

	#[test]
	fn uses_last_words_of_input() {
		let chain = chain_of(&["the cat sat."]);
		assert_eq!(predict(&chain, "Yesterday I saw THE CAT", &depth(1)), vec!["sat"]);
	}

	#[test]
	fn weights_accumulate_across_branches() {
		// "x a" and "x b" both lead to the completion "... end"
		let chain = Chain::from_parts(
			2,
			vec![
				("go x".to_owned(), vec![("a".to_owned(), 1), ("b".to_owned(), 1)]),
				("x a".to_owned(), vec![("end".to_owned(), 3)]),
				("x b".to_owned(), vec![("end".to_owned(), 2), ("other".to_owned(), 4)]),
			],
		)
		.unwrap();

		let scored = predict_scored(&chain, "go x", &depth(2));
		assert_eq!(
			scored,
			vec![("b other".to_owned(), 4), ("a end".to_owned(), 3), ("b end".to_owned(), 2)]
		);

		let path_count = PredictionOptions { scoring: Scoring::PathCount, top_n: 10, ..depth(2) };
		let scored = predict_scored(&chain, "go x", &path_count);
		assert_eq!(scored.len(), 3);
		assert!(scored.iter().all(|(_, weight)| *weight == 1));
	}

	#[test]
	fn identical_completions_merge() {
		// Different-case tokens collapse into one completion
		let chain = Chain::from_parts(
			2,
			vec![("the cat".to_owned(), vec![("Sat.".to_owned(), 2), ("sat.".to_owned(), 3)])],
		)
		.unwrap();
		assert_eq!(predict_scored(&chain, "the cat", &depth(2)), vec![("sat".to_owned(), 5)]);
	}

	#[test]
	fn breadth_limits_expansion() {
		let chain = Chain::from_parts(
			2,
			vec![(
				"the cat".to_owned(),
				vec![("sat".to_owned(), 5), ("ran".to_owned(), 2), ("hid".to_owned(), 1)],
			)],
		)
		.unwrap();
		let options = PredictionOptions { breadth: Some(1), ..depth(1) };
		assert_eq!(predict(&chain, "the cat", &options), vec!["sat"]);
	}

	#[test]
	fn returns_top_n() {
		let chain = Chain::from_parts(
			2,
			vec![(
				"the cat".to_owned(),
				vec![
					("a".to_owned(), 5),
					("b".to_owned(), 4),
					("c".to_owned(), 3),
					("d".to_owned(), 2),
				],
			)],
		)
		.unwrap();
		assert_eq!(predict(&chain, "the cat", &depth(1)), vec!["a", "b", "c"]);
	}
}
