use std::io::BufRead;
use std::sync::LazyLock;
use std::vec;

use regex::Regex;

/// Link-like substrings (`example.com/path`, `http://a.io`, ...).
static LINK: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"[-a-zA-Z0-9@:%_+.~#?&/=]{2,256}\.[a-z]{2,4}\b(/[-a-zA-Z0-9@:%_+.~#?&/=]*)?")
		.expect("link pattern is valid")
});

/// Everything but word characters, apostrophes and the kept punctuation.
static DISALLOWED: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9 '!?.,]").expect("punctuation pattern is valid"));

/// Abbreviations that end with a period without ending a sentence.
pub const ABBREVIATIONS: [&str; 7] = ["mr.", "mrs.", "ms.", "etc.", "jr.", "sr.", "dr."];

/// Removes links and disallowed punctuation from a raw word.
///
/// Sentence-terminal punctuation (`.`, `!`, `?`) is preserved so that
/// boundaries can still be detected on the filtered token. Case is kept.
pub fn filter_token(raw: &str) -> String {
	let without_links = LINK.replace_all(raw, "");
	DISALLOWED.replace_all(&without_links, "").trim().to_owned()
}

/// Stricter normalization used when a token only serves as a map key:
/// ASCII alphanumerics only, lowercased.
pub fn clean_key(token: &str) -> String {
	token
		.chars()
		.filter(char::is_ascii_alphanumeric)
		.map(|c| c.to_ascii_lowercase())
		.collect()
}

/// Returns true if `token` ends a sentence.
///
/// A token ends a sentence when it ends with `.`, `!` or `?` and is not one
/// of the known [`ABBREVIATIONS`].
pub fn ends_sentence(token: &str) -> bool {
	if !token.ends_with(['.', '!', '?']) {
		return false;
	}
	let lower = token.to_lowercase();
	!ABBREVIATIONS.contains(&lower.as_str())
}

/// Splits `text` on whitespace and yields the filtered, non-empty tokens.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
	text.split_whitespace()
		.map(filter_token)
		.filter(|token| !token.is_empty())
}

/// Lazy token stream over a buffered reader.
///
/// Reads one line at a time. The first I/O error ends the stream: it is
/// logged, remembered in [`ReaderTokens::error`] and no more tokens are
/// produced.
pub struct ReaderTokens<R> {
	reader: R,
	pending: vec::IntoIter<String>,
	error: Option<std::io::Error>,
	done: bool,
}

impl<R: BufRead> ReaderTokens<R> {
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			pending: Vec::new().into_iter(),
			error: None,
			done: false,
		}
	}

	/// The error that interrupted the stream, if any.
	pub fn error(&self) -> Option<&std::io::Error> {
		self.error.as_ref()
	}
}

impl<R: BufRead> Iterator for ReaderTokens<R> {
	type Item = String;

	fn next(&mut self) -> Option<String> {
		loop {
			if let Some(token) = self.pending.next() {
				return Some(token);
			}
			if self.done {
				return None;
			}

			let mut line = String::new();
			match self.reader.read_line(&mut line) {
				Ok(0) => self.done = true,
				Ok(_) => self.pending = tokenize(&line).collect::<Vec<_>>().into_iter(),
				Err(e) => {
					log::warn!("Token stream interrupted: {e}");
					self.error = Some(e);
					self.done = true;
				}
			}
		}
	}
}
