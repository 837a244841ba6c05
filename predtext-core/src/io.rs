use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Splits a corpus file into paragraphs.
///
/// Blank lines separate paragraphs; the lines of one paragraph are kept
/// together (joined with `\n`) so a sentence wrapped over several lines
/// stays one token stream.
pub(crate) fn read_paragraphs<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
	let contents = fs::read_to_string(path)?;

	let mut paragraphs = Vec::new();
	let mut current: Vec<&str> = Vec::new();
	for line in contents.lines() {
		if line.trim().is_empty() {
			if !current.is_empty() {
				paragraphs.push(current.join("\n"));
				current.clear();
			}
		} else {
			current.push(line);
		}
	}
	if !current.is_empty() {
		paragraphs.push(current.join("\n"));
	}

	Ok(paragraphs)
}

/// Path of the cache derived from a corpus: same directory and stem, new
/// extension (`data/corpus.txt` + `bin` gives `data/corpus.bin`).
pub(crate) fn build_output_path<P: AsRef<Path>>(source: P, extension: &str) -> io::Result<PathBuf> {
	let source = source.as_ref();
	let stem = source
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Corpus path has no file name"))?;

	let mut cache = source.parent().unwrap_or_else(|| Path::new(".")).join(stem);
	cache.set_extension(extension);
	Ok(cache)
}

/// True if `derived` exists and was modified no earlier than `source`.
pub(crate) fn is_up_to_date<P: AsRef<Path>, Q: AsRef<Path>>(derived: P, source: Q) -> io::Result<bool> {
	let derived = match fs::metadata(derived) {
		Ok(meta) => meta,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
		Err(e) => return Err(e),
	};
	let source = fs::metadata(source)?;
	Ok(derived.modified()? >= source.modified()?)
}

/// Keys of the files in `dir` whose name ends with `suffix`, sorted.
///
/// `data/alice+bob.chain.bin` with suffix `.chain.bin` gives `alice+bob`.
/// A missing directory yields an empty list.
pub(crate) fn list_keys<P: AsRef<Path>>(dir: P, suffix: &str) -> io::Result<Vec<String>> {
	let dir = dir.as_ref();
	if !dir.is_dir() {
		return Ok(Vec::new());
	}

	let mut keys = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if !path.is_file() {
			continue;
		}
		let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
		if let Some(key) = name.strip_suffix(suffix) {
			if !key.is_empty() {
				keys.push(key.to_owned());
			}
		}
	}

	keys.sort();
	Ok(keys)
}
