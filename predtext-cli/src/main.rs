use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use predtext_core::config::Settings;
use predtext_core::harvest::{HarvestOptions, harvest};
use predtext_core::model::chain::Chain;
use predtext_core::model::generator::{Generate, GenerationMode};
use predtext_core::model::prediction::predict;
use predtext_core::store::{ChainStore, FileChainStore, identity_key};

mod reddit;

use reddit::RedditClient;

#[derive(Parser, Debug)]
#[command(author, version, about = "Markov-chain predictive text", long_about = None)]
struct Cli {
	/// Directory holding stored chains (overrides PREDTEXT_DATA_DIR)
	#[arg(long, value_name = "DIR", global = true)]
	data_dir: Option<PathBuf>,

	/// Increase verbosity (-v, -vv)
	#[arg(short = 'v', long, global = true, action = ArgAction::Count)]
	verbose: u8,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Build and store the chain of a group of users
	Build {
		/// Where the text comes from
		#[arg(long, value_enum, default_value_t = Source::Reddit)]
		source: Source,

		/// Text file read by `--source file`
		#[arg(long, value_name = "PATH", required_if_eq("source", "file"))]
		path: Option<PathBuf>,

		/// Pages fetched per user, 0 for no limit
		#[arg(long, value_name = "COUNT")]
		page_limit: Option<usize>,

		/// Number of concurrent fetch workers
		#[arg(long, value_name = "COUNT")]
		workers: Option<usize>,

		/// Order of the chain
		#[arg(long, value_name = "LEN")]
		prefix_len: Option<usize>,

		/// User names; read from stdin (one per line) for reddit when omitted
		users: Vec<String>,
	},

	/// Generate random text from a stored chain
	Generate {
		/// Comma separated user names of the chain
		#[arg(long, value_delimiter = ',')]
		users: Vec<String>,

		/// Number of words (or sentences) to generate
		#[arg(short, long, default_value_t = 20)]
		length: usize,

		/// Unit of `--length`: words or sentences
		#[arg(long, default_value_t = GenerationMode::Words)]
		mode: GenerationMode,

		/// Phrase the first sentence starts from
		#[arg(long)]
		seed: Option<String>,
	},

	/// Predict the next words of a phrase
	Predict {
		/// Comma separated user names of the chain
		#[arg(long, value_delimiter = ',')]
		users: Vec<String>,

		/// Maximum number of predicted words
		#[arg(long)]
		depth: Option<usize>,

		/// Number of predictions
		#[arg(long)]
		top: Option<usize>,

		#[arg(required = true)]
		phrase: Vec<String>,
	},

	/// List stored chains
	List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Source {
	/// Public comments of Reddit users
	Reddit,
	/// Plain text on stdin
	Text,
	/// A plain text file
	File,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cli = Cli::parse();

	let level = match cli.verbose {
		0 => "info",
		1 => "debug",
		_ => "trace",
	};
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

	let mut settings = Settings::from_env()?;
	if let Some(dir) = cli.data_dir {
		settings.data_dir = dir;
	}
	let store = FileChainStore::new(&settings.data_dir, settings.store_format);

	match cli.command {
		Commands::Build { source, path, page_limit, workers, prefix_len, users } => {
			if let Some(prefix_len) = prefix_len {
				settings.prefix_len = prefix_len;
			}
			if let Some(page_limit) = page_limit {
				settings.page_limit = page_limit;
			}
			if let Some(workers) = workers {
				settings.workers = workers;
			}
			settings.validate()?;
			build(&settings, &store, source, path, users)?;
		}
		Commands::Generate { users, length, mode, seed } => {
			let chain = store.get_chain(&users)?.to_chain()?;
			let text = mode.generator(seed, settings.max_sentence_words).generate_text(&chain, length);
			println!("{text}");
		}
		Commands::Predict { users, depth, top, phrase } => {
			let chain = store.get_chain(&users)?.to_chain()?;
			let mut options = settings.prediction_options();
			if let Some(depth) = depth {
				options.depth = depth;
			}
			if let Some(top) = top {
				options.top_n = top.max(1);
			}

			let phrase = phrase.join(" ");
			for prediction in predict(&chain, &phrase, &options) {
				println!("{phrase} {prediction}");
			}
		}
		Commands::List => {
			for key in store.list()? {
				println!("{key}");
			}
		}
	}

	Ok(())
}

/// Builds a chain from `source` and stores it under the identity of `users`.
fn build(
	settings: &Settings,
	store: &FileChainStore,
	source: Source,
	path: Option<PathBuf>,
	mut users: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
	let chain = match source {
		Source::Reddit => {
			if users.is_empty() {
				users = read_user_names(io::stdin().lock())?;
			}
			if users.is_empty() {
				return Err("No user names given".into());
			}

			let client = RedditClient::new()?;
			let options = HarvestOptions { workers: settings.workers, page_limit: settings.page_limit };
			let mut chain = Chain::new(settings.prefix_len)?;
			let report = harvest(&client, &users, options, &mut chain);
			if !report.failed_users.is_empty() {
				log::warn!("Incomplete data for: {}", report.failed_users.join(", "));
			}
			chain
		}
		Source::Text => {
			let mut chain = Chain::new(settings.prefix_len)?;
			let tokens = chain.build_reader(io::stdin().lock());
			log::info!("Read {tokens} tokens from stdin");
			chain
		}
		Source::File => {
			let path = path.ok_or("--path is required for --source file")?;
			Chain::from_file(path, settings.prefix_len)?
		}
	};

	store.upsert_chain(&users, &chain)?;
	println!("Stored chain '{}' ({} prefixes)", identity_key(&users), chain.len());
	Ok(())
}

/// One user name per non-empty line.
fn read_user_names<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
	let mut users = Vec::new();
	for line in reader.lines() {
		let line = line?;
		let name = line.trim();
		if !name.is_empty() {
			users.push(name.to_owned());
		}
	}
	Ok(users)
}
