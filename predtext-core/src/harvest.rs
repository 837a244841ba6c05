use std::sync::{Mutex, mpsc};
use std::thread;

use crate::error::Result;
use crate::model::chain::Chain;

/// One page of raw comments and the reference of the next page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentPage {
	pub comments: Vec<String>,
	/// `None` (or empty) on the last page.
	pub after: Option<String>,
}

/// Paginated source of user comments.
pub trait CommentSource: Sync {
	/// Fetches the page of `user`'s comments following `after`
	/// (`None` for the first page).
	fn fetch_page(&self, user: &str, after: Option<&str>) -> Result<CommentPage>;
}

/// Worker pool parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarvestOptions {
	/// Number of concurrent fetch workers.
	pub workers: usize,
	/// Pages fetched per user, 0 for no limit.
	pub page_limit: usize,
}

impl Default for HarvestOptions {
	fn default() -> Self {
		Self { workers: 3, page_limit: 0 }
	}
}

/// Summary of a harvest run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HarvestReport {
	pub users: usize,
	pub pages: usize,
	pub comments: usize,
	pub tokens: usize,
	/// Users whose pagination stopped on an error.
	pub failed_users: Vec<String>,
}

enum Event {
	Page { user: String, comments: Vec<String> },
	Failed { user: String, error: String },
	Done { user: String },
}

/// Fetches the comments of every user and builds them into `chain`.
///
/// # Behavior
/// - `min(workers, users)` worker threads pull user names from a shared
///   queue and page through `source`, sending each page to a channel.
/// - The calling thread is the only writer: it builds every received
///   comment into `chain`, one `Chain::build` call per comment.
/// - A failed fetch ends that user's pagination; pages already received
///   are kept.
pub fn harvest<S>(source: &S, users: &[String], options: HarvestOptions, chain: &mut Chain) -> HarvestReport
where
	S: CommentSource + ?Sized,
{
	let mut report = HarvestReport { users: users.len(), ..Default::default() };
	if users.is_empty() {
		return report;
	}

	let workers = options.workers.clamp(1, users.len());
	let queue = Mutex::new(users.iter());

	thread::scope(|scope| {
		let (tx, rx) = mpsc::channel();

		for _ in 0..workers {
			let tx = tx.clone();
			let queue = &queue;
			scope.spawn(move || {
				loop {
					let user = match queue.lock() {
						Ok(mut pending) => pending.next(),
						Err(_) => None,
					};
					let Some(user) = user else {
						break;
					};
					if !fetch_user(source, user, options.page_limit, &tx) {
						break;
					}
				}
			});
		}
		drop(tx);

		for event in rx {
			match event {
				Event::Page { user, comments } => {
					log::debug!("Building {} comments from {user}", comments.len());
					report.pages += 1;
					report.comments += comments.len();
					for comment in &comments {
						report.tokens += chain.build_text(comment);
					}
				}
				Event::Failed { user, error } => {
					log::warn!("Stopped fetching comments of {user}: {error}");
					report.failed_users.push(user);
				}
				Event::Done { user } => log::info!("Done getting data for user {user}"),
			}
		}
	});

	log::info!(
		"Harvested {} pages ({} comments) from {} users",
		report.pages,
		report.comments,
		report.users
	);
	report
}

/// Pages through one user's comments.
///
/// Returns false once the consumer is gone.
fn fetch_user<S>(source: &S, user: &str, page_limit: usize, tx: &mpsc::Sender<Event>) -> bool
where
	S: CommentSource + ?Sized,
{
	log::info!("Getting data for user {user}");

	let mut after: Option<String> = None;
	let mut fetched = 0;
	while page_limit == 0 || fetched < page_limit {
		let page = match source.fetch_page(user, after.as_deref()) {
			Ok(page) => page,
			Err(e) => {
				let event = Event::Failed { user: user.to_owned(), error: e.to_string() };
				return tx.send(event).is_ok();
			}
		};
		fetched += 1;

		let next = page.after.filter(|a| !a.is_empty());
		let event = Event::Page { user: user.to_owned(), comments: page.comments };
		if tx.send(event).is_err() {
			return false;
		}

		match next {
			Some(reference) => after = Some(reference),
			None => break,
		}
	}

	tx.send(Event::Done { user: user.to_owned() }).is_ok()
}
