use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use predtext_core::error::{PredTextError, Result};
use predtext_core::harvest::{CommentPage, CommentSource};

const BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = concat!("predtext/", env!("CARGO_PKG_VERSION"), " (comment harvester)");

/// Listing envelope returned by `/user/{name}/comments.json`.
#[derive(Deserialize)]
struct Listing {
	data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
	#[serde(default)]
	children: Vec<Child>,
	after: Option<String>,
}

#[derive(Deserialize)]
struct Child {
	data: Comment,
}

#[derive(Deserialize)]
struct Comment {
	#[serde(default)]
	body: String,
}

/// Fetches public user comments from Reddit.
pub struct RedditClient {
	client: Client,
	base_url: String,
}

impl RedditClient {
	pub fn new() -> Result<Self> {
		Self::with_base_url(BASE_URL)
	}

	pub fn with_base_url(base_url: &str) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_secs(10))
			.user_agent(USER_AGENT)
			.build()
			.map_err(|e| PredTextError::Fetch(e.to_string()))?;
		Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
	}
}

impl CommentSource for RedditClient {
	fn fetch_page(&self, user: &str, after: Option<&str>) -> Result<CommentPage> {
		let url = format!("{}/user/{user}/comments.json", self.base_url);
		let mut request = self.client.get(&url);
		if let Some(after) = after {
			request = request.query(&[("after", after)]);
		}

		let response = request
			.send()
			.map_err(|e| PredTextError::Fetch(format!("Failed to fetch {url}: {e}")))?;
		if !response.status().is_success() {
			return Err(PredTextError::Fetch(format!("HTTP {} when fetching {url}", response.status())));
		}

		let body = response
			.text()
			.map_err(|e| PredTextError::Fetch(format!("Failed to read response body: {e}")))?;
		parse_listing(&body)
	}
}

fn parse_listing(body: &str) -> Result<CommentPage> {
	let listing: Listing = serde_json::from_str(body)?;
	let comments = listing
		.data
		.children
		.into_iter()
		.map(|child| child.data.body)
		.filter(|body| !body.trim().is_empty())
		.collect();
	Ok(CommentPage { comments, after: listing.data.after })
}
