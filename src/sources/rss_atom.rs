use std::sync::Arc;

use feed_rs::parser;
use url::Url;

use crate::domain::NoticeContent;
use crate::errors::{FeederError, FeederResult};
use crate::http::HttpClient;
use crate::sources::traits::{FeedReader, ReaderKind};

/// Content types a syndication feed may be served with
const FEED_TYPES: &[&str] = &["xml", "rss", "atom", "json", "text/plain"];

pub struct RssAtomReader {
    http: Arc<HttpClient>,
}

impl RssAtomReader {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }
}

impl FeedReader for RssAtomReader {
    fn kind(&self) -> ReaderKind {
        ReaderKind::Rss
    }

    fn read(&self, address: &str, max_items: usize) -> FeederResult<Vec<NoticeContent>> {
        let document = self.http.fetch_page(address, FEED_TYPES)?;
        parse_notices(&document.bytes, address, max_items)
    }
}

/// Parse RSS/Atom/JSON feed bytes into notices. The entry date is the
/// published date, falling back to the updated date, as `YYYY-MM-DD`.
pub fn parse_notices(bytes: &[u8], base_url: &str, max_items: usize) -> FeederResult<Vec<NoticeContent>> {
    let base = Url::parse(base_url).map_err(|e| FeederError::InvalidUrl(format!("{base_url}: {e}")))?;
    let feed = parser::parse(bytes).map_err(|e| FeederError::FeedParse(e.to_string()))?;

    let notices = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| t.content)?;
            if title.trim().is_empty() {
                return None;
            }

            let date = entry
                .published
                .or(entry.updated)?
                .date_naive()
                .format("%Y-%m-%d")
                .to_string();

            let href = entry.links.into_iter().next()?.href;
            let link = base.join(href.trim()).ok()?;

            Some(NoticeContent::new(&title, &date, link.as_str()))
        })
        .take(max_items)
        .collect();

    Ok(notices)
}
