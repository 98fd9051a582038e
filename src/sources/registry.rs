use std::sync::Arc;

use crate::errors::{FeederError, FeederResult};
use crate::http::HttpClient;
use crate::sources::traits::{FeedReader, ReaderKind};
use crate::sources::{html_table::HtmlTableReader, rss_atom::RssAtomReader};

pub struct ReaderRegistry {
    readers: Vec<Arc<dyn FeedReader>>,
}

impl ReaderRegistry {
    /// Registry with every built-in reader sharing one HTTP client
    pub fn new(http: Arc<HttpClient>) -> Self {
        let mut registry = Self::empty();

        registry.register(Arc::new(HtmlTableReader::new(Arc::clone(&http))));
        registry.register(Arc::new(RssAtomReader::new(http)));

        registry
    }

    pub fn empty() -> Self {
        Self {
            readers: Vec::new(),
        }
    }

    /// Later registrations of the same kind replace earlier ones
    pub fn register(&mut self, reader: Arc<dyn FeedReader>) {
        self.readers.retain(|r| r.kind() != reader.kind());
        self.readers.push(reader);
    }

    pub fn get(&self, kind: ReaderKind) -> FeederResult<Arc<dyn FeedReader>> {
        self.readers
            .iter()
            .find(|r| r.kind() == kind)
            .cloned()
            .ok_or_else(|| FeederError::UnknownReader(kind.to_string()))
    }
}
