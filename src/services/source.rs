use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::domain::{NoticeContent, SourceRecord};
use crate::errors::{FeederError, FeederResult};
use crate::sources::FeedReader;
use crate::storage::HistoryRepository;

/// One notice feed: where to read it, who to tell, and what was already
/// sent.
pub struct Source {
    name: String,
    address: String,
    history_cap: usize,
    dispatchers: Vec<Arc<dyn Dispatcher>>,
    reader: Arc<dyn FeedReader>,
    store: Arc<dyn HistoryRepository>,
    history: Vec<NoticeContent>,
    committed: bool,
}

impl Source {
    /// Builds the source and loads its persisted history. Only the newest
    /// `history_cap` entries are kept as the comparison window.
    pub fn new(
        name: String,
        address: String,
        history_cap: usize,
        dispatchers: Vec<Arc<dyn Dispatcher>>,
        reader: Arc<dyn FeedReader>,
        store: Arc<dyn HistoryRepository>,
    ) -> FeederResult<Self> {
        if history_cap == 0 {
            return Err(FeederError::Config(format!(
                "source '{}': history cap must be positive",
                name
            )));
        }
        if dispatchers.is_empty() {
            return Err(FeederError::Config(format!(
                "source '{}' has no dispatchers",
                name
            )));
        }

        let mut history = store.load(&name)?;
        history.truncate(history_cap);
        debug!(source = %name, history = history.len(), "source ready");

        Ok(Self {
            name,
            address,
            history_cap,
            dispatchers,
            reader,
            store,
            history,
            committed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn history_cap(&self) -> usize {
        self.history_cap
    }

    pub fn dispatchers(&self) -> &[Arc<dyn Dispatcher>] {
        &self.dispatchers
    }

    /// Most recent first
    pub fn history(&self) -> &[NoticeContent] {
        &self.history
    }

    /// Persisted projection of this source
    pub fn record(&self) -> SourceRecord {
        SourceRecord {
            name: self.name.clone(),
            url: self.address.clone(),
            dispatchers: self.dispatchers.iter().map(|d| d.name().to_string()).collect(),
            max_dump: self.history_cap,
        }
    }

    /// Current feed contents in feed order, at most `history_cap` items
    pub fn fetch_current(&self) -> FeederResult<Vec<NoticeContent>> {
        let mut current = self.reader.read(&self.address, self.history_cap)?;
        current.truncate(self.history_cap);
        debug!(source = %self.name, fetched = current.len(), "fetched feed");
        Ok(current)
    }

    /// Items of `current` not in history, feed order kept. Repeats within
    /// `current` are reported once.
    pub fn new_among(&self, current: Vec<NoticeContent>) -> Vec<NoticeContent> {
        let mut seen: HashSet<NoticeContent> = self.history.iter().cloned().collect();
        current
            .into_iter()
            .filter(|content| seen.insert(content.clone()))
            .collect()
    }

    /// Fetch the feed and diff it against history. History is untouched.
    pub fn diff_new(&self) -> FeederResult<Vec<NoticeContent>> {
        let current = self.fetch_current()?;
        Ok(self.new_among(current))
    }

    /// Prepend `dispatched` (newest first) to history, trim to the cap and
    /// overwrite the persisted copy. In-memory history only changes once the
    /// write succeeded.
    pub fn commit(&mut self, dispatched: Vec<NoticeContent>) -> FeederResult<()> {
        if self.committed {
            return Err(FeederError::AlreadyCommitted(self.name.clone()));
        }

        let added = dispatched.len();
        let mut history = dispatched;
        history.extend(self.history.iter().cloned());
        history.truncate(self.history_cap);

        self.store.save(&self.record(), &history)?;
        self.history = history;
        self.committed = true;

        info!(source = %self.name, added, history = self.history.len(), "committed history");
        Ok(())
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("dispatchers", &self.dispatchers)
            .field("history_cap", &self.history_cap)
            .finish()
    }
}
