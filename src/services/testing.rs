//! In-memory doubles shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::dispatch::{Dispatcher, DispatcherKind};
use crate::domain::{FailureRecord, Notice, NoticeContent, SourceRecord};
use crate::errors::{FeederError, FeederResult};
use crate::services::Source;
use crate::sources::{FeedReader, ReaderKind};
use crate::storage::{FailureLogRepository, HistoryRepository};

pub fn content(title: &str, date: &str, link: &str) -> NoticeContent {
    NoticeContent::new(title, date, link)
}

/// Feed reader returning a fixed list, or a fixed fetch error
pub struct StaticReader {
    items: Result<Vec<NoticeContent>, String>,
}

impl StaticReader {
    pub fn new(items: Vec<NoticeContent>) -> Arc<Self> {
        Arc::new(Self { items: Ok(items) })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            items: Err(reason.to_string()),
        })
    }
}

impl FeedReader for StaticReader {
    fn kind(&self) -> ReaderKind {
        ReaderKind::HtmlTable
    }

    fn read(&self, address: &str, max_items: usize) -> FeederResult<Vec<NoticeContent>> {
        match &self.items {
            Ok(items) => Ok(items.iter().take(max_items).cloned().collect()),
            Err(reason) => Err(FeederError::Fetch {
                url: address.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

/// History store kept in a map; can be told to fail saving one source
#[derive(Default)]
pub struct MemoryHistory {
    stored: Mutex<HashMap<String, Vec<NoticeContent>>>,
    fail_on: Mutex<Option<String>>,
}

impl MemoryHistory {
    pub fn with(source: &str, notices: Vec<NoticeContent>) -> Self {
        let history = Self::default();
        history.stored.lock().unwrap().insert(source.to_string(), notices);
        history
    }

    pub fn fail_saving(&self, source: &str) {
        *self.fail_on.lock().unwrap() = Some(source.to_string());
    }

    pub fn stored(&self, source: &str) -> Vec<NoticeContent> {
        self.stored.lock().unwrap().get(source).cloned().unwrap_or_default()
    }

    pub fn has_saved(&self, source: &str) -> bool {
        self.stored.lock().unwrap().contains_key(source)
    }
}

impl HistoryRepository for MemoryHistory {
    fn load(&self, source: &str) -> FeederResult<Vec<NoticeContent>> {
        Ok(self.stored(source))
    }

    fn save(&self, record: &SourceRecord, notices: &[NoticeContent]) -> FeederResult<()> {
        if self.fail_on.lock().unwrap().as_deref() == Some(record.name.as_str()) {
            return Err(FeederError::Persistence(format!("cannot write {}", record.name)));
        }
        self.stored
            .lock()
            .unwrap()
            .insert(record.name.clone(), notices.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFailureLog {
    records: Mutex<Vec<FailureRecord>>,
}

impl MemoryFailureLog {
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl FailureLogRepository for MemoryFailureLog {
    fn append(&self, records: &[FailureRecord]) -> FeederResult<()> {
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    fn read_all(&self) -> FeederResult<Vec<FailureRecord>> {
        Ok(self.records())
    }
}

/// Dispatcher that records what it was asked to send
pub struct RecordingDispatcher {
    name: String,
    fail_titles: HashSet<String>,
    fail_all: bool,
    sent: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingDispatcher {
    pub fn succeeding(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_titles: HashSet::new(),
            fail_all: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_titles: HashSet::new(),
            fail_all: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(name: &str, titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            fail_all: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Titles in the order they were sent
    pub fn sent_titles(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Source names attached to each sent notice
    pub fn sent_sources(&self) -> Vec<Vec<String>> {
        self.sent.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DispatcherKind {
        DispatcherKind::Telegram
    }

    fn send(&self, notice: &Notice<'_>) -> bool {
        let sources = notice.source_names().iter().map(|s| s.to_string()).collect();
        self.sent
            .lock()
            .unwrap()
            .push((notice.content.title.clone(), sources));
        !self.fail_all && !self.fail_titles.contains(&notice.content.title)
    }
}

fn shared(dispatchers: &[Arc<RecordingDispatcher>]) -> Vec<Arc<dyn Dispatcher>> {
    dispatchers
        .iter()
        .map(|d| Arc::clone(d) as Arc<dyn Dispatcher>)
        .collect()
}

/// Source with an empty feed and the given history
pub fn source(name: &str, dispatchers: &[Arc<RecordingDispatcher>], history: &[NoticeContent]) -> Source {
    source_with(
        name,
        dispatchers,
        StaticReader::new(Vec::new()),
        Arc::new(MemoryHistory::with(name, history.to_vec())),
        50,
    )
}

pub fn source_with(
    name: &str,
    dispatchers: &[Arc<RecordingDispatcher>],
    reader: Arc<StaticReader>,
    history: Arc<MemoryHistory>,
    cap: usize,
) -> Source {
    Source::new(
        name.to_string(),
        format!("http://www.example.edu/{}", name.to_lowercase()),
        cap,
        shared(dispatchers),
        reader,
        history,
    )
    .unwrap()
}
