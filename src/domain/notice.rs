use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dispatch::Dispatcher;
use crate::services::Source;

/// Identity of a notice. Two notices are the same notice iff all three
/// fields match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoticeContent {
    pub title: String,
    pub date: String,
    pub link: String,
}

impl NoticeContent {
    /// Collapses runs of whitespace in the title and trims date and link.
    pub fn new(title: &str, date: &str, link: &str) -> Self {
        Self {
            title: title.split_whitespace().collect::<Vec<_>>().join(" "),
            date: date.trim().to_string(),
            link: link.trim().to_string(),
        }
    }

    /// Last path segment of the link, e.g. `circular.pdf`
    pub fn file_name(&self) -> Option<&str> {
        let path = self.link.split(|c| c == '?' || c == '#').next().unwrap_or_default();
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Lowercased extension of the linked file, if any
    pub fn extension(&self) -> Option<String> {
        self.file_name()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl std::fmt::Display for NoticeContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.date, self.title, self.link)
    }
}

/// A notice found during one run, together with every source that
/// surfaced it.
#[derive(Clone)]
pub struct Notice<'a> {
    pub content: NoticeContent,
    sources: Vec<&'a Source>,
}

impl<'a> Notice<'a> {
    pub fn new(content: NoticeContent, source: &'a Source) -> Self {
        Self {
            content,
            sources: vec![source],
        }
    }

    /// Adds another contributing source; sources are unique by name.
    pub fn add_source(&mut self, source: &'a Source) {
        if !self.sources.iter().any(|s| s.name() == source.name()) {
            self.sources.push(source);
        }
    }

    pub fn sources(&self) -> &[&'a Source] {
        &self.sources
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Union of the contributing sources' dispatchers, first occurrence wins.
    pub fn dispatchers(&self) -> Vec<Arc<dyn Dispatcher>> {
        let mut union: Vec<Arc<dyn Dispatcher>> = Vec::new();
        for source in &self.sources {
            for dispatcher in source.dispatchers() {
                if !union.iter().any(|d| d.name() == dispatcher.name()) {
                    union.push(Arc::clone(dispatcher));
                }
            }
        }
        union
    }
}

impl std::fmt::Debug for Notice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notice")
            .field("content", &self.content)
            .field("sources", &self.source_names())
            .finish()
    }
}
