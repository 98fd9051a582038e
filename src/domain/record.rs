use serde::{Deserialize, Serialize};

use super::NoticeContent;

/// Persisted projection of a source: its configuration without the
/// runtime-only parts (history, reader, storage handles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,
    pub url: String,
    pub dispatchers: Vec<String>,
    pub max_dump: usize,
}

/// On-disk layout of one source's history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFile {
    pub source: SourceRecord,
    /// Most recent first
    pub notices: Vec<NoticeContent>,
}
