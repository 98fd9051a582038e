use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NoticeContent;

/// One entry of the append-only failure log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub content: NoticeContent,
    pub failed_dispatchers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_at: Option<DateTime<Utc>>,
}

impl FailureRecord {
    pub fn new(content: NoticeContent, failed_dispatchers: Vec<String>) -> Self {
        Self {
            content,
            failed_dispatchers,
            logged_at: Some(Utc::now()),
        }
    }
}
