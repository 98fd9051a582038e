use serde::{Deserialize, Serialize};

use crate::domain::NoticeContent;
use crate::errors::FeederResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderKind {
    /// Two-column `<table>` of links and dates
    #[default]
    HtmlTable,
    /// RSS, Atom or JSON Feed
    Rss,
}

impl ReaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderKind::HtmlTable => "html_table",
            ReaderKind::Rss => "rss",
        }
    }
}

impl std::str::FromStr for ReaderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html_table" | "html" | "table" => Ok(ReaderKind::HtmlTable),
            "rss" | "atom" | "feed" => Ok(ReaderKind::Rss),
            _ => Err(format!("Unknown reader kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ReaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait FeedReader: Send + Sync {
    /// Identifies this reader
    fn kind(&self) -> ReaderKind;

    /// Read the feed at `address`, newest first, keeping at most
    /// `max_items` valid notices. Items without a title, date or link are
    /// skipped and do not count toward the limit.
    fn read(&self, address: &str, max_items: usize) -> FeederResult<Vec<NoticeContent>>;
}
