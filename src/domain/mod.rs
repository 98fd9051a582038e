pub mod notice;
pub mod failure;
pub mod record;

pub use notice::{Notice, NoticeContent};
pub use failure::FailureRecord;
pub use record::{HistoryFile, SourceRecord};
