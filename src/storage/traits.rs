use crate::domain::{FailureRecord, NoticeContent, SourceRecord};
use crate::errors::FeederResult;

#[cfg_attr(test, mockall::automock)]
pub trait HistoryRepository: Send + Sync {
    /// Previously dispatched notices of `source`, most recent first.
    /// A source that never committed has an empty history.
    fn load(&self, source: &str) -> FeederResult<Vec<NoticeContent>>;

    /// Replace the stored history of `record.name` with `notices`.
    fn save(&self, record: &SourceRecord, notices: &[NoticeContent]) -> FeederResult<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait FailureLogRepository: Send + Sync {
    fn append(&self, records: &[FailureRecord]) -> FeederResult<()>;
    fn read_all(&self) -> FeederResult<Vec<FailureRecord>>;
}

impl<T: FailureLogRepository + ?Sized> FailureLogRepository for std::sync::Arc<T> {
    fn append(&self, records: &[FailureRecord]) -> FeederResult<()> {
        (**self).append(records)
    }

    fn read_all(&self) -> FeederResult<Vec<FailureRecord>> {
        (**self).read_all()
    }
}
