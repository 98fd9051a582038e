mod storage;
mod history_repository;
mod failure_log_repository;

pub use storage::FileStorage;
pub use history_repository::FileHistoryRepository;
pub use failure_log_repository::FileFailureLog;
