pub mod traits;
pub mod file;

pub use traits::{FailureLogRepository, HistoryRepository};
pub use file::{FileFailureLog, FileHistoryRepository, FileStorage};
