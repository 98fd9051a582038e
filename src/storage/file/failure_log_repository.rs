use std::fs::OpenOptions;
use std::io::Write;

use tracing::debug;

use crate::domain::FailureRecord;
use crate::errors::FeederResult;
use crate::storage::file::storage::{persistence_error, FileStorage};
use crate::storage::traits::FailureLogRepository;

/// JSON Lines file, one failure record per line. Only ever appended to.
pub struct FileFailureLog {
    storage: FileStorage,
}

impl FileFailureLog {
    pub fn new(storage: FileStorage) -> Self {
        Self { storage }
    }
}

impl FailureLogRepository for FileFailureLog {
    fn append(&self, records: &[FailureRecord]) -> FeederResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let path = self.storage.failure_log_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| persistence_error(&path, e))?;
        file.write_all(&buf).map_err(|e| persistence_error(&path, e))?;
        file.sync_data().map_err(|e| persistence_error(&path, e))?;

        debug!(path = %path.display(), appended = records.len(), "appended failure log");
        Ok(())
    }

    fn read_all(&self) -> FeederResult<Vec<FailureRecord>> {
        let path = self.storage.failure_log_path();
        let Some(contents) = self.storage.read_optional(&path)? else {
            return Ok(Vec::new());
        };

        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .map_err(|e| persistence_error(&path, format!("line {}: {}", idx + 1, e)))
            })
            .collect()
    }
}
