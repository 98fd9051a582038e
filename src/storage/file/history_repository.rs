use tracing::debug;

use crate::domain::{HistoryFile, NoticeContent, SourceRecord};
use crate::errors::FeederResult;
use crate::storage::file::storage::{persistence_error, FileStorage};
use crate::storage::traits::HistoryRepository;

pub struct FileHistoryRepository {
    storage: FileStorage,
}

impl FileHistoryRepository {
    pub fn new(storage: FileStorage) -> Self {
        Self { storage }
    }
}

impl HistoryRepository for FileHistoryRepository {
    fn load(&self, source: &str) -> FeederResult<Vec<NoticeContent>> {
        let path = self.storage.history_path(source);
        let Some(contents) = self.storage.read_optional(&path)? else {
            return Ok(Vec::new());
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let file: HistoryFile =
            serde_json::from_str(&contents).map_err(|e| persistence_error(&path, e))?;

        debug!(source, total = file.notices.len(), "loaded history");
        Ok(file.notices)
    }

    fn save(&self, record: &SourceRecord, notices: &[NoticeContent]) -> FeederResult<()> {
        let path = self.storage.history_path(&record.name);
        let file = HistoryFile {
            source: record.clone(),
            notices: notices.to_vec(),
        };

        let json = serde_json::to_vec_pretty(&file)?;
        self.storage.write_replace(&path, &json)?;

        debug!(source = %record.name, total = notices.len(), "saved history");
        Ok(())
    }
}
