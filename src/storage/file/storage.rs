use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{FeederError, FeederResult};

const FAILURE_LOG_FILE: &str = "failed.jsonl";

/// Dump directory holding one history file per source plus the shared
/// failure log.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: Arc<PathBuf>,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> FeederResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| persistence_error(&root, e))?;

        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// Read-only view of `root`; nothing is created. A missing directory
    /// reads as empty.
    pub fn open<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: Arc::new(root.as_ref().to_path_buf()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_path(&self, source: &str) -> PathBuf {
        self.root.join(format!("{source}.json"))
    }

    pub fn failure_log_path(&self) -> PathBuf {
        self.root.join(FAILURE_LOG_FILE)
    }

    /// Read a file, treating a missing one as empty
    pub fn read_optional(&self, path: &Path) -> FeederResult<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence_error(path, e)),
        }
    }

    /// Write through a temporary sibling and rename, so readers never see a
    /// half-written file.
    pub fn write_replace(&self, path: &Path, contents: &[u8]) -> FeederResult<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents).map_err(|e| persistence_error(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| persistence_error(path, e))
    }
}

pub(crate) fn persistence_error(path: &Path, err: impl std::fmt::Display) -> FeederError {
    FeederError::Persistence(format!("{}: {}", path.display(), err))
}
