use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use proctor_core::report::user_report_file_name;
use proctor_core::ReportLine;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Append-only per-user report logs under one directory.
///
/// Appends for the same user are serialised; different users write
/// concurrently.
#[derive(Clone)]
pub struct ReportLog {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ReportLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(user_report_file_name(user_id))
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Drop the path's lock entry unless another append still holds a clone.
    fn release(&self, path: &Path, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held by the caller
        if Arc::strong_count(lock) == 2 {
            locks.remove(path);
        }
    }

    /// Append one line to the user's report, creating the directory if absent.
    pub async fn append(&self, user_id: &str, line: &ReportLine) -> Result<PathBuf, ReportError> {
        let path = self.path_for(user_id);
        let lock = self.lock_for(&path);
        let result = {
            let _guard = lock.lock().await;
            self.write_line(&path, line).await
        };
        self.release(&path, &lock);
        result.map(|()| path)
    }

    async fn write_line(&self, path: &Path, line: &ReportLine) -> Result<(), ReportError> {
        let io_err = |source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ReportError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(io_err)?;
        file.write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(io_err)?;
        file.flush().await.map_err(io_err)
    }

    #[cfg(test)]
    fn tracked_paths(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
