//! Single-file JSON persistence for an ordered record sequence.
//!
//! On-disk format is a pretty-printed JSON array. Saves replace the whole file
//! through a temporary sibling and a rename, so a reader sees either the old
//! or the new sequence, never a torn write.

use std::fmt;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use stockroom_core::repository::{Record, RepositoryError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

pub struct JsonFileStore<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

impl<T: Record> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), _records: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record. A missing or blank file is an empty collection.
    pub async fn load(&self) -> Result<Vec<T>, RepositoryError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                debug!(
                    event_name = "store.load.missing",
                    path = %self.path.display(),
                    "store file absent, starting empty"
                );
                return Ok(Vec::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let records: Vec<T> = serde_json::from_slice(&bytes).map_err(|source| {
            error!(
                event_name = "store.load.corrupt",
                path = %self.path.display(),
                error = %source,
                "store file could not be parsed"
            );
            RepositoryError::CorruptStore { path: self.path.clone(), source }
        })?;
        debug!(
            event_name = "store.load",
            path = %self.path.display(),
            record_count = records.len(),
            "store loaded"
        );
        Ok(records)
    }

    /// Replaces the stored sequence with `records`.
    ///
    /// On failure the previously committed file is left as it was.
    pub async fn save(&self, records: &[T]) -> Result<(), RepositoryError> {
        let mut bytes = serde_json::to_vec_pretty(records).map_err(RepositoryError::Encode)?;
        bytes.push(b'\n');

        let dir = self.parent_dir();
        fs::create_dir_all(&dir).await.map_err(|source| self.io_error(source))?;

        let temp_path = dir.join(format!(".{}.{}.tmp", self.file_name(), Uuid::new_v4().simple()));
        let written = async {
            write_synced(&temp_path, &bytes).await?;
            fs::rename(&temp_path, &self.path).await
        }
        .await;

        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path).await;
            error!(
                event_name = "store.save.failed",
                path = %self.path.display(),
                error = %source,
                "store write failed"
            );
            return Err(self.io_error(source));
        }

        // the rename is already visible; a failed dir sync only weakens crash durability
        if let Err(source) = sync_dir(&dir).await {
            warn!(
                event_name = "store.save.dir_sync_failed",
                path = %dir.display(),
                error = %source,
                "store directory could not be synced"
            );
        }

        debug!(
            event_name = "store.save",
            path = %self.path.display(),
            record_count = records.len(),
            "store saved"
        );
        Ok(())
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string())
    }

    fn io_error(&self, source: std::io::Error) -> RepositoryError {
        RepositoryError::Io { path: self.path.clone(), source }
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Flushes directory entries so a completed rename survives a crash.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

impl<T> fmt::Debug for JsonFileStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileStore").field("path", &self.path).finish()
    }
}
