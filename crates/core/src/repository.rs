//! Storage port shared by every persisted entity type.
//!
//! Implementations live in `stockroom-db`. All of them must satisfy:
//! - mutations (`create`, `update`, `delete`) are serialized, so two concurrent
//!   writers never both act on a stale snapshot;
//! - reads observe the latest committed snapshot, never a half-applied write;
//! - a failed write leaves the previously committed state intact;
//! - [`Repository::modify`] runs its closure and the resulting write as one
//!   step, so a check made inside the closure still holds when the write lands.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A persisted entity addressable by a caller-assigned string identifier.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &str;
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing file exists but does not hold a valid record sequence.
    #[error("store `{path}` is corrupt: {source}")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("store I/O failed for `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode records: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("record with id '{0}' already exists")]
    DuplicateId(String),
}

/// What a [`Repository::modify`] closure did to the records it was handed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<O> {
    /// Nothing changed; nothing is written.
    Unchanged(O),
    /// The records were changed and must be committed.
    Changed(O),
}

#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn find_all(&self) -> Result<Vec<T>, RepositoryError>;

    /// Returns `Ok(None)` when no record has this id.
    async fn find_by_id(&self, id: &str) -> Result<Option<T>, RepositoryError>;

    /// Appends `record`. Fails with [`RepositoryError::DuplicateId`] when its id is taken.
    async fn create(&self, record: T) -> Result<T, RepositoryError>;

    /// Replaces the record stored under `id` with `record`. Returns `Ok(None)` when absent.
    async fn update(&self, id: &str, record: T) -> Result<Option<T>, RepositoryError>;

    /// Removes and returns the record stored under `id`. Returns `Ok(None)` when absent.
    async fn delete(&self, id: &str) -> Result<Option<T>, RepositoryError>;

    /// Runs `apply` against a working copy of every committed record while
    /// holding the write gate. An `Err` or [`Outcome::Unchanged`] discards the
    /// copy; [`Outcome::Changed`] commits it before the gate is released.
    async fn modify<O, E, F>(&self, apply: F) -> Result<O, E>
    where
        F: FnOnce(&mut Vec<T>) -> Result<Outcome<O>, E> + Send,
        O: Send,
        E: From<RepositoryError> + Send;
}
