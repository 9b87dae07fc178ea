use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use stockroom_core::repository::{Outcome, Record, Repository, RepositoryError};
use tokio::sync::{Mutex, RwLock};

use crate::store::JsonFileStore;

/// File-backed repository with a cached committed snapshot.
///
/// Mutations hold `write_gate` across load -> modify -> save and publish the new
/// snapshot only after the save succeeded. Reads clone the current snapshot.
pub struct JsonFileRepository<T> {
    store: JsonFileStore<T>,
    snapshot: RwLock<Option<Arc<Vec<T>>>>,
    write_gate: Mutex<()>,
}

impl<T: Record> JsonFileRepository<T> {
    pub fn new(store: JsonFileStore<T>) -> Self {
        Self { store, snapshot: RwLock::new(None), write_gate: Mutex::new(()) }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonFileStore::new(path))
    }

    async fn current(&self) -> Result<Arc<Vec<T>>, RepositoryError> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let _gate = self.write_gate.lock().await;
        self.current_locked().await
    }

    // Caller must hold `write_gate`.
    async fn current_locked(&self) -> Result<Arc<Vec<T>>, RepositoryError> {
        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let loaded = Arc::new(self.store.load().await?);
        *self.snapshot.write().await = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Runs `apply` against a copy of the committed records. When it reports a
    /// change, the copy is saved and becomes the new snapshot.
    async fn commit<O, E, F>(&self, apply: F) -> Result<O, E>
    where
        F: FnOnce(&mut Vec<T>) -> Result<Outcome<O>, E> + Send,
        O: Send,
        E: From<RepositoryError> + Send,
    {
        let _gate = self.write_gate.lock().await;
        let current = self.current_locked().await?;

        let mut next = current.as_ref().clone();
        match apply(&mut next)? {
            Outcome::Unchanged(outcome) => Ok(outcome),
            Outcome::Changed(outcome) => {
                self.store.save(&next).await?;
                *self.snapshot.write().await = Some(Arc::new(next));
                Ok(outcome)
            }
        }
    }
}

#[async_trait]
impl<T: Record> Repository<T> for JsonFileRepository<T> {
    async fn find_all(&self) -> Result<Vec<T>, RepositoryError> {
        Ok(self.current().await?.as_ref().clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        Ok(self.current().await?.iter().find(|record| record.id() == id).cloned())
    }

    async fn create(&self, record: T) -> Result<T, RepositoryError> {
        self.commit(move |records: &mut Vec<T>| {
            if records.iter().any(|existing| existing.id() == record.id()) {
                return Err(RepositoryError::DuplicateId(record.id().to_string()));
            }
            records.push(record.clone());
            Ok(Outcome::Changed(record))
        })
        .await
    }

    async fn update(&self, id: &str, record: T) -> Result<Option<T>, RepositoryError> {
        self.commit(move |records: &mut Vec<T>| {
            let Some(slot) = records.iter_mut().find(|existing| existing.id() == id) else {
                return Ok(Outcome::Unchanged(None));
            };
            *slot = record.clone();
            Ok(Outcome::Changed(Some(record)))
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        self.commit(move |records: &mut Vec<T>| {
            let Some(index) = records.iter().position(|existing| existing.id() == id) else {
                return Ok(Outcome::Unchanged(None));
            };
            Ok(Outcome::Changed(Some(records.remove(index))))
        })
        .await
    }

    async fn modify<O, E, F>(&self, apply: F) -> Result<O, E>
    where
        F: FnOnce(&mut Vec<T>) -> Result<Outcome<O>, E> + Send,
        O: Send,
        E: From<RepositoryError> + Send,
    {
        self.commit(apply).await
    }
}

impl<T> fmt::Debug for JsonFileRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileRepository").field("store", &self.store).finish_non_exhaustive()
    }
}
