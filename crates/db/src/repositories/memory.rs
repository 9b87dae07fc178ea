use async_trait::async_trait;
use stockroom_core::repository::{Outcome, Record, Repository, RepositoryError};
use tokio::sync::RwLock;

/// Non-durable repository for tests and embedding.
pub struct InMemoryRepository<T> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn with_records(records: Vec<T>) -> Self {
        Self { records: RwLock::new(records) }
    }
}

impl<T: Record> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for InMemoryRepository<T> {
    async fn find_all(&self) -> Result<Vec<T>, RepositoryError> {
        Ok(self.records.read().await.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|record| record.id() == id).cloned())
    }

    async fn create(&self, record: T) -> Result<T, RepositoryError> {
        let mut records = self.records.write().await;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(RepositoryError::DuplicateId(record.id().to_string()));
        }
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, record: T) -> Result<Option<T>, RepositoryError> {
        let mut records = self.records.write().await;
        let Some(slot) = records.iter_mut().find(|existing| existing.id() == id) else {
            return Ok(None);
        };
        *slot = record.clone();
        Ok(Some(record))
    }

    async fn delete(&self, id: &str) -> Result<Option<T>, RepositoryError> {
        let mut records = self.records.write().await;
        let position = records.iter().position(|existing| existing.id() == id);
        Ok(position.map(|index| records.remove(index)))
    }

    async fn modify<O, E, F>(&self, apply: F) -> Result<O, E>
    where
        F: FnOnce(&mut Vec<T>) -> Result<Outcome<O>, E> + Send,
        O: Send,
        E: From<RepositoryError> + Send,
    {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        match apply(&mut next)? {
            Outcome::Unchanged(outcome) => Ok(outcome),
            Outcome::Changed(outcome) => {
                *records = next;
                Ok(outcome)
            }
        }
    }
}

impl<T> std::fmt::Debug for InMemoryRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository").finish_non_exhaustive()
    }
}
