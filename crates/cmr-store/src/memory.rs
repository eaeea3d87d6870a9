//! In-memory record store for testing and ephemeral use.
//!
//! [`InMemoryRecordStore`] keeps records in a `Vec` behind a `RwLock`, so
//! storage order is insertion order. Data is lost when the store is dropped.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use cmr_types::{ComponentRecord, ComponentTuple, NewRecord};

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

/// An in-memory implementation of [`RecordStore`].
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<ComponentRecord>>,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`, kept in the given order.
    pub fn with_records(records: Vec<ComponentRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(&self, record: NewRecord) -> StoreResult<ComponentRecord> {
        let record = record.into_record();
        self.records.write().map_err(poisoned)?.push(record.clone());
        tracing::debug!(id = %record.id, tuple = %record.tuple, "record created");
        Ok(record)
    }

    async fn create_unique(&self, record: NewRecord) -> StoreResult<Result<ComponentRecord, ComponentRecord>> {
        let mut records = self.records.write().map_err(poisoned)?;
        if let Some(existing) = records.iter().find(|r| r.matches(&record.tuple)) {
            return Ok(Err(existing.clone()));
        }
        let record = record.into_record();
        records.push(record.clone());
        tracing::debug!(id = %record.id, tuple = %record.tuple, "unique record created");
        Ok(Ok(record))
    }

    async fn find_by_components(&self, tuple: &ComponentTuple) -> StoreResult<Option<ComponentRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().find(|r| r.matches(tuple)).cloned())
    }

    async fn find_all_by_components(&self, tuple: &ComponentTuple) -> StoreResult<Vec<ComponentRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().filter(|r| r.matches(tuple)).cloned().collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<ComponentRecord>> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }

    async fn clear_all(&self) -> StoreResult<usize> {
        let mut records = self.records.write().map_err(poisoned)?;
        let removed = records.len();
        records.clear();
        Ok(removed)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }
}
