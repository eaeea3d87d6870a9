use async_trait::async_trait;
use cmr_types::{ComponentRecord, ComponentTuple, NewRecord};

use crate::error::StoreResult;

/// Persistent storage for component records.
///
/// All implementations must satisfy these invariants:
/// - Records are immutable once created; there is no update.
/// - The composite key is not unique. Lookups return the earliest inserted
///   match.
/// - Handles are shared across concurrent requests, so implementations must
///   be `Send + Sync` and safe for concurrent use.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Assign an id to `record` and append it durably.
    ///
    /// Returns the stored record. Does not check for duplicate tuples.
    async fn create(&self, record: NewRecord) -> StoreResult<ComponentRecord>;

    /// Append `record` only if no record for its tuple exists yet.
    ///
    /// The check and the append are one atomic step with respect to every
    /// other write on this store. Returns `Ok(Err(existing))` with the
    /// earliest matching record when the tuple is taken.
    async fn create_unique(&self, record: NewRecord) -> StoreResult<Result<ComponentRecord, ComponentRecord>>;

    /// Exact match on all four components.
    ///
    /// Returns `Ok(None)` if no record matches.
    async fn find_by_components(&self, tuple: &ComponentTuple) -> StoreResult<Option<ComponentRecord>>;

    /// Every record matching `tuple`, in storage order.
    async fn find_all_by_components(&self, tuple: &ComponentTuple) -> StoreResult<Vec<ComponentRecord>>;

    /// Snapshot of every record in storage order.
    ///
    /// Administrative and test use only.
    async fn list_all(&self) -> StoreResult<Vec<ComponentRecord>>;

    /// Remove every record and return how many were removed.
    ///
    /// Administrative and test use only. Callers are responsible for gating
    /// this away from production traffic.
    async fn clear_all(&self) -> StoreResult<usize>;

    /// Number of stored records.
    async fn count(&self) -> StoreResult<usize> {
        Ok(self.list_all().await?.len())
    }
}
