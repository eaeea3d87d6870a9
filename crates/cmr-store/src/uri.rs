//! Connection strings for record stores.
//!
//! - `memory://` -- a fresh [`InMemoryRecordStore`]
//! - `file:///var/lib/cmr/records.jsonl` or a bare path -- a [`FileRecordStore`]

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::file::{FileRecordStore, SyncMode};
use crate::memory::InMemoryRecordStore;
use crate::traits::RecordStore;

/// A parsed store connection string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreUri {
    Memory,
    File(PathBuf),
}

impl FromStr for StoreUri {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(StoreError::InvalidUri("empty connection string".into()));
        }
        if s == "memory://" || s == "memory" {
            return Ok(Self::Memory);
        }
        if let Some(path) = s.strip_prefix("file://") {
            if path.is_empty() {
                return Err(StoreError::InvalidUri(format!("missing path in {s:?}")));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = s.split_once("://") {
            return Err(StoreError::InvalidUri(format!("unsupported scheme {scheme:?}")));
        }
        Ok(Self::File(PathBuf::from(s)))
    }
}

impl fmt::Display for StoreUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory://"),
            Self::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

impl StoreUri {
    /// Connect to the store this URI names.
    pub fn open(&self, sync_mode: SyncMode) -> StoreResult<Arc<dyn RecordStore>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryRecordStore::new())),
            Self::File(path) => Ok(Arc::new(FileRecordStore::open(path, sync_mode)?)),
        }
    }
}

/// Parse `uri` and connect to it.
pub fn open_store(uri: &str, sync_mode: SyncMode) -> StoreResult<Arc<dyn RecordStore>> {
    let parsed: StoreUri = uri.parse()?;
    tracing::info!(store = %parsed, "connecting record store");
    parsed.open(sync_mode)
}
