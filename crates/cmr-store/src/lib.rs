//! Record storage for the component metadata resolver.
//!
//! A record store persists [`ComponentRecord`](cmr_types::ComponentRecord)s
//! and answers exact-match lookups on the composite key. Records are appended,
//! never updated; the only deletion is a bulk clear meant for non-production
//! use.
//!
//! # Storage Backends
//!
//! All backends implement the [`RecordStore`] trait:
//!
//! - [`InMemoryRecordStore`] -- `Vec`-based store for tests and ephemeral runs
//! - [`FileRecordStore`] -- JSON-lines append log on local disk
//!
//! [`open_store`] builds a backend from a connection string.
//!
//! # Design Rules
//!
//! 1. The composite key is not a unique key. Duplicate tuples coexist and
//!    lookups return the earliest inserted match.
//! 2. Storage order is insertion order for every bundled backend.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod uri;

pub use error::{StoreError, StoreResult};
pub use file::{FileRecordStore, SyncMode};
pub use memory::InMemoryRecordStore;
pub use traits::RecordStore;
pub use uri::{open_store, StoreUri};
