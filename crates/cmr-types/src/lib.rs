//! Foundation types for the component metadata resolver (CMR).
//!
//! A full car is identified by four component ids (wheel, engine, build,
//! wrapping). This crate defines that composite key, the persisted record
//! that maps it to externally stored asset references, the public
//! metadata-pointer payload, and the validator every write and read path runs
//! before touching a store.
//!
//! # Key Types
//!
//! - [`ComponentKind`] -- the four component categories, in key order
//! - [`ComponentId`] -- bounded integer id for one component
//! - [`ComponentTuple`] -- the composite key `(wheel, engine, build, wrapping)`
//! - [`ComponentRecord`] -- a persisted record with its asset references
//! - [`AssetRefs`] -- image / voxel asset / metadata pointers
//! - [`TokenUri`] -- the public read payload (`{"tokenURI": ...}`)
//! - [`Validator`] -- parse-then-validate for raw tokens

pub mod component;
pub mod error;
pub mod pointer;
pub mod record;
pub mod validate;

pub use component::{ComponentId, ComponentKind, ComponentTuple};
pub use error::{TypeError, ValidationError};
pub use pointer::TokenUri;
pub use record::{AssetRefs, ComponentRecord, NewRecord, RecordId, RecordState};
pub use validate::{Validator, DEFAULT_MAX_COMPONENT_SUPPLY};
