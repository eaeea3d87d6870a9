use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::ComponentTuple;
use crate::error::TypeError;

/// Store-assigned identifier for a record (UUID v7, so ids sort in insertion
/// order).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    /// Generate a new time-ordered record id.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Short representation (first 8 characters of the UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.short_id())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidRecordId(e.to_string()))
    }
}

/// Pointers to the externally stored artifacts of a full car.
///
/// Each field is an opaque URI or content identifier. The empty string is the
/// placeholder written for drafts whose assets have not been uploaded yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetRefs {
    pub image_ref: String,
    pub asset_ref: String,
    pub metadata_ref: String,
}

impl AssetRefs {
    pub fn new(
        image_ref: impl Into<String>,
        asset_ref: impl Into<String>,
        metadata_ref: impl Into<String>,
    ) -> Self {
        Self {
            image_ref: image_ref.into(),
            asset_ref: asset_ref.into(),
            metadata_ref: metadata_ref.into(),
        }
    }

    /// All-empty placeholders for a draft record.
    pub fn placeholder() -> Self {
        Self::default()
    }

    fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("imageRef", self.image_ref.as_str()),
            ("assetRef", self.asset_ref.as_str()),
            ("metadataRef", self.metadata_ref.as_str()),
        ]
    }

    /// Names of the references that are still placeholders.
    pub fn missing(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }

    /// `true` if every reference is a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.missing().len() == 3
    }

    /// `true` if every reference is populated.
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Whether a record's assets have been uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// All references are placeholders.
    Draft,
    /// All references are populated.
    Finished,
}

/// A record as submitted for creation, before the store assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRecord {
    pub tuple: ComponentTuple,
    pub refs: AssetRefs,
}

impl NewRecord {
    pub fn new(tuple: ComponentTuple, refs: AssetRefs) -> Self {
        Self { tuple, refs }
    }

    pub fn draft(tuple: ComponentTuple) -> Self {
        Self::new(tuple, AssetRefs::placeholder())
    }

    /// Assign an id and creation time, producing the persisted form.
    pub fn into_record(self) -> ComponentRecord {
        ComponentRecord {
            id: RecordId::new(),
            tuple: self.tuple,
            refs: self.refs,
            created_at: Utc::now(),
        }
    }
}

/// A persisted full-car record.
///
/// Serialized flat: `{id, wheel, engine, build, wrapping, imageRef, assetRef,
/// metadataRef, createdAt}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRecord {
    pub id: RecordId,
    #[serde(flatten)]
    pub tuple: ComponentTuple,
    #[serde(flatten)]
    pub refs: AssetRefs,
    pub created_at: DateTime<Utc>,
}

impl ComponentRecord {
    pub fn state(&self) -> RecordState {
        if self.refs.is_placeholder() {
            RecordState::Draft
        } else {
            RecordState::Finished
        }
    }

    pub fn metadata_ref(&self) -> &str {
        &self.refs.metadata_ref
    }

    pub fn matches(&self, tuple: &ComponentTuple) -> bool {
        self.tuple == *tuple
    }
}
