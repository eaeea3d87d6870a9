use thiserror::Error;

use crate::component::ComponentKind;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    #[error("unknown component kind: {0}")]
    UnknownComponent(String),
}

/// Reasons a composite key or its asset references fail validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The token for `field` is not an integer.
    #[error("{field} id is not an integer: {token:?}")]
    MalformedId { field: ComponentKind, token: String },

    /// The id for `field` is outside `0..=max`.
    #[error("{field} id {value} is out of range 0..={max}")]
    OutOfRange {
        field: ComponentKind,
        value: String,
        max: u32,
    },

    /// Some, but not all, asset references are populated.
    #[error("asset references must be all set or all empty; missing: {}", missing.join(", "))]
    IncompleteRefs { missing: Vec<&'static str> },
}

impl ValidationError {
    /// The component field this error names, if any.
    pub fn field(&self) -> Option<ComponentKind> {
        match self {
            Self::MalformedId { field, .. } | Self::OutOfRange { field, .. } => Some(*field),
            Self::IncompleteRefs { .. } => None,
        }
    }

    /// Stable machine-readable kind used in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedId { .. } => "malformed_id",
            Self::OutOfRange { .. } => "out_of_range",
            Self::IncompleteRefs { .. } => "incomplete_refs",
        }
    }
}
