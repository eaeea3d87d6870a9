/// Errors from record store operations.
///
/// Every variant is a persistence failure from the caller's point of view.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached. Nothing was applied.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted record could not be decoded.
    #[error("corrupt record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// The connection string is not understood.
    #[error("invalid store URI: {0}")]
    InvalidUri(String),
}

impl StoreError {
    /// `true` if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(StoreError::Io(std::io::Error::other("disk")).is_transient());
        assert!(!StoreError::InvalidUri("ftp://x".into()).is_transient());
        assert!(!StoreError::Corrupt { line: 3, reason: "bad".into() }.is_transient());
    }
}
