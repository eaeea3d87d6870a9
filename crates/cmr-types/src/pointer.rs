use serde::{Deserialize, Serialize};

use crate::record::ComponentRecord;

/// The public read payload: only the metadata pointer of a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUri {
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
}

impl TokenUri {
    pub fn new(token_uri: impl Into<String>) -> Self {
        Self { token_uri: token_uri.into() }
    }
}

impl From<&ComponentRecord> for TokenUri {
    fn from(record: &ComponentRecord) -> Self {
        Self::new(record.metadata_ref())
    }
}
