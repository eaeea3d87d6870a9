use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cmr_types::{ComponentTuple, RecordId, ValidationError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid component tuple: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("no record for {0}")]
    NotFound(ComponentTuple),

    #[error("record for {tuple} already exists: {existing}")]
    Duplicate { tuple: ComponentTuple, existing: RecordId },

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("authorization denied: {action}")]
    AuthorizationDenied { action: String },

    #[error("debug endpoints are disabled: {action}")]
    DebugDisabled { action: String },

    #[error("store error: {0}")]
    Store(#[from] cmr_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            Self::AuthorizationDenied { .. } | Self::DebugDisabled { .. } => StatusCode::FORBIDDEN,
            Self::Store(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind for error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.kind(),
            Self::InvalidBody(_) => "invalid_body",
            Self::NotFound(_) => "not_found",
            Self::Duplicate { .. } => "duplicate",
            Self::AuthFailed(_) => "unauthorized",
            Self::AuthorizationDenied { .. } | Self::DebugDisabled { .. } => "forbidden",
            Self::Store(_) => "persistence_failure",
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let mut body = json!({
            "success": false,
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Self::Validation(e) = &self {
            if let Some(field) = e.field() {
                body["field"] = json!(field.as_str());
            }
        }
        (status, Json(body)).into_response()
    }
}
