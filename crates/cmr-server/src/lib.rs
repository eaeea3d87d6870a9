//! HTTP resolver for component metadata records.
//!
//! Serves the public token URI lookup for a `(wheel, engine, build,
//! wrapping)` composite key, plus a bearer-token guarded registration path
//! and debug-only collection endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod retry;
pub mod router;
pub mod server;
pub mod service;
pub mod state;

pub use auth::{Action, AllowAllAuth, AuthProvider, Credentials, Identity, TokenAuth};
pub use config::{RetryConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use retry::RetryPolicy;
pub use server::CmrServer;
pub use service::{RegisterPolicy, ResolverService};
pub use state::AppState;
