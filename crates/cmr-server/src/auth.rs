use async_trait::async_trait;
use axum::http::{header, HeaderMap};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn anonymous() -> Self { Self { name: "anonymous".into(), is_admin: false } }
    pub fn user(name: impl Into<String>) -> Self { Self { name: name.into(), is_admin: false } }
    pub fn admin(name: impl Into<String>) -> Self { Self { name: name.into(), is_admin: true } }

    pub fn is_anonymous(&self) -> bool {
        !self.is_admin && self.name == "anonymous"
    }
}

#[derive(Clone, Debug)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read `Authorization: Bearer <token>`. Anything else is anonymous.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
            .map_or(Self::Anonymous, |token| Self::Bearer(token.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Resolve,
    Register,
    ListAll,
    ClearAll,
}

impl Action {
    /// Actions that enumerate or wipe the whole collection.
    pub fn is_debug_only(&self) -> bool {
        matches!(self, Self::ListAll | Self::ClearAll)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Register => write!(f, "register"),
            Self::ListAll => write!(f, "list-all"),
            Self::ClearAll => write!(f, "clear-all"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: Action) -> ServerResult<bool>;
}

/// Shared-secret bearer token guarding the write and admin paths.
///
/// - Resolve is always public.
/// - Register needs the admin token. With no token configured it is open only
///   in debug mode.
/// - List-all and clear-all need debug mode, plus the admin token when one is
///   configured.
pub struct TokenAuth {
    admin_token: Option<String>,
    debug_endpoints: bool,
}

impl TokenAuth {
    pub fn new(admin_token: Option<String>, debug_endpoints: bool) -> Self {
        Self {
            admin_token: admin_token.filter(|t| !t.is_empty()),
            debug_endpoints,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match (credentials, &self.admin_token) {
            (Credentials::Bearer(token), Some(expected)) => {
                if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
                    Ok(Identity::admin("admin"))
                } else {
                    Err(ServerError::AuthFailed("invalid bearer token".into()))
                }
            }
            (Credentials::Bearer(token), None) => {
                Ok(Identity::user(format!("bearer:{}", token.chars().take(8).collect::<String>())))
            }
            (Credentials::Anonymous, _) => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, identity: &Identity, action: Action) -> ServerResult<bool> {
        let open_debug = self.debug_endpoints && self.admin_token.is_none();
        Ok(match action {
            Action::Resolve => true,
            Action::Register => identity.is_admin || open_debug,
            Action::ListAll | Action::ClearAll => {
                self.debug_endpoints && (identity.is_admin || self.admin_token.is_none())
            }
        })
    }
}

/// Authorizes every action. For tests and local tooling only.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) => Ok(Identity::user(format!("bearer:{}", token.chars().take(8).collect::<String>()))),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, _identity: &Identity, _action: Action) -> ServerResult<bool> {
        Ok(true)
    }
}
