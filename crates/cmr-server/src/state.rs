use std::sync::Arc;

use crate::auth::{Action, AuthProvider, Credentials, Identity, TokenAuth};
use crate::error::{ServerError, ServerResult};
use crate::service::ResolverService;

/// Shared handler state: the resolver and the auth provider guarding it.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ResolverService>,
    pub auth: Arc<dyn AuthProvider>,
    pub debug_endpoints: bool,
}

impl AppState {
    pub fn new(service: ResolverService, auth: Arc<dyn AuthProvider>, debug_endpoints: bool) -> Self {
        Self {
            service: Arc::new(service),
            auth,
            debug_endpoints,
        }
    }

    /// State guarded by [`TokenAuth`].
    pub fn with_token_auth(service: ResolverService, admin_token: Option<String>, debug_endpoints: bool) -> Self {
        let auth = Arc::new(TokenAuth::new(admin_token, debug_endpoints));
        Self::new(service, auth, debug_endpoints)
    }

    /// Authenticate `credentials` and check they may perform `action`.
    ///
    /// Debug-only actions fail closed when debug endpoints are disabled.
    /// Anonymous callers that are denied get an authentication error, others
    /// an authorization error.
    pub async fn require(&self, credentials: &Credentials, action: Action) -> ServerResult<Identity> {
        if action.is_debug_only() && !self.debug_endpoints {
            return Err(ServerError::DebugDisabled { action: action.to_string() });
        }
        let identity = self.auth.authenticate(credentials).await?;
        if self.auth.authorize(&identity, action).await? {
            tracing::debug!(identity = %identity.name, %action, "authorized");
            return Ok(identity);
        }
        if identity.is_anonymous() {
            Err(ServerError::AuthFailed(format!("{action} requires a bearer token")))
        } else {
            Err(ServerError::AuthorizationDenied { action: action.to_string() })
        }
    }
}
