use std::sync::Arc;

use cmr_store::{open_store, RecordStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::service::ResolverService;
use crate::state::AppState;

/// Component metadata resolver server.
pub struct CmrServer {
    config: ServerConfig,
    state: AppState,
}

impl CmrServer {
    /// Connect to the configured store and assemble the service.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = open_store(&config.store_uri, config.sync_mode())?;
        Ok(Self::with_store(config, store))
    }

    /// Assemble the service over an already connected store.
    pub fn with_store(config: ServerConfig, store: Arc<dyn RecordStore>) -> Self {
        let service = ResolverService::new(store)
            .with_validator(config.validator())
            .with_retry(config.retry_policy())
            .with_register_policy(config.register_policy());
        let state = AppState::with_token_auth(service, config.admin_token.clone(), config.debug_endpoints);
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        if self.config.debug_endpoints {
            tracing::warn!("debug endpoints enabled: /all-cars and /delete-all are reachable");
        }
        if self.config.admin_token.is_none() {
            tracing::warn!("no admin token configured: registration is closed unless debug endpoints are enabled");
        }

        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            store = %self.config.store_uri,
            max_supply = self.config.max_component_supply,
            "cmr server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = CmrServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr, "127.0.0.1:3000".parse::<std::net::SocketAddr>().unwrap());
        assert!(!server.state().debug_endpoints);
    }

    #[test]
    fn bad_store_uri_fails_fast() {
        let config = ServerConfig {
            store_uri: "mongodb://localhost/cars".into(),
            ..ServerConfig::default()
        };
        assert!(matches!(CmrServer::new(config), Err(ServerError::Store(_))));
    }

    #[test]
    fn config_flows_into_service() {
        let config = ServerConfig {
            max_component_supply: 42,
            ..ServerConfig::default()
        };
        let server = CmrServer::new(config).unwrap();
        assert_eq!(server.state().service.validator().max_supply(), 42);
        let _router = server.router();
    }
}
