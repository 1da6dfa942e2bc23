use std::sync::Arc;

use relay_repo::{Engine, RepoRegistry};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Relay HTTP server.
pub struct RelayServer {
    config: ServerConfig,
    engine: Arc<Engine>,
}

impl RelayServer {
    /// Discover repositories under `repos_root` and wire the validator and
    /// indexer named in the config.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let registry = RepoRegistry::scan(&config.repos_root, &config.default_repo)?;
        if registry.is_empty() {
            tracing::warn!(root = %config.repos_root.display(), "no repositories found");
        }
        let engine = Engine::new(
            Arc::new(registry),
            config.engine_config(),
            config.gate(),
            config.indexer(),
        );
        Ok(Self::with_engine(config, Arc::new(engine)))
    }

    pub fn with_engine(config: ServerConfig, engine: Arc<Engine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.engine)))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            repos = ?self.engine.registry().names(),
            "relay server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_repo::Repository;

    #[test]
    fn scans_repos_root() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init("films", &dir.path().join("films"), "main").unwrap();
        let config = ServerConfig {
            repos_root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        let server = RelayServer::new(config).unwrap();
        assert_eq!(server.engine().registry().names(), ["films"]);
        let _router = server.router();
    }

    #[test]
    fn root_repository_takes_default_name() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init("ignored", dir.path(), "main").unwrap();
        let server = RelayServer::new(ServerConfig {
            repos_root: dir.path().to_path_buf(),
            ..ServerConfig::default()
        })
        .unwrap();
        assert!(server.engine().registry().contains("default"));
    }
}
