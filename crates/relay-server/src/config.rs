use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use relay_gate::{CommandSpec, CommandValidator, GateConfig, WriteGate};
use relay_index::{CommandIndexer, Indexer, MemoryIndex, QueryLimits};
use relay_refs::DEFAULT_BRANCH;
use relay_repo::{EngineConfig, WritePolicy};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, usually read from a TOML file. Every field is optional
/// in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the repositories (or itself a repository).
    pub repos_root: PathBuf,
    pub default_repo: String,
    pub default_branch: String,
    pub auto_create_branches: bool,
    pub validator_timeout_ms: u64,
    pub indexer_timeout_ms: u64,
    /// Without a validator every write is accepted.
    pub validator: Option<CommandSpec>,
    /// Without an indexer an empty in-process index answers queries.
    pub indexer: Option<CommandSpec>,
    pub query: QueryLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7070)),
            repos_root: PathBuf::from("."),
            default_repo: "default".into(),
            default_branch: DEFAULT_BRANCH.into(),
            auto_create_branches: true,
            validator_timeout_ms: 10_000,
            indexer_timeout_ms: 10_000,
            validator: None,
            indexer: None,
            query: QueryLimits::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_repo: self.default_repo.clone(),
            default_branch: self.default_branch.clone(),
            write: WritePolicy {
                auto_create_branches: self.auto_create_branches,
                indexer_timeout: self.indexer_timeout(),
            },
            query: self.query,
            indexer_timeout: self.indexer_timeout(),
        }
    }

    pub fn indexer_timeout(&self) -> Duration {
        Duration::from_millis(self.indexer_timeout_ms)
    }

    pub fn gate(&self) -> WriteGate {
        match &self.validator {
            Some(spec) => WriteGate::new(
                Arc::new(CommandValidator::new(spec.clone())),
                GateConfig::with_timeout(Duration::from_millis(self.validator_timeout_ms)),
            ),
            None => WriteGate::permissive(),
        }
    }

    pub fn indexer(&self) -> Arc<dyn Indexer> {
        match &self.indexer {
            Some(spec) => Arc::new(CommandIndexer::new(spec.clone(), self.indexer_timeout())),
            None => Arc::new(MemoryIndex::default()),
        }
    }
}
