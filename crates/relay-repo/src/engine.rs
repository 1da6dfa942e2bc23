//! [`Engine`]: the one entry point the HTTP layer and the CLI talk to.

use std::sync::Arc;
use std::time::Duration;

use relay_gate::WriteGate;
use relay_index::{Indexer, QueryEngine, QueryEnvelope, QueryLimits, QueryRequest, QueryScope, Selection};
use relay_refs::{validate_branch_name, DEFAULT_BRANCH};
use relay_types::RepoPath;

use crate::discovery::{all_heads, discover, Discovery, HeadRecord};
use crate::error::{EngineError, EngineResult};
use crate::read::{read_path, ReadOutcome};
use crate::registry::RepoRegistry;
use crate::resolver::{Defaults, Selectors, Target};
use crate::write::{Change, WritePolicy, WriteReceipt, Writer};

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub default_repo: String,
    pub default_branch: String,
    pub write: WritePolicy,
    pub query: QueryLimits,
    pub indexer_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_repo: "default".into(),
            default_branch: DEFAULT_BRANCH.into(),
            write: WritePolicy::default(),
            query: QueryLimits::default(),
            indexer_timeout: Duration::from_secs(10),
        }
    }
}

pub struct Engine {
    registry: Arc<RepoRegistry>,
    defaults: Defaults,
    writer: Writer,
    query: QueryEngine,
}

impl Engine {
    pub fn new(
        registry: Arc<RepoRegistry>,
        config: EngineConfig,
        gate: WriteGate,
        indexer: Arc<dyn Indexer>,
    ) -> Self {
        let mut write = config.write;
        write.indexer_timeout = config.indexer_timeout;
        Self {
            registry,
            defaults: Defaults {
                repo: config.default_repo,
                branch: config.default_branch,
            },
            writer: Writer::new(gate, Arc::clone(&indexer), write),
            query: QueryEngine::new(indexer, config.query, config.indexer_timeout),
        }
    }

    pub fn registry(&self) -> &Arc<RepoRegistry> {
        &self.registry
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Resolve selectors to a single `(repo, branch)`.
    pub fn target(&self, selectors: &Selectors) -> EngineResult<Target> {
        let target = self
            .defaults
            .target(selectors)
            .map_err(EngineError::InvalidBranch)?;
        tracing::debug!(repo = %target.repo, branch = %target.branch, "resolved target");
        Ok(target)
    }

    pub fn read(&self, selectors: &Selectors, path: &RepoPath) -> EngineResult<ReadOutcome> {
        let target = self.target(selectors)?;
        let repo = self.registry.get(&target.repo)?;
        read_path(&repo, &target.branch, path)
    }

    pub async fn put(
        &self,
        selectors: &Selectors,
        path: &RepoPath,
        bytes: Vec<u8>,
    ) -> EngineResult<WriteReceipt> {
        self.write(selectors, path, Change::Put(bytes)).await
    }

    pub async fn delete(&self, selectors: &Selectors, path: &RepoPath) -> EngineResult<WriteReceipt> {
        self.write(selectors, path, Change::Delete).await
    }

    async fn write(
        &self,
        selectors: &Selectors,
        path: &RepoPath,
        change: Change,
    ) -> EngineResult<WriteReceipt> {
        let target = self.target(selectors)?;
        let repo = self.registry.get(&target.repo)?;
        self.writer
            .submit(repo, target.branch, path.clone(), change)
            .await
    }

    /// Scope for a query: `all` widens repo or branch, absent selectors fall
    /// back to the defaults.
    pub fn query_scope(&self, selectors: &Selectors) -> EngineResult<QueryScope> {
        let repo = if selectors.wants_all_repos() {
            Selection::All
        } else {
            let name = selectors.repo.as_ref().unwrap_or(&self.defaults.repo);
            self.registry.get(name)?;
            Selection::One(name.clone())
        };
        let branch = if selectors.wants_all_branches() {
            Selection::All
        } else {
            let name = selectors.branch.as_ref().unwrap_or(&self.defaults.branch);
            validate_branch_name(name).map_err(|e| EngineError::InvalidBranch(e.to_string()))?;
            Selection::One(name.clone())
        };
        Ok(QueryScope { repo, branch })
    }

    pub async fn query(
        &self,
        selectors: &Selectors,
        request: &QueryRequest,
    ) -> EngineResult<QueryEnvelope> {
        let scope = self.query_scope(selectors)?;
        Ok(self.query.run(scope, request).await?)
    }

    pub fn discover(&self, selectors: &Selectors) -> EngineResult<Discovery> {
        let selected = Target {
            repo: selectors
                .repo
                .clone()
                .filter(|_| !selectors.wants_all_repos())
                .unwrap_or_else(|| self.defaults.repo.clone()),
            branch: selectors
                .branch
                .clone()
                .filter(|_| !selectors.wants_all_branches())
                .unwrap_or_else(|| self.defaults.branch.clone()),
        };
        discover(&self.registry, selectors, selected)
    }

    pub fn heads(&self) -> EngineResult<Vec<HeadRecord>> {
        all_heads(&self.registry)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("repos", &self.registry.names())
            .field("defaults", &self.defaults)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}
