//! The indexer boundary.

use std::time::Duration;

use async_trait::async_trait;
use relay_gate::{bounded, exchange, CommandSpec};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::IndexResult;
use crate::model::{CommitNotice, IndexQuery, QueryHits, QueryPolicy};

/// Maintains the secondary index and answers queries against it.
///
/// The core never ranks or matches documents itself: it validates a query
/// against [`Indexer::query_policy`] and hands the result to
/// [`Indexer::execute`].
#[async_trait]
pub trait Indexer: Send + Sync {
    fn name(&self) -> &str;

    /// A branch head moved to `notice.commit`. Best effort: the commit stands
    /// whether or not this succeeds.
    async fn notify(&self, notice: &CommitNotice) -> IndexResult<()>;

    async fn query_policy(&self) -> IndexResult<QueryPolicy>;

    async fn execute(&self, query: &IndexQuery) -> IndexResult<QueryHits>;
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Request<'a> {
    Notify(&'a CommitNotice),
    Policy,
    Execute(&'a IndexQuery),
}

#[derive(serde::Deserialize)]
struct Ack {}

/// Talks to an indexer program over stdio, one child per call.
///
/// Every request is a JSON object tagged with `op` (`notify`, `policy`,
/// `execute`). The policy is fetched once and cached.
#[derive(Debug)]
pub struct CommandIndexer {
    spec: CommandSpec,
    timeout: Duration,
    policy: OnceCell<QueryPolicy>,
}

impl CommandIndexer {
    pub fn new(spec: CommandSpec, timeout: Duration) -> Self {
        Self {
            spec,
            timeout,
            policy: OnceCell::new(),
        }
    }
}

#[async_trait]
impl Indexer for CommandIndexer {
    fn name(&self) -> &str {
        &self.spec.program
    }

    async fn notify(&self, notice: &CommitNotice) -> IndexResult<()> {
        let _: Ack = bounded(
            "indexer",
            self.timeout,
            exchange("indexer", &self.spec, &Request::Notify(notice)),
        )
        .await?;
        Ok(())
    }

    async fn query_policy(&self) -> IndexResult<QueryPolicy> {
        let policy = self
            .policy
            .get_or_try_init(|| {
                bounded(
                    "indexer",
                    self.timeout,
                    exchange("indexer", &self.spec, &Request::Policy),
                )
            })
            .await?;
        Ok(policy.clone())
    }

    async fn execute(&self, query: &IndexQuery) -> IndexResult<QueryHits> {
        Ok(bounded(
            "indexer",
            self.timeout,
            exchange("indexer", &self.spec, &Request::Execute(query)),
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilterOp, Selection, SortKey};
    use relay_gate::EntryChange;
    use relay_types::ObjectId;

    fn indexer(script: &str) -> CommandIndexer {
        CommandIndexer::new(
            CommandSpec::new("sh").arg("-c").arg(script),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn policy_is_read_from_child() {
        let idx = indexer(
            r#"cat >/dev/null; echo '{"allowedFields":["title"],"allowedOps":["eq","in"],"defaultSort":["-title"]}'"#,
        );
        let policy = idx.query_policy().await.unwrap();
        assert_eq!(policy.allowed_fields, ["title"]);
        assert_eq!(policy.allowed_ops, [FilterOp::Eq, FilterOp::In]);
        assert_eq!(policy.default_sort, [SortKey::desc("title")]);
    }

    #[tokio::test]
    async fn execute_and_notify_round_trip() {
        let idx = indexer(
            r#"req=$(cat); case "$req" in *'"op":"execute"'*) echo '{"total":1,"items":[{"title":"x"}]}';; *) echo '{}';; esac"#,
        );
        let hits = idx
            .execute(&IndexQuery {
                repo: Selection::All,
                branch: Selection::One("main".into()),
                filter: vec![],
                sort: vec![SortKey::asc("path")],
                offset: 0,
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(hits.total, 1);

        idx.notify(&CommitNotice {
            repo: "default".into(),
            repo_dir: None,
            branch: "main".into(),
            commit: ObjectId::from_bytes(b"c1"),
            parent: None,
            changes: Vec::new(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn notify_carries_location_and_content() {
        // Answers with garbage unless the new bytes ("title: x", base64) arrive inline.
        let idx = indexer(
            r#"req=$(cat); case "$req" in *'"repoDir":"/srv/films"'*'dGl0bGU6IHg='*) echo '{}';; *) echo 'blind';; esac"#,
        );
        let mut notice = CommitNotice {
            repo: "films".into(),
            repo_dir: Some("/srv/films".into()),
            branch: "main".into(),
            commit: ObjectId::from_bytes(b"c2"),
            parent: Some(ObjectId::from_bytes(b"c1")),
            changes: vec![EntryChange::put(
                "/inception.md",
                None,
                ObjectId::from_bytes(b"title: x"),
                b"title: x",
            )],
        };
        idx.notify(&notice).await.unwrap();

        notice.changes.clear();
        assert!(idx.notify(&notice).await.is_err());
    }

    #[tokio::test]
    async fn hung_indexer_times_out() {
        let idx = CommandIndexer::new(
            CommandSpec::new("sh").arg("-c").arg("sleep 5"),
            Duration::from_millis(50),
        );
        assert!(idx.query_policy().await.unwrap_err().is_timeout());
    }
}
