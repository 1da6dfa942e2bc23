//! In-process index backend.
//!
//! Documents are loaded directly with [`MemoryIndex::upsert`]; commit
//! notices are recorded so embedders and tests can see what the write path
//! reported.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{IndexError, IndexResult};
use crate::indexer::Indexer;
use crate::model::{
    compare_values, CommitNotice, DocumentKey, FilterOp, IndexDocument, IndexQuery, QueryHits,
    QueryPolicy, SortKey,
};

#[derive(Debug)]
pub struct MemoryIndex {
    policy: QueryPolicy,
    documents: RwLock<BTreeMap<DocumentKey, IndexDocument>>,
    notices: RwLock<Vec<CommitNotice>>,
}

impl MemoryIndex {
    pub fn new(policy: QueryPolicy) -> Self {
        Self {
            policy,
            documents: RwLock::new(BTreeMap::new()),
            notices: RwLock::new(Vec::new()),
        }
    }

    /// Allows every operator on the given fields, sorted by primary key.
    pub fn permissive(fields: &[&str]) -> Self {
        Self::new(QueryPolicy {
            allowed_fields: fields.iter().map(|f| f.to_string()).collect(),
            allowed_ops: FilterOp::ALL.to_vec(),
            default_sort: Vec::new(),
        })
    }

    pub fn upsert(&self, document: IndexDocument) {
        self.documents
            .write()
            .expect("lock poisoned")
            .insert(document.key.clone(), document);
    }

    pub fn remove(&self, key: &DocumentKey) -> Option<IndexDocument> {
        self.documents.write().expect("lock poisoned").remove(key)
    }

    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Commit notices received so far, oldest first.
    pub fn notices(&self) -> Vec<CommitNotice> {
        self.notices.read().expect("lock poisoned").clone()
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new(QueryPolicy::default())
    }
}

fn compare_docs(a: &IndexDocument, b: &IndexDocument, sort: &[SortKey]) -> Ordering {
    for key in sort {
        let ord = compare_values(a.get(&key.field).as_ref(), b.get(&key.field).as_ref());
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.key.cmp(&b.key)
}

#[async_trait]
impl Indexer for MemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn notify(&self, notice: &CommitNotice) -> IndexResult<()> {
        self.notices
            .write()
            .map_err(|_| IndexError::Backend("lock poisoned".into()))?
            .push(notice.clone());
        Ok(())
    }

    async fn query_policy(&self) -> IndexResult<QueryPolicy> {
        Ok(self.policy.clone())
    }

    async fn execute(&self, query: &IndexQuery) -> IndexResult<QueryHits> {
        let documents = self
            .documents
            .read()
            .map_err(|_| IndexError::Backend("lock poisoned".into()))?;
        let mut matched: Vec<&IndexDocument> = documents
            .values()
            .filter(|d| query.repo.admits(&d.key.repo) && query.branch.admits(&d.key.branch))
            .filter(|d| {
                query
                    .filter
                    .iter()
                    .all(|c| c.matches(d.get(&c.field).as_ref()))
            })
            .collect();
        matched.sort_by(|a, b| compare_docs(a, b, &query.sort));

        Ok(QueryHits {
            total: matched.len() as u64,
            items: matched
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .map(IndexDocument::to_item)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Condition, Selection};
    use relay_types::ObjectId;
    use serde_json::{json, Map, Value};

    fn doc(repo: &str, branch: &str, path: &str, fields: Value) -> IndexDocument {
        let fields: Map<String, Value> = match fields {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        IndexDocument::new(DocumentKey::new(repo, branch, path), fields)
    }

    fn query(filter: Vec<Condition>, sort: Vec<SortKey>) -> IndexQuery {
        IndexQuery {
            repo: Selection::All,
            branch: Selection::All,
            filter,
            sort,
            offset: 0,
            limit: 100,
        }
    }

    fn paths(hits: &QueryHits) -> Vec<String> {
        hits.items
            .iter()
            .map(|i| i["path"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn filters_by_scope_and_condition() {
        let idx = MemoryIndex::permissive(&["year"]);
        idx.upsert(doc("films", "main", "/a.md", json!({"year": 2010})));
        idx.upsert(doc("films", "draft", "/b.md", json!({"year": 2014})));
        idx.upsert(doc("books", "main", "/c.md", json!({"year": 1999})));

        let mut q = query(vec![Condition::new("year", FilterOp::Gt, json!(2000))], vec![]);
        assert_eq!(idx.execute(&q).await.unwrap().total, 2);

        q.branch = Selection::One("main".into());
        assert_eq!(paths(&idx.execute(&q).await.unwrap()), ["/a.md"]);

        q.filter.clear();
        q.repo = Selection::One("books".into());
        assert_eq!(paths(&idx.execute(&q).await.unwrap()), ["/c.md"]);
    }

    #[tokio::test]
    async fn sorts_then_falls_back_to_key() {
        let idx = MemoryIndex::permissive(&["year"]);
        idx.upsert(doc("r", "main", "/c.md", json!({"year": 2000})));
        idx.upsert(doc("r", "main", "/a.md", json!({"year": 2000})));
        idx.upsert(doc("r", "main", "/b.md", json!({"year": 2020})));

        let hits = idx
            .execute(&query(vec![], vec![SortKey::desc("year")]))
            .await
            .unwrap();
        assert_eq!(paths(&hits), ["/b.md", "/a.md", "/c.md"]);
    }

    #[tokio::test]
    async fn offset_and_limit_page_through() {
        let idx = MemoryIndex::permissive(&[]);
        for i in 0..5 {
            idx.upsert(doc("r", "main", &format!("/{i}.md"), json!({})));
        }
        let mut q = query(vec![], vec![SortKey::asc("path")]);
        q.offset = 3;
        q.limit = 10;
        let hits = idx.execute(&q).await.unwrap();
        assert_eq!(hits.total, 5);
        assert_eq!(paths(&hits), ["/3.md", "/4.md"]);
    }

    #[tokio::test]
    async fn records_notices() {
        let idx = MemoryIndex::default();
        let notice = CommitNotice {
            repo: "r".into(),
            repo_dir: None,
            branch: "main".into(),
            commit: ObjectId::from_bytes(b"c1"),
            parent: None,
            changes: Vec::new(),
        };
        idx.notify(&notice).await.unwrap();
        assert_eq!(idx.notices(), [notice]);
        assert!(idx.is_empty());
    }
}
