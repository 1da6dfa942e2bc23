//! The query engine: request validation, allow-list enforcement, pagination
//! bounds and the response envelope. Matching and ordering belong to the
//! indexer.

use std::sync::Arc;
use std::time::Duration;

use relay_gate::bounded;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IndexError, QueryError, QueryResult};
use crate::indexer::Indexer;
use crate::model::{Condition, FilterOp, IndexQuery, QueryPolicy, Selection, SortKey, PRIMARY_KEY};

/// Pagination bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub max_page: u64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: 25,
            max_page_size: 100,
            max_page: 10_000,
        }
    }
}

/// A query as sent by a client. Fields stay loosely typed until
/// [`QueryEngine::run`] validates them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub sort: Option<Value>,
    #[serde(default)]
    pub page: Option<Value>,
    #[serde(default)]
    pub page_size: Option<Value>,
}

/// The response envelope, identical whichever backend answered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEnvelope {
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<Value>,
}

/// Which repositories and branches a query covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryScope {
    pub repo: Selection,
    pub branch: Selection,
}

pub struct QueryEngine {
    indexer: Arc<dyn Indexer>,
    limits: QueryLimits,
    timeout: Duration,
}

impl QueryEngine {
    pub fn new(indexer: Arc<dyn Indexer>, limits: QueryLimits, timeout: Duration) -> Self {
        Self {
            indexer,
            limits,
            timeout,
        }
    }

    pub fn indexer(&self) -> &Arc<dyn Indexer> {
        &self.indexer
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub async fn run(&self, scope: QueryScope, request: &QueryRequest) -> QueryResult<QueryEnvelope> {
        let page = parse_count("page", request.page.as_ref())?
            .unwrap_or(0)
            .min(self.limits.max_page);
        let page_size = parse_count("pageSize", request.page_size.as_ref())?
            .unwrap_or(self.limits.default_page_size)
            .clamp(1, self.limits.max_page_size.max(1));
        let filter = parse_filter(request.filter.as_ref())?;
        let sort = parse_sort(request.sort.as_ref())?;

        let policy = self.call(self.indexer.query_policy()).await?;
        enforce(&policy, &filter, &sort)?;
        let sort = with_tie_break(if sort.is_empty() {
            policy.default_sort.clone()
        } else {
            sort
        });

        let query = IndexQuery {
            repo: scope.repo,
            branch: scope.branch,
            filter,
            sort,
            offset: (page * page_size) as usize,
            limit: page_size as usize,
        };
        tracing::debug!(indexer = self.indexer.name(), ?query, "executing query");
        let hits = self.call(self.indexer.execute(&query)).await?;

        Ok(QueryEnvelope {
            total: hits.total,
            page,
            page_size,
            items: hits.items,
        })
    }

    async fn call<T, F>(&self, fut: F) -> QueryResult<T>
    where
        F: std::future::Future<Output = Result<T, IndexError>>,
    {
        let result = bounded(self.indexer.name(), self.timeout, async {
            Ok::<_, relay_gate::GateError>(fut.await)
        })
        .await
        .map_err(IndexError::from)?;
        Ok(result?)
    }
}

/// Accepts JSON integers and integer strings; `None` when absent or null.
fn parse_count(name: &str, raw: Option<&Value>) -> QueryResult<Option<u64>> {
    let invalid = || QueryError::InvalidPagination(format!("{name} must be a non-negative integer"));
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<u64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn parse_filter(raw: Option<&Value>) -> QueryResult<Vec<Condition>> {
    let map = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(QueryError::Malformed("filter must be an object".into())),
    };
    let mut out = Vec::new();
    for (field, spec) in map {
        match spec {
            Value::Object(ops) => {
                if ops.is_empty() {
                    return Err(QueryError::Malformed(format!(
                        "filter on {field:?} has no operators"
                    )));
                }
                for (op, value) in ops {
                    let op = FilterOp::parse(op).ok_or_else(|| {
                        QueryError::PolicyViolation(format!("unknown operator {op:?}"))
                    })?;
                    if op == FilterOp::In && !value.is_array() {
                        return Err(QueryError::Malformed(format!(
                            "operator 'in' on {field:?} needs an array"
                        )));
                    }
                    out.push(Condition::new(field.clone(), op, value.clone()));
                }
            }
            scalar => out.push(Condition::new(field.clone(), FilterOp::Eq, scalar.clone())),
        }
    }
    Ok(out)
}

fn parse_sort(raw: Option<&Value>) -> QueryResult<Vec<SortKey>> {
    let parse = |s: &str| s.parse::<SortKey>().map_err(QueryError::Malformed);
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![parse(s)?]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => parse(s),
                _ => Err(QueryError::Malformed("sort entries must be strings".into())),
            })
            .collect(),
        Some(_) => Err(QueryError::Malformed(
            "sort must be a field name or a list of field names".into(),
        )),
    }
}

fn enforce(policy: &QueryPolicy, filter: &[Condition], sort: &[SortKey]) -> QueryResult<()> {
    for condition in filter {
        if !policy.allows_field(&condition.field) {
            return Err(QueryError::PolicyViolation(format!(
                "field {:?} is not filterable",
                condition.field
            )));
        }
        if !policy.allows_op(condition.op) {
            return Err(QueryError::PolicyViolation(format!(
                "operator {:?} is not allowed",
                condition.op.as_str()
            )));
        }
    }
    if let Some(key) = sort.iter().find(|k| !policy.allows_field(&k.field)) {
        return Err(QueryError::PolicyViolation(format!(
            "field {:?} is not sortable",
            key.field
        )));
    }
    Ok(())
}

/// Append the primary key (ascending) so every ordering is total.
fn with_tie_break(mut sort: Vec<SortKey>) -> Vec<SortKey> {
    for field in PRIMARY_KEY {
        if !sort.iter().any(|k| k.field == field) {
            sort.push(SortKey::asc(field));
        }
    }
    sort
}
