//! Query and document types shared by the engine and every index backend.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use relay_gate::EntryChange;
use relay_types::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Primary-key fields, in tie-break order. Always filterable and sortable.
pub const PRIMARY_KEY: [&str; 3] = ["repo", "branch", "path"];

/// Identity of an index document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub repo: String,
    pub branch: String,
    pub path: String,
}

impl DocumentKey {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            path: path.into(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "repo" => Some(&self.repo),
            "branch" => Some(&self.branch),
            "path" => Some(&self.path),
            _ => None,
        }
    }
}

/// A projected document: its key plus indexer-defined fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    #[serde(flatten)]
    pub key: DocumentKey,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl IndexDocument {
    pub fn new(key: DocumentKey, fields: Map<String, Value>) -> Self {
        Self { key, fields }
    }

    /// Field lookup that also answers the primary-key names.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.key.field(name) {
            Some(v) => Some(Value::String(v.to_string())),
            None => self.fields.get(name).cloned(),
        }
    }

    /// Flattened JSON form returned to clients.
    pub fn to_item(&self) -> Value {
        let mut item = self.fields.clone();
        item.insert("repo".into(), self.key.repo.clone().into());
        item.insert("branch".into(), self.key.branch.clone().into());
        item.insert("path".into(), self.key.path.clone().into());
        Value::Object(item)
    }
}

/// Filter operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
}

impl FilterOp {
    pub const ALL: [FilterOp; 8] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Contains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Contains => "contains",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `field op value` clause. A filter is the conjunction of its clauses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Evaluate against a field value (`None` when the document lacks it).
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        let same = |a: &Value, b: &Value| compare_values(Some(a), Some(b)) == Ordering::Equal;
        let ordered = |want: &[Ordering]| match actual {
            Some(a) if comparable(a, &self.value) => {
                want.contains(&compare_values(Some(a), Some(&self.value)))
            }
            _ => false,
        };
        match self.op {
            FilterOp::Eq => actual.is_some_and(|a| same(a, &self.value)),
            FilterOp::Ne => !actual.is_some_and(|a| same(a, &self.value)),
            FilterOp::Gt => ordered(&[Ordering::Greater]),
            FilterOp::Gte => ordered(&[Ordering::Greater, Ordering::Equal]),
            FilterOp::Lt => ordered(&[Ordering::Less]),
            FilterOp::Lte => ordered(&[Ordering::Less, Ordering::Equal]),
            FilterOp::In => match (actual, &self.value) {
                (Some(a), Value::Array(options)) => options.iter().any(|o| same(a, o)),
                _ => false,
            },
            FilterOp::Contains => match (actual, &self.value) {
                (Some(Value::String(s)), Value::String(needle)) => s.contains(needle.as_str()),
                (Some(Value::Array(items)), v) => items.iter().any(|i| same(i, v)),
                _ => false,
            },
        }
    }
}

/// A sort key; serialized as the field name, `-` prefixed when descending.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, descending) = match s.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if field.is_empty() {
            return Err(format!("empty sort field in {s:?}"));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(&self.field)
    }
}

impl Serialize for SortKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SortKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which repositories or branches a query covers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    All,
    One(String),
}

impl Selection {
    pub fn admits(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::One(n) => n == name,
        }
    }
}

/// The fields, operators and default order an indexer accepts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPolicy {
    pub allowed_fields: Vec<String>,
    pub allowed_ops: Vec<FilterOp>,
    #[serde(default)]
    pub default_sort: Vec<SortKey>,
}

impl QueryPolicy {
    pub fn allows_field(&self, field: &str) -> bool {
        PRIMARY_KEY.contains(&field) || self.allowed_fields.iter().any(|f| f == field)
    }

    pub fn allows_op(&self, op: FilterOp) -> bool {
        self.allowed_ops.contains(&op)
    }
}

/// A validated query, as handed to [`Indexer::execute`](crate::Indexer::execute).
///
/// `sort` always ends with the primary-key tie-break, so any backend that
/// honours it yields a total order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery {
    pub repo: Selection,
    pub branch: Selection,
    pub filter: Vec<Condition>,
    pub sort: Vec<SortKey>,
    pub offset: usize,
    pub limit: usize,
}

/// What an indexer returns: the full match count and one page of items.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryHits {
    pub total: u64,
    pub items: Vec<Value>,
}

/// Sent to the indexer after a branch head moves. `changes` carries the
/// touched entries inline so an out-of-process indexer can work without
/// opening `repoDir`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNotice {
    pub repo: String,
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
    pub branch: String,
    pub commit: ObjectId,
    pub parent: Option<ObjectId>,
    #[serde(default)]
    pub changes: Vec<EntryChange>,
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_))
    )
}

/// Total order over optional JSON values: missing sorts first, then by type
/// (null, bool, number, string, array, object), then by value.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        _ if rank(a) == rank(b) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_key_parse_and_display() {
        let key: SortKey = "-year".parse().unwrap();
        assert_eq!(key, SortKey::desc("year"));
        assert_eq!(key.to_string(), "-year");
        assert!("-".parse::<SortKey>().is_err());
        assert_eq!(serde_json::to_value(SortKey::asc("title")).unwrap(), json!("title"));
    }

    #[test]
    fn conditions() {
        let year = json!(1999);
        assert!(Condition::new("year", FilterOp::Gte, json!(1999)).matches(Some(&year)));
        assert!(Condition::new("year", FilterOp::Lt, json!(2000.5)).matches(Some(&year)));
        assert!(!Condition::new("year", FilterOp::Gt, json!("1998")).matches(Some(&year)));
        assert!(Condition::new("year", FilterOp::In, json!([1, 1999])).matches(Some(&year)));
        assert!(Condition::new("year", FilterOp::Ne, json!(1)).matches(None));
        assert!(!Condition::new("year", FilterOp::Eq, json!(1999)).matches(None));

        let tags = json!(["sci-fi", "heist"]);
        assert!(Condition::new("tags", FilterOp::Contains, json!("heist")).matches(Some(&tags)));
        let title = json!("Inception");
        assert!(Condition::new("title", FilterOp::Contains, json!("cep")).matches(Some(&title)));
    }

    #[test]
    fn value_order_is_total() {
        let a = json!(2);
        let b = json!(10);
        let s = json!("a");
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&a)), Ordering::Less);
        assert_eq!(compare_values(Some(&b), Some(&s)), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(1)), Some(&json!(1.0))), Ordering::Equal);
    }

    #[test]
    fn document_item_carries_key() {
        let mut fields = Map::new();
        fields.insert("title".into(), json!("Inception"));
        let doc = IndexDocument::new(DocumentKey::new("films", "main", "/a.md"), fields);
        assert_eq!(
            doc.to_item(),
            json!({"title": "Inception", "repo": "films", "branch": "main", "path": "/a.md"})
        );
        assert_eq!(doc.get("branch"), Some(json!("main")));
    }

    #[test]
    fn policy_always_allows_primary_key() {
        let policy = QueryPolicy {
            allowed_fields: vec!["title".into()],
            allowed_ops: vec![FilterOp::Eq],
            default_sort: vec![],
        };
        assert!(policy.allows_field("path"));
        assert!(policy.allows_field("title"));
        assert!(!policy.allows_field("secret"));
        assert!(!policy.allows_op(FilterOp::Contains));
    }
}
