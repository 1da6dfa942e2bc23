use relay_types::ObjectId;
use serde::{Deserialize, Serialize};

/// Branch used when a request names none and no default is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// A branch and the commit it currently points at.
///
/// `head` is `None` for an unborn branch (one that exists but has no
/// commits yet).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    pub name: String,
    pub head: Option<ObjectId>,
}

impl BranchHead {
    pub fn new(name: impl Into<String>, head: Option<ObjectId>) -> Self {
        Self {
            name: name.into(),
            head,
        }
    }

    pub fn is_unborn(&self) -> bool {
        self.head.is_none()
    }
}
