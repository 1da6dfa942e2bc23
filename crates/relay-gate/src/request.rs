use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use relay_types::ObjectId;
use serde::{Deserialize, Serialize};

/// What a write does to its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOperation {
    Put,
    Delete,
}

/// One path changed between two commits, with the new bytes inline so a
/// consumer never has to read the object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryChange {
    pub path: String,
    pub operation: WriteOperation,
    /// Blob previously at `path`, if it was a file.
    pub old_blob: Option<ObjectId>,
    /// Blob now at `path`; `None` for a delete.
    pub new_blob: Option<ObjectId>,
    /// Base64 of the new content; absent for a delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl EntryChange {
    pub fn put(
        path: impl Into<String>,
        old_blob: Option<ObjectId>,
        new_blob: ObjectId,
        bytes: &[u8],
    ) -> Self {
        Self {
            path: path.into(),
            operation: WriteOperation::Put,
            old_blob,
            new_blob: Some(new_blob),
            content: Some(STANDARD.encode(bytes)),
        }
    }

    pub fn delete(path: impl Into<String>, old_blob: Option<ObjectId>) -> Self {
        Self {
            path: path.into(),
            operation: WriteOperation::Delete,
            old_blob,
            new_blob: None,
            content: None,
        }
    }

    /// The new bytes, if the change carries them and they decode.
    pub fn decoded_content(&self) -> Option<Vec<u8>> {
        self.content.as_ref().and_then(|c| STANDARD.decode(c).ok())
    }
}

/// Everything a validator needs to re-derive the change: the two commits
/// bracket the diff, `repoDir` locates them on disk and `changes` carries
/// the touched entries inline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub repo: String,
    /// Repository directory; `None` for in-memory repositories.
    #[serde(default)]
    pub repo_dir: Option<PathBuf>,
    pub branch: String,
    /// `None` when the candidate is the first commit on the branch.
    pub old_commit: Option<ObjectId>,
    pub new_commit: ObjectId,
    pub path: String,
    pub operation: WriteOperation,
    #[serde(default)]
    pub changes: Vec<EntryChange>,
}

/// A validator's answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject { reason: String },
}

impl Verdict {
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Wire form of a verdict: `{"ok": bool, "reason"?: string}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerdictMessage {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<VerdictMessage> for Verdict {
    fn from(msg: VerdictMessage) -> Self {
        if msg.ok {
            Verdict::Accept
        } else {
            Verdict::reject(msg.reason.unwrap_or_else(|| "rejected by validator".into()))
        }
    }
}
