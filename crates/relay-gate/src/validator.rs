//! The validator boundary.

use async_trait::async_trait;

use crate::config::CommandSpec;
use crate::error::GateResult;
use crate::process::exchange;
use crate::request::{ValidationRequest, Verdict, VerdictMessage};

/// Approves or rejects a candidate commit before it becomes reachable.
///
/// Implementations must not assume the candidate will be committed: an
/// accepted candidate can still lose the branch CAS afterwards.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    async fn validate(&self, request: &ValidationRequest) -> GateResult<Verdict>;
}

/// Accepts every candidate.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl Validator for AllowAll {
    fn name(&self) -> &str {
        "allow-all"
    }

    async fn validate(&self, _request: &ValidationRequest) -> GateResult<Verdict> {
        Ok(Verdict::Accept)
    }
}

/// Runs a program per validation: the [`ValidationRequest`] goes to stdin as
/// JSON, `{"ok": bool, "reason"?: string}` is read back from stdout.
#[derive(Clone, Debug)]
pub struct CommandValidator {
    spec: CommandSpec,
}

impl CommandValidator {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Validator for CommandValidator {
    fn name(&self) -> &str {
        &self.spec.program
    }

    async fn validate(&self, request: &ValidationRequest) -> GateResult<Verdict> {
        let message: VerdictMessage = exchange("validator", &self.spec, request).await?;
        Ok(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{EntryChange, WriteOperation};
    use relay_types::ObjectId;

    fn request() -> ValidationRequest {
        ValidationRequest {
            repo: "default".into(),
            repo_dir: Some("/srv/relay/default".into()),
            branch: "main".into(),
            old_commit: None,
            new_commit: ObjectId::from_bytes(b"c1"),
            path: "/docs/a.md".into(),
            operation: WriteOperation::Put,
            changes: vec![EntryChange::put(
                "/docs/a.md",
                None,
                ObjectId::from_bytes(b"hello"),
                b"hello",
            )],
        }
    }

    fn sh(script: &str) -> CommandValidator {
        CommandValidator::new(CommandSpec::new("sh").arg("-c").arg(script))
    }

    #[tokio::test]
    async fn command_accepts() {
        let v = sh(r#"cat >/dev/null; echo '{"ok": true}'"#);
        assert_eq!(v.validate(&request()).await.unwrap(), Verdict::Accept);
    }

    #[tokio::test]
    async fn command_rejects_with_reason() {
        let v = sh(r#"cat >/dev/null; echo '{"ok": false, "reason": "title missing"}'"#);
        assert_eq!(
            v.validate(&request()).await.unwrap(),
            Verdict::reject("title missing")
        );
    }

    #[tokio::test]
    async fn command_sees_request_fields() {
        let v = sh(r#"if grep -q '"newCommit"'; then echo '{"ok": true}'; else echo '{"ok": false}'; fi"#);
        assert!(v.validate(&request()).await.unwrap().is_accept());
    }

    #[tokio::test]
    async fn command_sees_new_content_and_location() {
        // "aGVsbG8=" is base64 for "hello".
        let v = sh(r#"input=$(cat)
case "$input" in
  *'"repoDir":"/srv/relay/default"'*'aGVsbG8='*) echo '{"ok": true}' ;;
  *) echo '{"ok": false, "reason": "content not visible"}' ;;
esac"#);
        assert!(v.validate(&request()).await.unwrap().is_accept());

        let mut blind = request();
        blind.changes.clear();
        assert_eq!(
            v.validate(&blind).await.unwrap(),
            Verdict::reject("content not visible")
        );
    }

    #[test]
    fn entry_change_round_trips_bytes() {
        let change = EntryChange::put("/a.md", None, ObjectId::from_bytes(b"\x00\xff"), b"\x00\xff");
        assert_eq!(change.decoded_content().unwrap(), b"\x00\xff");
        assert!(EntryChange::delete("/a.md", None).decoded_content().is_none());
    }

    #[tokio::test]
    async fn allow_all_accepts() {
        assert!(AllowAll.validate(&request()).await.unwrap().is_accept());
    }
}
