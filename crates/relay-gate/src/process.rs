//! JSON-over-stdio exchange with an out-of-process collaborator.
//!
//! One child per call: the request is written to stdin as a single JSON
//! document, stdin is closed, and the whole of stdout is parsed as the
//! response. A non-zero exit or unparsable output counts as unreachable.
//! Children are killed if the caller's future is dropped (e.g. on timeout).

use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::CommandSpec;
use crate::error::{GateError, GateResult};

pub async fn exchange<Req, Resp>(boundary: &str, spec: &CommandSpec, request: &Req) -> GateResult<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_vec(request)
        .map_err(|e| GateError::unreachable(boundary, format!("encode request: {e}")))?;

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| GateError::unreachable(boundary, format!("spawn {}: {e}", spec.program)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| GateError::unreachable(boundary, "child stdin unavailable"))?;
    stdin
        .write_all(&payload)
        .await
        .map_err(|e| GateError::unreachable(boundary, format!("write request: {e}")))?;
    drop(stdin);

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| GateError::unreachable(boundary, format!("wait: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GateError::unreachable(
            boundary,
            format!("{} exited with {}: {}", spec.program, output.status, stderr.trim()),
        ));
    }
    serde_json::from_slice(&output.stdout)
        .map_err(|e| GateError::unreachable(boundary, format!("malformed response: {e}")))
}

/// Run `fut` under a deadline, turning expiry into [`GateError::Timeout`].
pub async fn bounded<T, F>(boundary: &str, timeout: Duration, fut: F) -> GateResult<T>
where
    F: Future<Output = GateResult<T>>,
{
    let start = Instant::now();
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(GateError::Timeout {
            boundary: boundary.to_string(),
            elapsed: start.elapsed(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn echoes_json_through_child() {
        let resp: Value = exchange("test", &sh("cat"), &json!({"hello": "world"}))
            .await
            .unwrap();
        assert_eq!(resp["hello"], "world");
    }

    #[tokio::test]
    async fn failing_child_is_unreachable() {
        let err = exchange::<_, Value>("test", &sh("echo boom >&2; exit 3"), &json!({}))
            .await
            .unwrap_err();
        match err {
            GateError::Unreachable { message, .. } => assert!(message.contains("boom")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_unreachable() {
        let spec = CommandSpec::new("/definitely/not/a/program");
        let err = exchange::<_, Value>("test", &spec, &json!({})).await.unwrap_err();
        assert!(matches!(err, GateError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn garbage_output_is_unreachable() {
        let err = exchange::<_, Value>("test", &sh("cat >/dev/null; echo not-json"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn bounded_times_out() {
        let err = bounded("slow", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }
}
