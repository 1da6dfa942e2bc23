use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::GateConfig;
use crate::error::GateResult;
use crate::process::bounded;
use crate::request::{ValidationRequest, Verdict};
use crate::validator::Validator;

/// The outcome of running a candidate through the gate.
#[derive(Clone, Debug)]
pub struct GateOutcome {
    pub verdict: Verdict,
    /// Which validator answered (`"none"` when the gate is permissive).
    pub validator: String,
    pub elapsed: Duration,
}

impl GateOutcome {
    pub fn is_accepted(&self) -> bool {
        self.verdict.is_accept()
    }
}

/// Every candidate commit passes through here before its branch ref may move.
///
/// The validator call is bounded by [`GateConfig::timeout`]; a timeout or a
/// transport failure is returned as an error, never as an accept.
#[derive(Clone)]
pub struct WriteGate {
    validator: Option<Arc<dyn Validator>>,
    config: GateConfig,
}

impl WriteGate {
    pub fn new(validator: Arc<dyn Validator>, config: GateConfig) -> Self {
        Self {
            validator: Some(validator),
            config,
        }
    }

    /// A gate that accepts everything without calling out.
    pub fn permissive() -> Self {
        Self {
            validator: None,
            config: GateConfig::permissive(),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub async fn evaluate(&self, request: &ValidationRequest) -> GateResult<GateOutcome> {
        let start = Instant::now();
        let validator = match &self.validator {
            Some(v) if !self.config.permissive => v,
            _ => {
                return Ok(GateOutcome {
                    verdict: Verdict::Accept,
                    validator: "none".into(),
                    elapsed: start.elapsed(),
                })
            }
        };

        let name = validator.name().to_string();
        let verdict = bounded(&name, self.config.timeout, validator.validate(request)).await?;
        let elapsed = start.elapsed();
        match &verdict {
            Verdict::Accept => tracing::debug!(
                validator = %name,
                repo = %request.repo,
                branch = %request.branch,
                commit = %request.new_commit,
                ?elapsed,
                "candidate accepted"
            ),
            Verdict::Reject { reason } => tracing::info!(
                validator = %name,
                repo = %request.repo,
                branch = %request.branch,
                commit = %request.new_commit,
                %reason,
                "candidate rejected"
            ),
        }
        Ok(GateOutcome {
            verdict,
            validator: name,
            elapsed,
        })
    }
}

impl std::fmt::Debug for WriteGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteGate")
            .field("validator", &self.validator.as_ref().map(|v| v.name().to_string()))
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::request::WriteOperation;
    use async_trait::async_trait;
    use relay_types::ObjectId;

    struct Scripted {
        verdict: Verdict,
        delay: Duration,
    }

    #[async_trait]
    impl Validator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn validate(&self, _request: &ValidationRequest) -> GateResult<Verdict> {
            tokio::time::sleep(self.delay).await;
            Ok(self.verdict.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl Validator for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn validate(&self, _request: &ValidationRequest) -> GateResult<Verdict> {
            Err(GateError::unreachable("validator", "connection refused"))
        }
    }

    fn request() -> ValidationRequest {
        ValidationRequest {
            repo: "default".into(),
            repo_dir: None,
            branch: "main".into(),
            old_commit: Some(ObjectId::from_bytes(b"c0")),
            new_commit: ObjectId::from_bytes(b"c1"),
            path: "/a.md".into(),
            operation: WriteOperation::Delete,
            changes: Vec::new(),
        }
    }

    fn gate(verdict: Verdict, delay_ms: u64, timeout_ms: u64) -> WriteGate {
        WriteGate::new(
            Arc::new(Scripted {
                verdict,
                delay: Duration::from_millis(delay_ms),
            }),
            GateConfig::with_timeout(Duration::from_millis(timeout_ms)),
        )
    }

    #[tokio::test]
    async fn accept_passes_through() {
        let outcome = gate(Verdict::Accept, 0, 1_000)
            .evaluate(&request())
            .await
            .unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(outcome.validator, "scripted");
    }

    #[tokio::test]
    async fn reject_keeps_reason() {
        let outcome = gate(Verdict::reject("no frontmatter"), 0, 1_000)
            .evaluate(&request())
            .await
            .unwrap();
        assert_eq!(outcome.verdict, Verdict::reject("no frontmatter"));
    }

    #[tokio::test]
    async fn slow_validator_times_out() {
        let err = gate(Verdict::Accept, 2_000, 20)
            .evaluate(&request())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn transport_failure_is_error() {
        let gate = WriteGate::new(Arc::new(Broken), GateConfig::default());
        assert!(matches!(
            gate.evaluate(&request()).await.unwrap_err(),
            GateError::Unreachable { .. }
        ));
    }

    #[tokio::test]
    async fn permissive_skips_validator() {
        let mut config = GateConfig::permissive();
        config.timeout = Duration::from_millis(1);
        let gate = WriteGate::new(
            Arc::new(Scripted {
                verdict: Verdict::reject("never consulted"),
                delay: Duration::from_secs(1),
            }),
            config,
        );
        let outcome = gate.evaluate(&request()).await.unwrap();
        assert!(outcome.is_accepted());
        assert_eq!(outcome.validator, "none");
        assert!(WriteGate::permissive()
            .evaluate(&request())
            .await
            .unwrap()
            .is_accepted());
    }
}
