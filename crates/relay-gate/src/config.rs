use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How to launch an out-of-process collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Configuration for the write gate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    /// Deadline for one validator round-trip.
    pub timeout: Duration,
    /// Skip the validator entirely and accept every candidate.
    pub permissive: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            permissive: false,
        }
    }
}

impl GateConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }

    /// Accept-everything configuration for local use without a validator.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }
}
