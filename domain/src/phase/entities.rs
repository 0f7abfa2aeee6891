//! Phase and task definitions
//!
//! These are immutable declarations supplied by configuration. The
//! number of tasks per phase is open-ended: the pipeline is polymorphic
//! over investigator capability, not fixed to a particular cast.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behavior for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

impl RetryPolicy {
    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Declares which investigator runs within a phase, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Investigator implementation to dispatch to
    pub agent_kind: String,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl TaskSpec {
    pub fn new(agent_kind: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            agent_kind: agent_kind.into(),
            timeout_secs,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.retry = RetryPolicy { max_retries };
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One ordered stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub tasks: Vec<TaskSpec>,
}

impl PhaseSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn depends_on(mut self, phase: impl Into<String>) -> Self {
        self.depends_on.push(phase.into());
        self
    }

    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }
}
