//! Execution session entities
//!
//! One session is one leased run of the pipeline for one job key. The
//! registry (an application port) enforces the single-session invariant;
//! these types only model the state.

use crate::evidence::policy::EvidenceShortfall;
use serde::{Deserialize, Serialize};

/// Identifier of one orchestration session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Halted,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Halted => write!(f, "halted"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One run of the orchestration for one job key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSession {
    pub session_id: SessionId,
    pub job_key: String,
    /// Milliseconds since the Unix epoch
    pub started_at: u64,
    pub status: SessionStatus,
}

impl ExecutionSession {
    pub fn new(session_id: SessionId, job_key: impl Into<String>, started_at: u64) -> Self {
        Self {
            session_id,
            job_key: job_key.into(),
            started_at,
            status: SessionStatus::Running,
        }
    }

    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = status;
        self
    }
}

/// Structured reason a session halted instead of producing an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    /// The minimum-evidence policy failed: every listed condition was
    /// unmet simultaneously after the subject phase.
    InsufficientEvidence {
        phase: String,
        shortfalls: Vec<EvidenceShortfall>,
    },
    /// An escalated conflict touched a key configured as critical.
    CriticalConflict { key: String, detail: String },
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::InsufficientEvidence { phase, shortfalls } => {
                let conditions: Vec<String> =
                    shortfalls.iter().map(|s| s.to_string()).collect();
                write!(
                    f,
                    "insufficient evidence after phase `{}`: {}",
                    phase,
                    conditions.join("; ")
                )
            }
            HaltReason::CriticalConflict { key, detail } => {
                write!(f, "unresolved conflict on critical key `{}`: {}", key, detail)
            }
        }
    }
}
