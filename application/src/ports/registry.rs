//! Execution registry port
//!
//! Guarantees at most one active session per job key. Leases carry a
//! timeout so a crashed process cannot block future runs forever; expiry
//! is the only source of forced cancellation in the system.

use async_trait::async_trait;
use inquest_domain::{ExecutionSession, SessionId, SessionStatus};
use thiserror::Error;

/// Errors from registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// An unexpired session already holds the job key. Reported to the
    /// caller immediately; never retried automatically.
    #[error("a session is already running for job `{job_key}`")]
    AlreadyRunning { job_key: String },

    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The lease lapsed and the slot was reclaimed. Any in-flight work
    /// of the reclaimed session must be discarded, not replayed.
    #[error("lease expired for session {0}")]
    LeaseExpired(String),
}

impl RegistryError {
    pub fn is_already_running(&self) -> bool {
        matches!(self, RegistryError::AlreadyRunning { .. })
    }
}

/// Session registry with lease-based single-execution enforcement.
#[async_trait]
pub trait ExecutionRegistry: Send + Sync {
    /// Acquire the slot for a job key, creating a new session.
    async fn acquire(&self, job_key: &str) -> Result<SessionId, RegistryError>;

    /// Renew the session's lease.
    async fn heartbeat(&self, session: &SessionId) -> Result<(), RegistryError>;

    /// Release the slot, recording the terminal status.
    async fn release(&self, session: &SessionId, status: SessionStatus)
        -> Result<(), RegistryError>;

    /// Whether the session still holds an unexpired lease. Checked
    /// before publishing a merge so a reclaimed session cannot
    /// contaminate a successor's context chain.
    async fn is_current(&self, session: &SessionId) -> bool;

    /// Look up a session (active or terminal) for observability queries.
    async fn session(&self, session: &SessionId) -> Option<ExecutionSession>;
}
