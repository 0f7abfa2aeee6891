//! Pipeline observer port
//!
//! Read-only, non-blocking consumer of pipeline events. Observers never
//! feed back into execution; a slow or failing observer must not stall
//! the scheduler, so implementations are expected to swallow their own
//! errors (the JSONL sink in infrastructure does exactly that).

use inquest_domain::{ConflictClassification, HaltReason, PhaseStatus};
use serde::Serialize;

/// One pipeline event, serializable for structured sinks.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    SessionStarted {
        session_id: String,
        job_key: String,
    },
    PhaseStarted {
        phase: String,
        tasks: usize,
    },
    TaskCompleted {
        phase: String,
        agent_kind: String,
        status: String,
        confidence: f64,
    },
    SnapshotMerged {
        phase: String,
        version: u64,
        entries: usize,
        conflicts: usize,
    },
    ConflictDetected {
        key: String,
        classification: ConflictClassification,
    },
    ConflictResolved {
        key: String,
        strategy: String,
        rationale: String,
    },
    ConflictEscalated {
        key: String,
        reason: String,
    },
    CorrectiveRerun {
        phase: String,
        agent_kind: String,
        key: String,
    },
    PhaseCompleted {
        phase: String,
        status: PhaseStatus,
    },
    SessionHalted {
        session_id: String,
        reason: HaltReason,
    },
    ArtifactEmitted {
        session_id: String,
        claims: usize,
        caveats: usize,
    },
    SessionCompleted {
        session_id: String,
    },
}

/// Consumer of pipeline events.
pub trait PipelineObserver: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// No-op observer for when event recording is not needed.
pub struct NoObserver;

impl PipelineObserver for NoObserver {
    fn record(&self, _event: PipelineEvent) {}
}
