//! Investigator port
//!
//! The single seam between the orchestration core and domain-specific
//! investigation logic. The core does not care whether an implementation
//! mines a ticket tracker, searches documentation, or probes a live
//! cluster: every investigator satisfies this one contract.

use crate::context_store::InterimBoard;
use async_trait::async_trait;
use inquest_domain::{ContextEntry, ContextSnapshot, EvidenceDraft};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors an investigator can report.
#[derive(Error, Debug)]
pub enum InvestigatorError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("investigation failed: {0}")]
    Failed(String),
}

/// Completion signal of one investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Full result.
    Done,
    /// Partial result the pipeline should accept with lowered expectations.
    Degraded,
    /// No usable result.
    Failed,
}

/// Input handed to an investigator for one attempt.
///
/// The snapshot is the immutable context the task's phase sees. The
/// interim board carries advisory partial entries from tasks still
/// running in the same phase; reading it is a non-blocking poll.
#[derive(Clone)]
pub struct InvestigationInput {
    pub job_key: String,
    /// Seed parameters supplied at submission
    pub params: BTreeMap<String, String>,
    pub snapshot: ContextSnapshot,
    pub interim: InterimBoard,
}

/// Output of one investigation attempt.
#[derive(Debug, Clone)]
pub struct InvestigationReport {
    /// Facts to merge into the context
    pub findings: Vec<ContextEntry>,
    /// Evidence backing the findings; the ledger assigns ids and binds
    /// records to findings by key
    pub evidence: Vec<EvidenceDraft>,
    /// Overall confidence in this report (0.0 to 1.0)
    pub confidence: f64,
    pub status: ReportStatus,
}

impl InvestigationReport {
    pub fn done(findings: Vec<ContextEntry>, evidence: Vec<EvidenceDraft>) -> Self {
        Self {
            findings,
            evidence,
            confidence: 1.0,
            status: ReportStatus::Done,
        }
    }

    /// Report for a task that exhausted its retries: no findings,
    /// confidence zero.
    pub fn degraded() -> Self {
        Self {
            findings: Vec::new(),
            evidence: Vec::new(),
            confidence: 0.0,
            status: ReportStatus::Degraded,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.status == ReportStatus::Degraded
    }
}

/// An investigation capability behind the uniform adapter contract.
#[async_trait]
pub trait Investigator: Send + Sync {
    /// Agent kind this implementation answers to (matches `TaskSpec::agent_kind`).
    fn kind(&self) -> &str;

    /// Run one investigation attempt against the given context.
    async fn investigate(
        &self,
        input: InvestigationInput,
    ) -> Result<InvestigationReport, InvestigatorError>;
}
