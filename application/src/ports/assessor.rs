//! Assessor port
//!
//! "Strategic analysis" is modeled as an opaque scoring function with a
//! fixed I/O contract, so rule-based and model-based implementations can
//! be swapped without touching the scheduler.

use inquest_domain::{Assessment, ContextSnapshot, EvidenceLedger};

/// Scores a finished context snapshot for the artifact.
pub trait Assessor: Send + Sync {
    fn assess(&self, snapshot: &ContextSnapshot, ledger: &EvidenceLedger) -> Assessment;
}

/// Assessor used when none is configured.
pub struct NeutralAssessor;

impl Assessor for NeutralAssessor {
    fn assess(&self, _snapshot: &ContextSnapshot, _ledger: &EvidenceLedger) -> Assessment {
        Assessment::neutral()
    }
}
