//! Rule-based assessor
//!
//! Deterministic scoring over the finished snapshot: evidence coverage
//! weighted against mean confidence. The assessor port keeps this
//! swappable for model-based scoring without touching the scheduler.

use inquest_application::ports::assessor::Assessor;
use inquest_domain::{Assessment, ContextSnapshot, EvidenceLedger};

/// Scores a snapshot from evidence coverage and contributor confidence.
pub struct RuleBasedAssessor {
    coverage_weight: f64,
}

impl RuleBasedAssessor {
    pub fn new() -> Self {
        Self {
            coverage_weight: 0.6,
        }
    }
}

impl Default for RuleBasedAssessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Assessor for RuleBasedAssessor {
    fn assess(&self, snapshot: &ContextSnapshot, _ledger: &EvidenceLedger) -> Assessment {
        if snapshot.is_empty() {
            return Assessment::new(0.0, "no findings to assess");
        }

        let total = snapshot.len() as f64;
        let evidenced = snapshot.entries().filter(|e| !e.evidence.is_empty()).count() as f64;
        let coverage = evidenced / total;
        let mean_confidence =
            snapshot.entries().map(|e| e.confidence).sum::<f64>() / total;

        let score =
            coverage * self.coverage_weight + mean_confidence * (1.0 - self.coverage_weight);
        Assessment::new(
            score,
            format!(
                "{:.0}% of findings carry evidence; mean confidence {:.2}",
                coverage * 100.0,
                mean_confidence
            ),
        )
    }
}
