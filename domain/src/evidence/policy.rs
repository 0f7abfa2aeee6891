//! Minimum-evidence halt policy
//!
//! The session halts only when it is truly hopeless: after the subject
//! phase, all three shortfalls must hold simultaneously. Any single
//! source of signal keeps the pipeline running in degraded mode instead.

use super::entities::EvidenceKind;
use super::ledger::EvidenceLedger;
use serde::{Deserialize, Serialize};

/// One unmet minimum-evidence condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceShortfall {
    /// No implementation evidence was recorded at all.
    NoImplementationEvidence,
    /// The phase contributed no context entries.
    NoDescriptiveFindings,
    /// No evidence of any other kind was recorded either.
    NoRelatedEvidence,
}

impl std::fmt::Display for EvidenceShortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceShortfall::NoImplementationEvidence => {
                write!(f, "no implementation evidence recorded")
            }
            EvidenceShortfall::NoDescriptiveFindings => {
                write!(f, "no descriptive findings contributed")
            }
            EvidenceShortfall::NoRelatedEvidence => {
                write!(f, "no related evidence of any other kind")
            }
        }
    }
}

/// Policy controlling the only hard halt the scheduler performs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimumEvidencePolicy {
    pub enabled: bool,
    /// Phase whose outcome is checked. Empty means the plan's first phase.
    pub subject_phase: String,
}

impl Default for MinimumEvidencePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            subject_phase: String::new(),
        }
    }
}

impl MinimumEvidencePolicy {
    /// Which shortfalls hold for the subject phase's results.
    ///
    /// `entries_contributed` counts entries the subject phase added.
    pub fn shortfalls(
        &self,
        entries_contributed: usize,
        ledger: &EvidenceLedger,
    ) -> Vec<EvidenceShortfall> {
        let mut unmet = Vec::new();
        if ledger.count_of_kind(EvidenceKind::Implementation) == 0 {
            unmet.push(EvidenceShortfall::NoImplementationEvidence);
        }
        if entries_contributed == 0 {
            unmet.push(EvidenceShortfall::NoDescriptiveFindings);
        }
        let related = ledger.len() - ledger.count_of_kind(EvidenceKind::Implementation);
        if related == 0 {
            unmet.push(EvidenceShortfall::NoRelatedEvidence);
        }
        unmet
    }

    /// Halt only when every condition fails at once.
    pub fn should_halt(&self, entries_contributed: usize, ledger: &EvidenceLedger) -> bool {
        self.enabled && self.shortfalls(entries_contributed, ledger).len() == 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::entities::EvidenceDraft;

    fn ledger_with(kind: EvidenceKind) -> EvidenceLedger {
        let mut ledger = EvidenceLedger::new();
        ledger.record(
            EvidenceDraft::new("claim", "ns.k".parse().unwrap(), "ref://x", kind),
            "task",
        );
        ledger
    }

    #[test]
    fn test_halts_only_when_all_three_conditions_fail() {
        let policy = MinimumEvidencePolicy::default();
        let empty = EvidenceLedger::new();

        assert!(policy.should_halt(0, &empty));
        let unmet = policy.shortfalls(0, &empty);
        assert_eq!(unmet.len(), 3);
    }

    #[test]
    fn test_findings_alone_prevent_halt() {
        let policy = MinimumEvidencePolicy::default();
        let empty = EvidenceLedger::new();
        assert!(!policy.should_halt(1, &empty));
    }

    #[test]
    fn test_implementation_evidence_prevents_halt() {
        let policy = MinimumEvidencePolicy::default();
        let ledger = ledger_with(EvidenceKind::Implementation);
        assert!(!policy.should_halt(0, &ledger));
    }

    #[test]
    fn test_related_evidence_prevents_halt() {
        let policy = MinimumEvidencePolicy::default();
        let ledger = ledger_with(EvidenceKind::Documentation);
        assert!(!policy.should_halt(0, &ledger));
        // But the implementation shortfall is still reported
        let unmet = policy.shortfalls(0, &ledger);
        assert!(unmet.contains(&EvidenceShortfall::NoImplementationEvidence));
        assert!(!unmet.contains(&EvidenceShortfall::NoRelatedEvidence));
    }

    #[test]
    fn test_disabled_policy_never_halts() {
        let policy = MinimumEvidencePolicy {
            enabled: false,
            subject_phase: String::new(),
        };
        assert!(!policy.should_halt(0, &EvidenceLedger::new()));
    }
}
