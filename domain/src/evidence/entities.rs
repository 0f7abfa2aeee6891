//! Evidence types
//!
//! Every claim that reaches the final artifact must be traceable to at
//! least one [`EvidenceRecord`]. Records are created from
//! [`EvidenceDraft`]s submitted by investigators; the ledger assigns ids.

use crate::context::value_objects::SemanticKey;
use serde::{Deserialize, Serialize};

/// Ledger-assigned evidence identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EvidenceId(u64);

impl EvidenceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ev-{:06}", self.0)
    }
}

/// What kind of source backs a piece of evidence.
///
/// Implementation and pattern evidence can approve capability claims on
/// their own. Deployment evidence only speaks to current availability
/// and never independently approves a capability claim, so the pipeline
/// can describe features that exist in source but are not yet rolled
/// out while still rejecting invention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// Found in source code or a merged change
    Implementation,
    /// Observed on a live system
    Deployment,
    /// Described in documentation
    Documentation,
    /// Matches an established pattern elsewhere in the system
    Pattern,
}

impl EvidenceKind {
    /// Whether this kind can approve a capability claim by itself.
    pub fn approves_capability(&self) -> bool {
        matches!(self, EvidenceKind::Implementation | EvidenceKind::Pattern)
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceKind::Implementation => write!(f, "implementation"),
            EvidenceKind::Deployment => write!(f, "deployment"),
            EvidenceKind::Documentation => write!(f, "documentation"),
            EvidenceKind::Pattern => write!(f, "pattern"),
        }
    }
}

/// Evidence as submitted by an investigator, before the ledger assigns
/// an id and stamps the source task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDraft {
    /// The claim this evidence supports
    pub claim: String,
    /// Key the claim is about
    pub key: SemanticKey,
    /// Pointer into the investigated artifact (commit, ticket, URL, path)
    pub artifact_ref: String,
    pub kind: EvidenceKind,
}

impl EvidenceDraft {
    pub fn new(
        claim: impl Into<String>,
        key: SemanticKey,
        artifact_ref: impl Into<String>,
        kind: EvidenceKind,
    ) -> Self {
        Self {
            claim: claim.into(),
            key,
            artifact_ref: artifact_ref.into(),
            kind,
        }
    }
}

/// One recorded piece of evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: EvidenceId,
    pub claim: String,
    pub key: SemanticKey,
    /// Agent kind that submitted the evidence
    pub source_task: String,
    pub artifact_ref: String,
    pub kind: EvidenceKind,
}
