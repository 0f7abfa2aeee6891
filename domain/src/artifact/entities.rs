//! Artifact types
//!
//! The artifact is the structured final output of a session: the gated
//! claims, the caveats accumulated along the way (degraded tasks,
//! escalated conflicts, substituted claims), and an overall assessment.
//! Rendering it into a human-readable report happens elsewhere.

use crate::context::value_objects::{ContextValue, SemanticKey};
use crate::evidence::entities::EvidenceId;
use crate::session::entities::SessionId;
use serde::{Deserialize, Serialize};

/// One gated claim in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactClaim {
    pub key: SemanticKey,
    pub value: ContextValue,
    /// Claim text, from the supporting evidence where available
    pub claim: String,
    pub confidence: f64,
    pub evidence: Vec<EvidenceId>,
    /// True when the gate substituted an alternative supported claim
    pub substituted: bool,
}

/// Category of an artifact caveat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaveatKind {
    /// A task exhausted its retries; its contribution is missing or weakened.
    DegradedTask,
    /// A conflict could not be decided and was carried forward.
    EscalatedConflict,
    /// The gate replaced an unsupported claim with a supported alternative.
    SubstitutedClaim,
    /// An unsupported claim was dropped entirely.
    DroppedClaim,
}

/// A caveat attached to the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caveat {
    pub kind: CaveatKind,
    pub detail: String,
}

impl Caveat {
    pub fn new(kind: CaveatKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Opaque scoring output attached to the artifact (see the assessor port).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// 0.0 to 1.0
    pub score: f64,
    pub rationale: String,
}

impl Assessment {
    pub fn new(score: f64, rationale: impl Into<String>) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }

    /// Assessment used when no assessor is configured.
    pub fn neutral() -> Self {
        Self::new(0.5, "no assessor configured")
    }
}

/// Structured final output of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub session_id: SessionId,
    pub job_key: String,
    /// Version of the snapshot the artifact was built from
    pub context_version: u64,
    pub claims: Vec<ArtifactClaim>,
    pub caveats: Vec<Caveat>,
    pub assessment: Assessment,
}

impl Artifact {
    pub fn claim_for(&self, key: &SemanticKey) -> Option<&ArtifactClaim> {
        self.claims.iter().find(|c| &c.key == key)
    }

    pub fn has_caveat(&self, kind: CaveatKind) -> bool {
        self.caveats.iter().any(|c| c.kind == kind)
    }
}
