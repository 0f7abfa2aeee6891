//! Conflict types
//!
//! A conflict is raised whenever a merge finds two entries competing for
//! one semantic key (or two keys that are label variants of one concept).
//! Classification happens at detection time; resolution state is filled in
//! by the [`crate::conflict::resolver`].

use crate::context::entities::ContextEntry;
use crate::context::value_objects::SemanticKey;
use serde::{Deserialize, Serialize};

/// How two competing entries disagree, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictClassification {
    /// Two key labels denote the same concept (case/separator variants).
    SemanticAlias,
    /// Values drawn from different, non-comparable domains.
    TypeMismatch,
    /// Same domain, different value.
    ValueDisagreement,
}

impl std::fmt::Display for ConflictClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictClassification::SemanticAlias => write!(f, "semantic alias"),
            ConflictClassification::TypeMismatch => write!(f, "type mismatch"),
            ConflictClassification::ValueDisagreement => write!(f, "value disagreement"),
        }
    }
}

/// Strategy the resolver applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Alias labels rewritten to one canonical label.
    Canonicalization,
    /// The namespace's authoritative source won.
    SourcePriority,
    /// The side with stronger ledger evidence won.
    EvidenceStrength,
}

impl ResolutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::Canonicalization => "canonicalization",
            ResolutionStrategy::SourcePriority => "source_priority",
            ResolutionStrategy::EvidenceStrength => "evidence_strength",
        }
    }
}

/// Resolution state of a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Not yet resolved. A snapshot with pending conflicts must not be
    /// published to the next phase.
    Pending,
    /// Resolved by the named strategy; `winner` is the surviving source task.
    Resolved {
        strategy: ResolutionStrategy,
        winner: String,
        rationale: String,
    },
    /// Could not be decided; carried into the artifact as a caveat.
    Escalated { reason: String },
}

impl ConflictResolution {
    pub fn is_pending(&self) -> bool {
        matches!(self, ConflictResolution::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ConflictResolution::Resolved { .. })
    }

    pub fn is_escalated(&self) -> bool {
        matches!(self, ConflictResolution::Escalated { .. })
    }
}

/// Two or more entries competing for one semantic key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConflict {
    /// Key under dispute (the canonical key, for alias conflicts)
    pub key: SemanticKey,
    /// Competing entries, prior entry first
    pub competing: Vec<ContextEntry>,
    pub classification: ConflictClassification,
    pub resolution: ConflictResolution,
}

impl ContextConflict {
    /// Classify a same-key collision between the accepted entry and an
    /// incoming one. Domain difference is checked before content.
    pub fn between(prior: ContextEntry, incoming: ContextEntry) -> Self {
        let classification = if prior.value.same_domain(&incoming.value) {
            ConflictClassification::ValueDisagreement
        } else {
            ConflictClassification::TypeMismatch
        };
        Self {
            key: prior.key.clone(),
            competing: vec![prior, incoming],
            classification,
            resolution: ConflictResolution::Pending,
        }
    }

    /// Build an alias conflict between entries under two label variants.
    /// The conflict is keyed by the canonical label.
    pub fn alias(existing: ContextEntry, incoming: ContextEntry) -> Self {
        let key = SemanticKey::canonical(&existing.key, &incoming.key).clone();
        Self {
            key,
            competing: vec![existing, incoming],
            classification: ConflictClassification::SemanticAlias,
            resolution: ConflictResolution::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.resolution.is_pending()
    }

    pub fn is_escalated(&self) -> bool {
        self.resolution.is_escalated()
    }
}
