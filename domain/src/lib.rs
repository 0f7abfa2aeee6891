//! Domain layer for inquest
//!
//! This crate contains the core pipeline entities and pure algorithms.
//! It has no dependencies on infrastructure or async concerns.
//!
//! # Core Concepts
//!
//! ## Context
//!
//! Every investigator contributes facts ([`ContextEntry`]) keyed by a
//! namespaced [`SemanticKey`]. Contributions are merged into immutable,
//! versioned [`ContextSnapshot`]s; a merge never overwrites an accepted
//! fact, it raises a [`ContextConflict`] instead.
//!
//! ## Conflict resolution
//!
//! Conflicts are classified in priority order (alias, type mismatch,
//! value disagreement) and resolved deterministically from configuration:
//! canonicalization, source priority, or evidence strength.
//!
//! ## Evidence
//!
//! The [`EvidenceLedger`] is append-only and backs the validation gate:
//! a claim enters the final [`Artifact`] only with implementation or
//! pattern evidence behind it.

pub mod artifact;
pub mod conflict;
pub mod context;
pub mod core;
pub mod evidence;
pub mod phase;
pub mod session;

// Re-export commonly used types
pub use artifact::{
    builder::ArtifactBuilder,
    entities::{Artifact, ArtifactClaim, Assessment, Caveat, CaveatKind},
};
pub use conflict::{
    entities::{ConflictClassification, ConflictResolution, ContextConflict, ResolutionStrategy},
    policy::{EvidenceWeights, ResolutionPolicy},
    resolver::{ConflictResolver, ResolvedMerge, RetryRequest},
};
pub use context::{
    entities::{ContextEntry, ContextSnapshot, Provenance},
    merge::{merge, MergeOutcome},
    value_objects::{ContextValue, SemanticKey},
};
pub use crate::core::error::DomainError;
pub use evidence::{
    entities::{EvidenceDraft, EvidenceId, EvidenceKind, EvidenceRecord},
    ledger::{EvidenceLedger, GateResult},
    policy::{EvidenceShortfall, MinimumEvidencePolicy},
};
pub use phase::{
    entities::{PhaseSpec, RetryPolicy, TaskSpec},
    plan::PhasePlan,
    state::{PhaseBoard, PhaseStatus},
};
pub use session::entities::{ExecutionSession, HaltReason, SessionId, SessionStatus};
