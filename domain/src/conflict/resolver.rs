//! Conflict resolver
//!
//! Applies one resolution strategy per classification, in this order:
//!
//! 1. `SemanticAlias`: canonicalization. Both labels are rewritten to
//!    the canonical one; nothing is lost and no confidence penalty is
//!    applied. If the canonicalized entries still disagree, the residual
//!    disagreement is resolved as a fresh conflict.
//! 2. `TypeMismatch`: source priority. The namespace's authoritative
//!    source wins; the losing task is flagged for a corrective re-run
//!    with the winning value present in its next input snapshot.
//! 3. `ValueDisagreement`: evidence strength. The side with stronger
//!    ledger support wins; ties escalate rather than silently picking a
//!    side.
//!
//! Resolution is deterministic: identical competing entries, policy and
//! ledger state always produce identical output. Every rewritten entry
//! carries resolver provenance (strategy and rationale).

use super::entities::{
    ConflictClassification, ConflictResolution, ContextConflict, ResolutionStrategy,
};
use super::policy::ResolutionPolicy;
use crate::context::entities::{ContextEntry, ContextSnapshot};
use crate::context::merge::{corroborate, MergeOutcome};
use crate::context::value_objects::{ContextValue, SemanticKey};
use crate::evidence::ledger::EvidenceLedger;
use std::collections::VecDeque;

/// Corrective re-run requested for the task that lost a type mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryRequest {
    /// Agent kind to re-run
    pub agent_kind: String,
    /// Key the correction applies to
    pub key: SemanticKey,
    /// Value that will be visible in the task's next input snapshot
    pub corrected: ContextValue,
}

/// A merge with every conflict resolved or escalated.
#[derive(Debug, Clone)]
pub struct ResolvedMerge {
    /// Snapshot with resolutions applied. Escalated conflicts leave the
    /// prior value provisional.
    pub snapshot: ContextSnapshot,
    /// All conflicts raised by the merge, none `Pending`.
    pub conflicts: Vec<ContextConflict>,
    /// Corrective re-runs requested by type-mismatch resolutions.
    pub retries: Vec<RetryRequest>,
}

impl ResolvedMerge {
    /// Conflicts that ended up escalated.
    pub fn escalated(&self) -> impl Iterator<Item = &ContextConflict> {
        self.conflicts.iter().filter(|c| c.is_escalated())
    }
}

/// Resolves the conflicts of one merge against policy and ledger state.
pub struct ConflictResolver<'a> {
    policy: &'a ResolutionPolicy,
    ledger: &'a EvidenceLedger,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(policy: &'a ResolutionPolicy, ledger: &'a EvidenceLedger) -> Self {
        Self { policy, ledger }
    }

    /// Resolve every conflict in a merge outcome.
    pub fn resolve(&self, outcome: MergeOutcome) -> ResolvedMerge {
        let version = outcome.snapshot.version();
        let mut entries = outcome.snapshot.entry_map().clone();
        let mut resolved = Vec::new();
        let mut retries = Vec::new();
        let mut queue: VecDeque<ContextConflict> = outcome.conflicts.into();

        while let Some(conflict) = queue.pop_front() {
            match conflict.classification {
                ConflictClassification::SemanticAlias => {
                    self.resolve_alias(conflict, &mut entries, &mut resolved, &mut queue);
                }
                ConflictClassification::TypeMismatch => {
                    self.resolve_type_mismatch(conflict, &mut entries, &mut resolved, &mut retries);
                }
                ConflictClassification::ValueDisagreement => {
                    self.resolve_disagreement(conflict, &mut entries, &mut resolved);
                }
            }
        }

        ResolvedMerge {
            snapshot: ContextSnapshot::from_parts(version, entries),
            conflicts: resolved,
            retries,
        }
    }

    fn resolve_alias(
        &self,
        mut conflict: ContextConflict,
        entries: &mut std::collections::BTreeMap<SemanticKey, ContextEntry>,
        resolved: &mut Vec<ContextConflict>,
        queue: &mut VecDeque<ContextConflict>,
    ) {
        let canonical = conflict.key.clone();
        let [existing, incoming]: [ContextEntry; 2] =
            match conflict.competing.clone().try_into() {
                Ok(pair) => pair,
                Err(_) => {
                    conflict.resolution = ConflictResolution::Escalated {
                        reason: "malformed alias conflict".to_string(),
                    };
                    resolved.push(conflict);
                    return;
                }
            };
        let rationale = format!(
            "labels `{}` and `{}` canonicalized to `{}`",
            existing.key, incoming.key, canonical
        );

        // Rewrite both sides under the canonical label.
        entries.remove(&existing.key);
        entries.remove(&incoming.key);
        let mut existing = existing;
        let mut incoming = incoming;
        existing.key = canonical.clone();
        incoming.key = canonical.clone();

        if existing.value == incoming.value {
            let merged = corroborate(existing.clone(), incoming)
                .resolved_by(ResolutionStrategy::Canonicalization.as_str(), &rationale);
            entries.insert(canonical, merged);
        } else {
            // Canonicalization succeeded but the values still disagree:
            // keep the established entry provisional and queue the residual
            // conflict for the next strategy in priority order.
            entries.insert(canonical, existing.clone());
            queue.push_back(ContextConflict::between(existing.clone(), incoming));
        }

        conflict.resolution = ConflictResolution::Resolved {
            strategy: ResolutionStrategy::Canonicalization,
            winner: existing.source_task.clone(),
            rationale,
        };
        resolved.push(conflict);
    }

    fn resolve_type_mismatch(
        &self,
        mut conflict: ContextConflict,
        entries: &mut std::collections::BTreeMap<SemanticKey, ContextEntry>,
        resolved: &mut Vec<ContextConflict>,
        retries: &mut Vec<RetryRequest>,
    ) {
        let prior = conflict.competing[0].clone();
        let incoming = conflict.competing[1].clone();
        let namespace = conflict.key.namespace().to_string();

        let (winner, loser, rationale) =
            match self.policy.authoritative_source(&namespace) {
                Some(auth) if incoming.source_task == auth => (
                    incoming.clone(),
                    prior,
                    format!("`{}` is authoritative for namespace `{}`", auth, namespace),
                ),
                Some(auth) => (
                    prior,
                    incoming,
                    format!("`{}` is authoritative for namespace `{}`", auth, namespace),
                ),
                None => (
                    prior,
                    incoming,
                    format!(
                        "no authoritative source declared for namespace `{}`; established value retained",
                        namespace
                    ),
                ),
            };

        let entry = winner
            .clone()
            .resolved_by(ResolutionStrategy::SourcePriority.as_str(), &rationale);
        entries.insert(conflict.key.clone(), entry);

        retries.push(RetryRequest {
            agent_kind: loser.source_task.clone(),
            key: conflict.key.clone(),
            corrected: winner.value.clone(),
        });

        conflict.resolution = ConflictResolution::Resolved {
            strategy: ResolutionStrategy::SourcePriority,
            winner: winner.source_task,
            rationale,
        };
        resolved.push(conflict);
    }

    fn resolve_disagreement(
        &self,
        mut conflict: ContextConflict,
        entries: &mut std::collections::BTreeMap<SemanticKey, ContextEntry>,
        resolved: &mut Vec<ContextConflict>,
    ) {
        let prior = conflict.competing[0].clone();
        let incoming = conflict.competing[1].clone();
        let weights = &self.policy.weights;

        let prior_strength = self.ledger.strength_of(&prior.evidence, weights);
        let incoming_strength = self.ledger.strength_of(&incoming.evidence, weights);

        if prior_strength == incoming_strength {
            // Tie: leave the prior value provisional and escalate.
            conflict.resolution = ConflictResolution::Escalated {
                reason: format!(
                    "evidence strength tie ({} records, strength {} vs {} records, strength {})",
                    prior.evidence.len(),
                    prior_strength,
                    incoming.evidence.len(),
                    incoming_strength
                ),
            };
            resolved.push(conflict);
            return;
        }

        let (winner, winner_strength, loser_strength) = if prior_strength > incoming_strength {
            (prior, prior_strength, incoming_strength)
        } else {
            (incoming, incoming_strength, prior_strength)
        };
        let rationale = format!(
            "{} evidence records (strength {}) outweigh {} (strength {})",
            winner.evidence.len(),
            winner_strength,
            conflict
                .competing
                .iter()
                .find(|e| e.source_task != winner.source_task)
                .map(|e| e.evidence.len())
                .unwrap_or(0),
            loser_strength
        );

        let entry = winner
            .clone()
            .resolved_by(ResolutionStrategy::EvidenceStrength.as_str(), &rationale);
        entries.insert(conflict.key.clone(), entry);

        conflict.resolution = ConflictResolution::Resolved {
            strategy: ResolutionStrategy::EvidenceStrength,
            winner: winner.source_task,
            rationale,
        };
        resolved.push(conflict);
    }
}
