//! Append-only evidence ledger and the validation gate
//!
//! The ledger records every claim alongside its provenance. The gate is
//! the final check before artifact construction: a claim is approved only
//! when implementation or pattern evidence exists for it. A rejected
//! claim triggers a search for the nearest approved claim in the same
//! namespace, returned as an alternative rather than a hard failure.

use super::entities::{EvidenceDraft, EvidenceId, EvidenceKind, EvidenceRecord};
use crate::conflict::policy::EvidenceWeights;
use crate::context::value_objects::SemanticKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of validating a claim against the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GateResult {
    Approved,
    Rejected { reason: String },
    /// Rejected, but a supported claim exists in the same namespace.
    RequiresAlternative { suggestion: String },
}

impl GateResult {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateResult::Approved)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_approved()
    }
}

/// Append-only ledger of evidence records.
///
/// Ids are assigned sequentially at record time; records are never
/// removed or rewritten.
#[derive(Debug, Clone, Default)]
pub struct EvidenceLedger {
    records: Vec<EvidenceRecord>,
}

impl EvidenceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a draft submitted by `source_task`, returning the assigned id.
    pub fn record(&mut self, draft: EvidenceDraft, source_task: impl Into<String>) -> EvidenceId {
        let id = EvidenceId::new(self.records.len() as u64 + 1);
        self.records.push(EvidenceRecord {
            id,
            claim: draft.claim,
            key: draft.key,
            source_task: source_task.into(),
            artifact_ref: draft.artifact_ref,
            kind: draft.kind,
        });
        id
    }

    pub fn get(&self, id: EvidenceId) -> Option<&EvidenceRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_of_kind(&self, kind: EvidenceKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Records referenced by the given ids, in id order.
    pub fn resolve_refs(&self, refs: &[EvidenceId]) -> Vec<&EvidenceRecord> {
        let mut records: Vec<&EvidenceRecord> = refs
            .iter()
            .filter_map(|id| self.get(*id))
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Weighted evidence strength of the referenced records.
    pub fn strength_of(&self, refs: &[EvidenceId], weights: &EvidenceWeights) -> u32 {
        self.resolve_refs(refs)
            .iter()
            .map(|r| weights.weight_of(r.kind))
            .sum()
    }

    /// Validate the claim represented by a set of evidence references.
    ///
    /// Approved when at least one referenced record can approve a
    /// capability claim. Otherwise the same-namespace ledger is searched
    /// for the best-supported approved claim to suggest instead.
    pub fn validate_refs(&self, key: &SemanticKey, refs: &[EvidenceId]) -> GateResult {
        let records = self.resolve_refs(refs);
        if records.iter().any(|r| r.kind.approves_capability()) {
            return GateResult::Approved;
        }

        let reason = if records.is_empty() {
            format!("no evidence recorded for `{}`", key)
        } else {
            let kinds: Vec<String> = records.iter().map(|r| r.kind.to_string()).collect();
            format!(
                "`{}` is supported only by {} evidence, which cannot approve a capability claim",
                key,
                kinds.join("/")
            )
        };

        match self.best_supported_claim(key.namespace()) {
            Some(record) => GateResult::RequiresAlternative {
                suggestion: record.claim.clone(),
            },
            None => GateResult::Rejected { reason },
        }
    }

    /// The most strongly supported approvable claim in a namespace.
    ///
    /// Claims are grouped by text; only records of approving kinds count
    /// toward support. Ties break toward the earliest-recorded claim so
    /// the suggestion is stable across runs.
    pub fn best_supported_claim(&self, namespace: &str) -> Option<&EvidenceRecord> {
        let mut support: BTreeMap<&str, (usize, &EvidenceRecord)> = BTreeMap::new();
        for record in &self.records {
            if record.key.namespace() != namespace || !record.kind.approves_capability() {
                continue;
            }
            support
                .entry(record.claim.as_str())
                .and_modify(|(count, _)| *count += 1)
                .or_insert((1, record));
        }
        support
            .into_values()
            .max_by(|(ca, ra), (cb, rb)| ca.cmp(cb).then(rb.id.cmp(&ra.id)))
            .map(|(_, record)| record)
    }
}
