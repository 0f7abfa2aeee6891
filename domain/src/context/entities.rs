//! Context entities: entries and immutable snapshots
//!
//! A [`ContextEntry`] is one fact contributed by one task. A
//! [`ContextSnapshot`] is the immutable, versioned set of facts visible to
//! a phase. Snapshots are only ever produced by merging (see
//! [`crate::context::merge`]); there is no in-place mutation, which is
//! what makes the version chain auditable.

use super::value_objects::{ContextValue, SemanticKey};
use crate::evidence::entities::EvidenceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an entry came from: directly from a task, or rewritten by the
/// conflict resolver. Resolver provenance carries the strategy and
/// rationale so every resolution is auditable from the snapshot alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Contributed by an investigator task as-is.
    Task,
    /// Written by the conflict resolver.
    Resolver { strategy: String, rationale: String },
}

impl Provenance {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Provenance::Resolver { .. })
    }
}

/// One fact contributed by one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Namespaced key this fact is recorded under
    pub key: SemanticKey,
    /// Typed value
    pub value: ContextValue,
    /// Agent kind that contributed the fact
    pub source_task: String,
    /// Contributor's confidence in the fact (0.0 to 1.0)
    pub confidence: f64,
    /// Ledger records supporting this fact
    pub evidence: Vec<EvidenceId>,
    /// Task contribution or resolver rewrite
    pub provenance: Provenance,
}

impl ContextEntry {
    pub fn new(
        key: SemanticKey,
        value: ContextValue,
        source_task: impl Into<String>,
    ) -> Self {
        Self {
            key,
            value,
            source_task: source_task.into(),
            confidence: 1.0,
            evidence: Vec::new(),
            provenance: Provenance::Task,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceId>) -> Self {
        self.evidence = evidence;
        self
    }

    /// Mark this entry as produced by the conflict resolver.
    pub fn resolved_by(
        mut self,
        strategy: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        self.provenance = Provenance::Resolver {
            strategy: strategy.into(),
            rationale: rationale.into(),
        };
        self
    }
}

/// Immutable, versioned set of context entries.
///
/// Keys are unique per snapshot version. Consumers receive clones and can
/// never mutate a published snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    version: u64,
    entries: BTreeMap<SemanticKey, ContextEntry>,
}

impl ContextSnapshot {
    /// The empty version-zero snapshot a pipeline starts from.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        version: u64,
        entries: BTreeMap<SemanticKey, ContextEntry>,
    ) -> Self {
        Self { version, entries }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, key: &SemanticKey) -> Option<&ContextEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &SemanticKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SemanticKey> {
        self.entries.keys()
    }

    /// Entries recorded under the given namespace.
    pub fn entries_in_namespace<'a>(
        &'a self,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a ContextEntry> {
        self.entries
            .values()
            .filter(move |e| e.key.namespace() == namespace)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entry_map(&self) -> &BTreeMap<SemanticKey, ContextEntry> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> SemanticKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_entry_builder_clamps_confidence() {
        let entry = ContextEntry::new(
            key("deploy.status"),
            ContextValue::Flag(true),
            "cluster-probe",
        )
        .with_confidence(1.7);
        assert_eq!(entry.confidence, 1.0);

        let entry = entry.with_confidence(-0.3);
        assert_eq!(entry.confidence, 0.0);
    }

    #[test]
    fn test_entry_default_provenance_is_task() {
        let entry = ContextEntry::new(key("a.b"), ContextValue::Number(1.0), "t");
        assert_eq!(entry.provenance, Provenance::Task);
        assert!(!entry.provenance.is_resolved());
    }

    #[test]
    fn test_resolved_by_records_strategy_and_rationale() {
        let entry = ContextEntry::new(key("a.b"), ContextValue::Number(1.0), "t")
            .resolved_by("evidence_strength", "2 implementation vs 1 deployment");
        match &entry.provenance {
            Provenance::Resolver { strategy, rationale } => {
                assert_eq!(strategy, "evidence_strength");
                assert!(rationale.contains("implementation"));
            }
            other => panic!("unexpected provenance: {:?}", other),
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = ContextSnapshot::empty();
        assert_eq!(snapshot.version(), 0);
        assert!(snapshot.is_empty());
        assert!(!snapshot.contains_key(&key("a.b")));
    }

    #[test]
    fn test_entries_in_namespace_filters() {
        let mut entries = BTreeMap::new();
        for k in ["ticket.id", "ticket.owner", "deploy.status"] {
            let sk = key(k);
            entries.insert(
                sk.clone(),
                ContextEntry::new(sk, ContextValue::Text("x".to_string()), "t"),
            );
        }
        let snapshot = ContextSnapshot::from_parts(1, entries);
        assert_eq!(snapshot.entries_in_namespace("ticket").count(), 2);
        assert_eq!(snapshot.entries_in_namespace("deploy").count(), 1);
        assert_eq!(snapshot.entries_in_namespace("env").count(), 0);
    }
}
