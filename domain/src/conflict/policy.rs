//! Resolution policy
//!
//! Externally supplied configuration the resolver consults: which source
//! is authoritative per key namespace, which keys are critical enough to
//! halt the session on escalation, and how much each evidence kind
//! weighs. Nothing here is hardcoded into the resolver.

use crate::context::value_objects::SemanticKey;
use crate::evidence::entities::EvidenceKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-kind evidence weights used when comparing evidence strength.
///
/// The defaults are a heuristic, not a statistical model: implementation
/// evidence outweighs pattern evidence, which outweighs descriptive and
/// observational kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceWeights {
    pub implementation: u32,
    pub pattern: u32,
    pub documentation: u32,
    pub deployment: u32,
}

impl Default for EvidenceWeights {
    fn default() -> Self {
        Self {
            implementation: 3,
            pattern: 2,
            documentation: 1,
            deployment: 1,
        }
    }
}

impl EvidenceWeights {
    pub fn weight_of(&self, kind: EvidenceKind) -> u32 {
        match kind {
            EvidenceKind::Implementation => self.implementation,
            EvidenceKind::Pattern => self.pattern,
            EvidenceKind::Documentation => self.documentation,
            EvidenceKind::Deployment => self.deployment,
        }
    }
}

/// Configuration consulted during conflict resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionPolicy {
    /// Authoritative source task per key namespace, for type mismatches.
    source_priority: BTreeMap<String, String>,
    /// Keys whose escalation halts the session instead of degrading it.
    critical_keys: BTreeSet<String>,
    pub weights: EvidenceWeights,
}

impl ResolutionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `source_task` authoritative for `namespace`.
    pub fn with_priority(
        mut self,
        namespace: impl Into<String>,
        source_task: impl Into<String>,
    ) -> Self {
        self.source_priority
            .insert(namespace.into(), source_task.into());
        self
    }

    /// Mark a key as critical.
    pub fn with_critical(mut self, key: impl Into<String>) -> Self {
        self.critical_keys.insert(key.into());
        self
    }

    pub fn with_weights(mut self, weights: EvidenceWeights) -> Self {
        self.weights = weights;
        self
    }

    /// The authoritative source for a namespace, if one is declared.
    pub fn authoritative_source(&self, namespace: &str) -> Option<&str> {
        self.source_priority.get(namespace).map(String::as_str)
    }

    pub fn is_critical(&self, key: &SemanticKey) -> bool {
        self.critical_keys.contains(&key.to_string())
    }
}
