//! Context store
//!
//! Owns the version chain of merged snapshots for one session. All
//! merges are funnelled through a single serialized writer (one internal
//! mutex held across merge, resolution and publication), so concurrent
//! task completions never race on a snapshot version and readers only
//! ever observe fully merged, conflict-resolved-or-annotated snapshots.
//!
//! The interim board is the deliberately weaker side channel: tasks
//! still running within a phase may publish partial entries for their
//! peers to poll. Entries on the board are advisory and never merge
//! into the chain directly, which keeps the single-writer property.

use inquest_domain::{
    merge, ConflictResolver, ContextConflict, ContextEntry, ContextSnapshot, EvidenceLedger,
    ResolutionPolicy, ResolvedMerge, SemanticKey,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

/// Summary of one published snapshot version, for observability queries.
#[derive(Debug, Clone, Serialize)]
pub struct ContextFlowEntry {
    pub phase: String,
    pub version: u64,
    pub entries: usize,
    pub conflicts: usize,
}

struct PublishedVersion {
    phase: String,
    snapshot: ContextSnapshot,
    conflicts: Vec<ContextConflict>,
}

/// Serialized-writer store of the session's context chain.
pub struct ContextStore {
    inner: Mutex<Vec<PublishedVersion>>,
    interim: InterimBoard,
}

impl ContextStore {
    /// Label of the seed version every chain starts from.
    pub const FOUNDATION: &'static str = "foundation";

    pub fn new() -> Self {
        Self {
            inner: Mutex::new(vec![PublishedVersion {
                phase: Self::FOUNDATION.to_string(),
                snapshot: ContextSnapshot::empty(),
                conflicts: Vec::new(),
            }]),
            interim: InterimBoard::new(),
        }
    }

    /// Seed the foundation with the job's initial parameters.
    pub async fn seed(&self, entries: Vec<ContextEntry>) {
        let mut chain = self.inner.lock().await;
        let base = chain.last().expect("chain is never empty").snapshot.clone();
        let outcome = merge(&base, entries);
        chain.push(PublishedVersion {
            phase: Self::FOUNDATION.to_string(),
            snapshot: outcome.snapshot,
            conflicts: outcome.conflicts,
        });
    }

    /// Latest published snapshot.
    pub async fn latest(&self) -> ContextSnapshot {
        let chain = self.inner.lock().await;
        chain.last().expect("chain is never empty").snapshot.clone()
    }

    /// Point-in-time snapshot as of the given phase (its last published
    /// version). Callers never observe a partially merged phase.
    pub async fn snapshot_as_of(&self, phase: &str) -> Option<ContextSnapshot> {
        let chain = self.inner.lock().await;
        chain
            .iter()
            .rev()
            .find(|v| v.phase == phase)
            .map(|v| v.snapshot.clone())
    }

    /// Merge a phase's contributions, resolve the resulting conflicts,
    /// and publish the new version as one atomic step under the writer
    /// lock.
    pub async fn merge_phase(
        &self,
        phase: &str,
        contributions: Vec<ContextEntry>,
        policy: &ResolutionPolicy,
        ledger: &EvidenceLedger,
    ) -> ResolvedMerge {
        let mut chain = self.inner.lock().await;
        let base = chain.last().expect("chain is never empty").snapshot.clone();
        let outcome = merge(&base, contributions);
        let resolved = ConflictResolver::new(policy, ledger).resolve(outcome);
        chain.push(PublishedVersion {
            phase: phase.to_string(),
            snapshot: resolved.snapshot.clone(),
            conflicts: resolved.conflicts.clone(),
        });
        resolved
    }

    /// The version chain, oldest first.
    pub async fn flow(&self) -> Vec<ContextFlowEntry> {
        let chain = self.inner.lock().await;
        chain
            .iter()
            .map(|v| ContextFlowEntry {
                phase: v.phase.clone(),
                version: v.snapshot.version(),
                entries: v.snapshot.len(),
                conflicts: v.conflicts.len(),
            })
            .collect()
    }

    /// Every conflict raised over the session, oldest first.
    pub async fn conflicts(&self) -> Vec<ContextConflict> {
        let chain = self.inner.lock().await;
        chain.iter().flat_map(|v| v.conflicts.clone()).collect()
    }

    pub fn interim(&self) -> InterimBoard {
        self.interim.clone()
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared board of partial entries published by still-running tasks.
///
/// Reads are a non-blocking poll rather than a rendezvous: a task that
/// never completes cannot deadlock its peers.
#[derive(Clone)]
pub struct InterimBoard {
    entries: Arc<RwLock<BTreeMap<SemanticKey, ContextEntry>>>,
}

impl InterimBoard {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Publish a partial entry for peers in the same phase.
    pub fn publish(&self, entry: ContextEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entry.key.clone(), entry);
        }
    }

    /// Current partial entries. Never blocks on a publisher.
    pub fn poll(&self) -> Vec<ContextEntry> {
        self.entries
            .read()
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &SemanticKey) -> Option<ContextEntry> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Drop all partial entries (called between phases).
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl Default for InterimBoard {
    fn default() -> Self {
        Self::new()
    }
}
