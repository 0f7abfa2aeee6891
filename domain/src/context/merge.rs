//! Snapshot merge
//!
//! Merging never overwrites: an accepted entry stays provisional until a
//! conflict against it is resolved. Identical values from different tasks
//! corroborate each other instead of conflicting (evidence refs are
//! unioned and the higher confidence kept).

use super::entities::{ContextEntry, ContextSnapshot};
use crate::conflict::entities::ContextConflict;

/// Result of merging task contributions into a snapshot.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// New snapshot with non-conflicting contributions applied. For
    /// conflicting keys the prior value remains provisional.
    pub snapshot: ContextSnapshot,
    /// Conflicts raised by this merge, all `Pending`.
    pub conflicts: Vec<ContextConflict>,
}

/// Merge `contributions` into `base`, producing the next snapshot version.
///
/// For each incoming entry:
/// - unknown key, no alias: insert
/// - known key, identical value: corroborate (union evidence, max confidence)
/// - known key, differing value: raise a conflict, keep the prior value
/// - alias of an existing key: raise a `SemanticAlias` conflict
pub fn merge(base: &ContextSnapshot, contributions: Vec<ContextEntry>) -> MergeOutcome {
    let mut entries = base.entry_map().clone();
    let mut conflicts = Vec::new();

    for incoming in contributions {
        if let Some(prior) = entries.get(&incoming.key) {
            if prior.value == incoming.value {
                let corroborated = corroborate(prior.clone(), incoming);
                entries.insert(corroborated.key.clone(), corroborated);
            } else {
                conflicts.push(ContextConflict::between(prior.clone(), incoming));
            }
            continue;
        }

        // Alias check: an existing key in the same namespace whose label
        // normalizes to the same concept.
        let alias = entries
            .keys()
            .find(|k| k.is_alias_of(&incoming.key))
            .cloned();
        if let Some(alias_key) = alias {
            let existing = entries
                .get(&alias_key)
                .expect("alias key came from the map")
                .clone();
            conflicts.push(ContextConflict::alias(existing, incoming));
            continue;
        }

        entries.insert(incoming.key.clone(), incoming);
    }

    MergeOutcome {
        snapshot: ContextSnapshot::from_parts(base.version() + 1, entries),
        conflicts,
    }
}

/// Merge an agreeing duplicate into the accepted entry.
pub(crate) fn corroborate(mut accepted: ContextEntry, agreeing: ContextEntry) -> ContextEntry {
    for id in agreeing.evidence {
        if !accepted.evidence.contains(&id) {
            accepted.evidence.push(id);
        }
    }
    accepted.confidence = accepted.confidence.max(agreeing.confidence);
    accepted
}
