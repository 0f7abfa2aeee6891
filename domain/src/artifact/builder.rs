//! Artifact builder
//!
//! The last gate of the pipeline. Every entry of the final snapshot is
//! validated against the ledger: approved claims go in, rejected claims
//! with a supported alternative are substituted (with a caveat), and
//! claims with no support at all are dropped (with a caveat). An
//! artifact can therefore never contain a rejected claim.

use super::entities::{Artifact, ArtifactClaim, Assessment, Caveat, CaveatKind};
use crate::conflict::entities::ContextConflict;
use crate::context::entities::{ContextEntry, ContextSnapshot};
use crate::core::error::DomainError;
use crate::evidence::ledger::{EvidenceLedger, GateResult};
use crate::session::entities::SessionId;

/// Builds the final artifact from a fully merged snapshot.
pub struct ArtifactBuilder<'a> {
    ledger: &'a EvidenceLedger,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(ledger: &'a EvidenceLedger) -> Self {
        Self { ledger }
    }

    /// Build the artifact.
    ///
    /// `conflicts` is the final conflict state of the session: any still
    /// `Pending` makes construction fail, since the scheduler must
    /// resolve or escalate everything first. Escalated conflicts become
    /// caveats.
    pub fn build(
        &self,
        session_id: SessionId,
        job_key: impl Into<String>,
        snapshot: &ContextSnapshot,
        conflicts: &[ContextConflict],
        mut caveats: Vec<Caveat>,
        assessment: Assessment,
    ) -> Result<Artifact, DomainError> {
        if let Some(pending) = conflicts.iter().find(|c| c.is_pending()) {
            return Err(DomainError::PendingConflict(pending.key.to_string()));
        }

        for conflict in conflicts.iter().filter(|c| c.is_escalated()) {
            caveats.push(Caveat::new(
                CaveatKind::EscalatedConflict,
                format!("conflict on `{}` left unresolved", conflict.key),
            ));
        }

        let mut claims = Vec::new();
        for entry in snapshot.entries() {
            match self.ledger.validate_refs(&entry.key, &entry.evidence) {
                GateResult::Approved => {
                    claims.push(self.claim_from(entry, None));
                }
                GateResult::RequiresAlternative { suggestion } => {
                    caveats.push(Caveat::new(
                        CaveatKind::SubstitutedClaim,
                        format!(
                            "`{}` lacked capability evidence; substituted supported claim",
                            entry.key
                        ),
                    ));
                    claims.push(self.claim_from(entry, Some(suggestion)));
                }
                GateResult::Rejected { reason } => {
                    caveats.push(Caveat::new(CaveatKind::DroppedClaim, reason));
                }
            }
        }

        Ok(Artifact {
            session_id,
            job_key: job_key.into(),
            context_version: snapshot.version(),
            claims,
            caveats,
            assessment,
        })
    }

    fn claim_from(&self, entry: &ContextEntry, substitution: Option<String>) -> ArtifactClaim {
        let substituted = substitution.is_some();
        let claim = substitution.unwrap_or_else(|| {
            // Prefer the recorded claim text; fall back to a key=value phrase
            self.ledger
                .resolve_refs(&entry.evidence)
                .first()
                .map(|r| r.claim.clone())
                .unwrap_or_else(|| format!("{} = {}", entry.key, entry.value))
        });
        ArtifactClaim {
            key: entry.key.clone(),
            value: entry.value.clone(),
            claim,
            confidence: entry.confidence,
            evidence: entry.evidence.clone(),
            substituted,
        }
    }
}
