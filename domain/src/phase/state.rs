//! Phase state machine
//!
//! `Pending → Running → {Completed | Blocked | Failed}`. The board is
//! the single place the ordering invariant lives: a phase cannot enter
//! `Running` while any declared dependency is not `Completed`, and there
//! is deliberately no override path.

use super::plan::PhasePlan;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
    /// A dependency did not complete; the phase will never run.
    Blocked,
    Failed,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseStatus::Pending => write!(f, "pending"),
            PhaseStatus::Running => write!(f, "running"),
            PhaseStatus::Completed => write!(f, "completed"),
            PhaseStatus::Blocked => write!(f, "blocked"),
            PhaseStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Tracks the status of every phase in a plan and guards transitions.
#[derive(Debug, Clone)]
pub struct PhaseBoard {
    dependencies: BTreeMap<String, Vec<String>>,
    statuses: BTreeMap<String, PhaseStatus>,
}

impl PhaseBoard {
    pub fn new(plan: &PhasePlan) -> Self {
        let mut dependencies = BTreeMap::new();
        let mut statuses = BTreeMap::new();
        for phase in plan.phases() {
            dependencies.insert(phase.name.clone(), phase.depends_on.clone());
            statuses.insert(phase.name.clone(), PhaseStatus::Pending);
        }
        Self {
            dependencies,
            statuses,
        }
    }

    pub fn status_of(&self, phase: &str) -> Option<PhaseStatus> {
        self.statuses.get(phase).copied()
    }

    pub fn statuses(&self) -> &BTreeMap<String, PhaseStatus> {
        &self.statuses
    }

    /// Start a phase. Fails with `PhaseOrderViolation` if any dependency
    /// is not `Completed`; this is a hard invariant with no override.
    pub fn mark_running(&mut self, phase: &str) -> Result<(), DomainError> {
        let deps = self
            .dependencies
            .get(phase)
            .ok_or_else(|| DomainError::UnknownPhase(phase.to_string()))?;
        for dep in deps {
            if self.statuses.get(dep) != Some(&PhaseStatus::Completed) {
                return Err(DomainError::PhaseOrderViolation {
                    phase: phase.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
        self.statuses
            .insert(phase.to_string(), PhaseStatus::Running);
        Ok(())
    }

    pub fn mark_completed(&mut self, phase: &str) {
        self.statuses
            .insert(phase.to_string(), PhaseStatus::Completed);
    }

    pub fn mark_failed(&mut self, phase: &str) {
        self.statuses.insert(phase.to_string(), PhaseStatus::Failed);
        self.block_dependents(phase);
    }

    pub fn all_completed(&self) -> bool {
        self.statuses
            .values()
            .all(|s| *s == PhaseStatus::Completed)
    }

    /// Mark every transitive dependent of a failed phase as `Blocked`.
    fn block_dependents(&mut self, failed: &str) {
        let mut frontier = vec![failed.to_string()];
        while let Some(current) = frontier.pop() {
            let dependents: Vec<String> = self
                .dependencies
                .iter()
                .filter(|(name, deps)| {
                    deps.contains(&current)
                        && self.statuses.get(*name) == Some(&PhaseStatus::Pending)
                })
                .map(|(name, _)| name.clone())
                .collect();
            for name in dependents {
                self.statuses.insert(name.clone(), PhaseStatus::Blocked);
                frontier.push(name);
            }
        }
    }
}
