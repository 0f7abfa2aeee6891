//! Phase plan validation and ordering
//!
//! A plan is the declared DAG of phases. Validation happens once at
//! construction: duplicate names, unknown dependencies and cycles are all
//! configuration errors, rejected before anything runs.

use super::entities::PhaseSpec;
use crate::core::error::DomainError;
use std::collections::BTreeSet;

/// Validated, immutable phase DAG.
#[derive(Debug, Clone)]
pub struct PhasePlan {
    phases: Vec<PhaseSpec>,
}

impl PhasePlan {
    /// Validate and build a plan from declared phases.
    pub fn new(phases: Vec<PhaseSpec>) -> Result<Self, DomainError> {
        if phases.is_empty() {
            return Err(DomainError::EmptyPlan);
        }

        let mut names = BTreeSet::new();
        for phase in &phases {
            if !names.insert(phase.name.as_str()) {
                return Err(DomainError::DuplicatePhase(phase.name.clone()));
            }
        }

        for phase in &phases {
            for dep in &phase.depends_on {
                if !names.contains(dep.as_str()) {
                    return Err(DomainError::UnknownDependency {
                        phase: phase.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let plan = Self { phases };
        plan.execution_order()?;
        Ok(plan)
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    pub fn get(&self, name: &str) -> Option<&PhaseSpec> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// First phase in declaration order, the subject of the default
    /// minimum-evidence policy.
    pub fn first_phase(&self) -> &PhaseSpec {
        &self.phases[0]
    }

    /// All agent kinds referenced anywhere in the plan.
    pub fn agent_kinds(&self) -> BTreeSet<&str> {
        self.phases
            .iter()
            .flat_map(|p| p.tasks.iter().map(|t| t.agent_kind.as_str()))
            .collect()
    }

    /// Topological execution order, stable with respect to declaration
    /// order. Fails with `DependencyCycle` on a cyclic declaration.
    pub fn execution_order(&self) -> Result<Vec<&PhaseSpec>, DomainError> {
        let mut order = Vec::with_capacity(self.phases.len());
        let mut done: BTreeSet<&str> = BTreeSet::new();

        while order.len() < self.phases.len() {
            // Take the first declared phase whose dependencies are all done
            let next = self.phases.iter().find(|p| {
                !done.contains(p.name.as_str())
                    && p.depends_on.iter().all(|d| done.contains(d.as_str()))
            });
            match next {
                Some(phase) => {
                    done.insert(phase.name.as_str());
                    order.push(phase);
                }
                None => {
                    let stuck = self
                        .phases
                        .iter()
                        .find(|p| !done.contains(p.name.as_str()))
                        .expect("some phase is unordered");
                    return Err(DomainError::DependencyCycle(stuck.name.clone()));
                }
            }
        }

        Ok(order)
    }
}
