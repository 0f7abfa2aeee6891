//! Observability queries
//!
//! Pull-based, read-only views over running and finished sessions. The
//! scheduler writes through crate-private methods; external callers only
//! get the query surface, which satisfies the zero-interference
//! requirement by construction.

use crate::context_store::ContextFlowEntry;
use inquest_domain::{ContextConflict, ExecutionSession, PhaseStatus, SessionId, SessionStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Status view of one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: ExecutionSession,
    pub phases: BTreeMap<String, PhaseStatus>,
}

#[derive(Default)]
struct Tracked {
    session: Option<ExecutionSession>,
    phases: BTreeMap<String, PhaseStatus>,
    flow: Vec<ContextFlowEntry>,
    conflicts: Vec<ContextConflict>,
}

/// Shared read view over sessions, maintained by the scheduler.
#[derive(Default)]
pub struct SessionTracker {
    inner: RwLock<HashMap<String, Tracked>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of a session and its phases.
    pub fn status(&self, session: &SessionId) -> Option<SessionView> {
        let inner = self.inner.read().ok()?;
        let tracked = inner.get(session.as_str())?;
        Some(SessionView {
            session: tracked.session.clone()?,
            phases: tracked.phases.clone(),
        })
    }

    /// The session's context version chain, oldest first.
    pub fn context_flow(&self, session: &SessionId) -> Vec<ContextFlowEntry> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.get(session.as_str()).map(|t| t.flow.clone()))
            .unwrap_or_default()
    }

    /// Every conflict raised during the session, oldest first.
    pub fn conflicts(&self, session: &SessionId) -> Vec<ContextConflict> {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.get(session.as_str()).map(|t| t.conflicts.clone()))
            .unwrap_or_default()
    }

    // ==================== Scheduler-side writers ====================

    pub(crate) fn session_started(&self, session: ExecutionSession) {
        if let Ok(mut inner) = self.inner.write() {
            let key = session.session_id.as_str().to_string();
            inner
                .entry(key)
                .or_default()
                .session = Some(session);
        }
    }

    pub(crate) fn session_status(&self, session: &SessionId, status: SessionStatus) {
        if let Ok(mut inner) = self.inner.write()
            && let Some(tracked) = inner.get_mut(session.as_str())
            && let Some(s) = tracked.session.as_mut()
        {
            s.status = status;
        }
    }

    pub(crate) fn phase_status(&self, session: &SessionId, phase: &str, status: PhaseStatus) {
        if let Ok(mut inner) = self.inner.write()
            && let Some(tracked) = inner.get_mut(session.as_str())
        {
            tracked.phases.insert(phase.to_string(), status);
        }
    }

    pub(crate) fn record_flow(&self, session: &SessionId, flow: Vec<ContextFlowEntry>) {
        if let Ok(mut inner) = self.inner.write()
            && let Some(tracked) = inner.get_mut(session.as_str())
        {
            tracked.flow = flow;
        }
    }

    pub(crate) fn record_conflicts(&self, session: &SessionId, conflicts: Vec<ContextConflict>) {
        if let Ok(mut inner) = self.inner.write()
            && let Some(tracked) = inner.get_mut(session.as_str())
        {
            tracked.conflicts = conflicts;
        }
    }
}
