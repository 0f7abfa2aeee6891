//! In-memory lease-based execution registry
//!
//! Enforces one active session per job key within a process. Leases are
//! wall-clock bound: a session that stops heartbeating (crash, hang)
//! loses its slot once the lease lapses, and the next `acquire` reclaims
//! it instead of blocking forever. A reclaimed session's `is_current`
//! turns false, which is what makes the scheduler discard its in-flight
//! merge rather than contaminate the successor's context chain.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use inquest_application::ports::registry::{ExecutionRegistry, RegistryError};
use inquest_domain::{ExecutionSession, SessionId, SessionStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{info, warn};

struct Lease {
    session: ExecutionSession,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    /// Active leases, keyed by job key
    leases: HashMap<String, Lease>,
    /// Terminal sessions kept for observability queries
    terminal: HashMap<String, ExecutionSession>,
}

/// Lease-based registry for a single process.
pub struct InMemoryRegistry {
    lease_timeout: Duration,
    counter: AtomicU64,
    inner: Mutex<RegistryInner>,
}

impl InMemoryRegistry {
    pub fn new(lease_timeout_secs: u64) -> Self {
        Self {
            lease_timeout: Duration::seconds(lease_timeout_secs as i64),
            counter: AtomicU64::new(1),
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    fn next_session_id(&self) -> SessionId {
        SessionId::new(format!(
            "sess-{:06}",
            self.counter.fetch_add(1, Ordering::SeqCst)
        ))
    }

    fn now_millis() -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

#[async_trait]
impl ExecutionRegistry for InMemoryRegistry {
    async fn acquire(&self, job_key: &str) -> Result<SessionId, RegistryError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;

        if let Some(lease) = inner.leases.get(job_key) {
            if lease.expires_at > now {
                return Err(RegistryError::AlreadyRunning {
                    job_key: job_key.to_string(),
                });
            }
            // Expired lease: reclaim the slot
            warn!(
                "Reclaiming expired lease for job {} (session {})",
                job_key, lease.session.session_id
            );
            let stale = inner
                .leases
                .remove(job_key)
                .expect("lease present under job key");
            inner.terminal.insert(
                stale.session.session_id.as_str().to_string(),
                stale.session.with_status(SessionStatus::Failed),
            );
        }

        let session_id = self.next_session_id();
        let session = ExecutionSession::new(session_id.clone(), job_key, Self::now_millis());
        info!("Session {} acquired for job {}", session_id, job_key);
        inner.leases.insert(
            job_key.to_string(),
            Lease {
                session,
                expires_at: now + self.lease_timeout,
            },
        );
        Ok(session_id)
    }

    async fn heartbeat(&self, session: &SessionId) -> Result<(), RegistryError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;

        let Some(job_key) = inner
            .leases
            .iter()
            .find(|(_, l)| &l.session.session_id == session)
            .map(|(k, _)| k.clone())
        else {
            return Err(RegistryError::UnknownSession(session.to_string()));
        };

        let expired = inner
            .leases
            .get(&job_key)
            .map(|l| l.expires_at <= now)
            .unwrap_or(true);
        if expired {
            if let Some(stale) = inner.leases.remove(&job_key) {
                inner.terminal.insert(
                    stale.session.session_id.as_str().to_string(),
                    stale.session.with_status(SessionStatus::Failed),
                );
            }
            return Err(RegistryError::LeaseExpired(session.to_string()));
        }

        if let Some(lease) = inner.leases.get_mut(&job_key) {
            lease.expires_at = now + self.lease_timeout;
        }
        Ok(())
    }

    async fn release(
        &self,
        session: &SessionId,
        status: SessionStatus,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().await;
        let Some(job_key) = inner
            .leases
            .iter()
            .find(|(_, l)| &l.session.session_id == session)
            .map(|(k, _)| k.clone())
        else {
            return Err(RegistryError::UnknownSession(session.to_string()));
        };

        let lease = inner
            .leases
            .remove(&job_key)
            .expect("lease present under job key");
        inner.terminal.insert(
            session.as_str().to_string(),
            lease.session.with_status(status),
        );
        Ok(())
    }

    async fn is_current(&self, session: &SessionId) -> bool {
        let now = Utc::now();
        let inner = self.inner.lock().await;
        inner
            .leases
            .values()
            .any(|l| &l.session.session_id == session && l.expires_at > now)
    }

    async fn session(&self, session: &SessionId) -> Option<ExecutionSession> {
        let inner = self.inner.lock().await;
        inner
            .leases
            .values()
            .find(|l| &l.session.session_id == session)
            .map(|l| l.session.clone())
            .or_else(|| inner.terminal.get(session.as_str()).cloned())
    }
}
