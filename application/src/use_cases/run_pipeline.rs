//! Run pipeline use case
//!
//! The phase scheduler: drives the declared phase DAG, fans tasks out on
//! a bounded worker pool, funnels completions through the context store's
//! serialized merge, applies conflict resolution and corrective re-runs,
//! enforces the minimum-evidence policy, and gates the final artifact on
//! the evidence ledger.

use crate::context_store::ContextStore;
use crate::ports::artifact_sink::{ArtifactSink, NoSink};
use crate::ports::assessor::{Assessor, NeutralAssessor};
use crate::ports::investigator::{
    InvestigationInput, InvestigationReport, Investigator, ReportStatus,
};
use crate::ports::observer::{NoObserver, PipelineEvent, PipelineObserver};
use crate::ports::registry::{ExecutionRegistry, RegistryError};
use crate::use_cases::status::SessionTracker;
use inquest_domain::{
    Artifact, ArtifactBuilder, Caveat, CaveatKind, ConflictResolution, ContextEntry,
    ContextSnapshot, ContextValue, DomainError, EvidenceId, EvidenceLedger, ExecutionSession,
    HaltReason, MinimumEvidencePolicy, PhaseBoard, PhasePlan, PhaseSpec, PhaseStatus,
    ResolutionPolicy, ResolvedMerge, RetryRequest, SemanticKey, SessionId, SessionStatus,
    TaskSpec,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors that can occur while running a pipeline
#[derive(Error, Debug)]
pub enum RunPipelineError {
    /// Registry refusals, including `AlreadyRunning`
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("no investigator registered for agent kind `{0}`")]
    UnknownAgentKind(String),

    /// Phase ordering violations and other plan-level invariants
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The session lease lapsed mid-run; in-flight results were discarded
    #[error("lease expired for session {0}; in-flight results discarded")]
    LeaseExpired(String),
}

/// Input for the RunPipeline use case
#[derive(Clone)]
pub struct RunPipelineInput {
    /// Logical job key (e.g. a ticket id); one active session per key
    pub job_key: String,
    /// Seed parameters handed to every investigator
    pub params: BTreeMap<String, String>,
    pub plan: Arc<PhasePlan>,
    pub resolution: ResolutionPolicy,
    pub min_evidence: MinimumEvidencePolicy,
    /// Bounded worker pool size for tasks within a phase
    pub workers: usize,
    /// Lease renewal interval in seconds
    pub heartbeat_secs: u64,
}

impl RunPipelineInput {
    pub fn new(job_key: impl Into<String>, plan: PhasePlan) -> Self {
        Self {
            job_key: job_key.into(),
            params: BTreeMap::new(),
            plan: Arc::new(plan),
            resolution: ResolutionPolicy::new(),
            min_evidence: MinimumEvidencePolicy::default(),
            workers: 4,
            heartbeat_secs: 5,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionPolicy) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_min_evidence(mut self, policy: MinimumEvidencePolicy) -> Self {
        self.min_evidence = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    fn min_evidence_subject(&self) -> &str {
        if self.min_evidence.subject_phase.is_empty() {
            &self.plan.first_phase().name
        } else {
            &self.min_evidence.subject_phase
        }
    }
}

/// Terminal result of a pipeline run: a full artifact, or a structured
/// halt reason naming exactly what was missing.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Completed {
        session_id: SessionId,
        artifact: Artifact,
    },
    Halted {
        session_id: SessionId,
        reason: HaltReason,
    },
}

impl PipelineOutcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            PipelineOutcome::Completed { artifact, .. } => Some(artifact),
            PipelineOutcome::Halted { .. } => None,
        }
    }
}

/// Use case for running one orchestration session
pub struct RunPipelineUseCase<R: ExecutionRegistry + 'static> {
    registry: Arc<R>,
    investigators: HashMap<String, Arc<dyn Investigator>>,
    observer: Arc<dyn PipelineObserver>,
    sink: Arc<dyn ArtifactSink>,
    assessor: Arc<dyn Assessor>,
    tracker: Arc<SessionTracker>,
}

impl<R: ExecutionRegistry + 'static> RunPipelineUseCase<R> {
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            investigators: HashMap::new(),
            observer: Arc::new(NoObserver),
            sink: Arc::new(NoSink),
            assessor: Arc::new(NeutralAssessor),
            tracker: Arc::new(SessionTracker::new()),
        }
    }

    /// Register an investigator under its agent kind.
    pub fn with_investigator(mut self, investigator: Arc<dyn Investigator>) -> Self {
        self.investigators
            .insert(investigator.kind().to_string(), investigator);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_assessor(mut self, assessor: Arc<dyn Assessor>) -> Self {
        self.assessor = assessor;
        self
    }

    pub fn with_tracker(mut self, tracker: Arc<SessionTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Observability queries for this use case's sessions.
    pub fn tracker(&self) -> Arc<SessionTracker> {
        Arc::clone(&self.tracker)
    }

    /// Execute one session for the job key.
    pub async fn execute(
        &self,
        input: RunPipelineInput,
    ) -> Result<PipelineOutcome, RunPipelineError> {
        // Reject unknown agent kinds before acquiring anything
        for kind in input.plan.agent_kinds() {
            if !self.investigators.contains_key(kind) {
                return Err(RunPipelineError::UnknownAgentKind(kind.to_string()));
            }
        }

        let session_id = self.registry.acquire(&input.job_key).await?;
        info!(
            "Session {} acquired for job {}",
            session_id, input.job_key
        );
        let session =
            ExecutionSession::new(session_id.clone(), input.job_key.clone(), now_millis());
        self.tracker.session_started(session);
        self.observer.record(PipelineEvent::SessionStarted {
            session_id: session_id.to_string(),
            job_key: input.job_key.clone(),
        });

        let cancel = CancellationToken::new();
        let heartbeat = self.spawn_heartbeat(&session_id, input.heartbeat_secs, cancel.clone());

        let result = self.run_phases(&input, &session_id, &cancel).await;

        heartbeat.abort();

        match &result {
            Ok(PipelineOutcome::Completed { .. }) => {
                let _ = self
                    .registry
                    .release(&session_id, SessionStatus::Completed)
                    .await;
                self.tracker
                    .session_status(&session_id, SessionStatus::Completed);
                self.observer.record(PipelineEvent::SessionCompleted {
                    session_id: session_id.to_string(),
                });
            }
            Ok(PipelineOutcome::Halted { reason, .. }) => {
                let _ = self
                    .registry
                    .release(&session_id, SessionStatus::Halted)
                    .await;
                self.tracker
                    .session_status(&session_id, SessionStatus::Halted);
                self.observer.record(PipelineEvent::SessionHalted {
                    session_id: session_id.to_string(),
                    reason: reason.clone(),
                });
            }
            Err(_) => {
                let _ = self
                    .registry
                    .release(&session_id, SessionStatus::Failed)
                    .await;
                self.tracker
                    .session_status(&session_id, SessionStatus::Failed);
            }
        }

        result
    }

    async fn run_phases(
        &self,
        input: &RunPipelineInput,
        session_id: &SessionId,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, RunPipelineError> {
        let store = ContextStore::new();
        store.seed(seed_entries(&input.params)).await;
        let ledger = Mutex::new(EvidenceLedger::new());
        let mut board = PhaseBoard::new(&input.plan);
        let mut caveats: Vec<Caveat> = Vec::new();

        let order: Vec<PhaseSpec> = input
            .plan
            .execution_order()?
            .into_iter()
            .cloned()
            .collect();

        for phase in &order {
            board.mark_running(&phase.name)?;
            self.tracker
                .phase_status(session_id, &phase.name, PhaseStatus::Running);
            self.observer.record(PipelineEvent::PhaseStarted {
                phase: phase.name.clone(),
                tasks: phase.tasks.len(),
            });
            info!("Phase {}: {} tasks", phase.name, phase.tasks.len());

            store.interim().clear();
            let snapshot = store.latest().await;
            let results = self
                .run_phase_tasks(input, phase, &store, snapshot)
                .await;

            if cancel.is_cancelled() || !self.registry.is_current(session_id).await {
                warn!("Session {} lost its lease; discarding phase results", session_id);
                return Err(RunPipelineError::LeaseExpired(session_id.to_string()));
            }

            let mut contributions = Vec::new();
            {
                let mut ledger = ledger.lock().await;
                for (task, report) in &results {
                    if report.is_degraded() {
                        caveats.push(Caveat::new(
                            CaveatKind::DegradedTask,
                            format!(
                                "task `{}` in phase `{}` exhausted its retries",
                                task.agent_kind, phase.name
                            ),
                        ));
                    }
                    contributions
                        .extend(bind_evidence(&mut ledger, &task.agent_kind, report.clone()));
                }
            }
            // Deterministic merge order regardless of completion order
            contributions
                .sort_by(|a, b| a.source_task.cmp(&b.source_task).then(a.key.cmp(&b.key)));
            let contributed = contributions.len();

            let resolved = {
                let ledger = ledger.lock().await;
                store
                    .merge_phase(&phase.name, contributions, &input.resolution, &ledger)
                    .await
            };
            self.record_merge(session_id, &phase.name, &resolved, &store).await;

            if let Some(reason) = self.check_escalations(&input.resolution, &resolved) {
                board.mark_failed(&phase.name);
                self.tracker
                    .phase_status(session_id, &phase.name, PhaseStatus::Failed);
                return Ok(PipelineOutcome::Halted {
                    session_id: session_id.clone(),
                    reason,
                });
            }
            // One corrective round for tasks that lost a type mismatch
            if !resolved.retries.is_empty() {
                let rerun = self
                    .run_corrective_reruns(input, phase, &store, &ledger, &resolved.retries)
                    .await;
                if let Some(resolved) = rerun {
                    self.record_merge(session_id, &phase.name, &resolved, &store).await;
                    if let Some(reason) = self.check_escalations(&input.resolution, &resolved) {
                        board.mark_failed(&phase.name);
                        self.tracker
                            .phase_status(session_id, &phase.name, PhaseStatus::Failed);
                        return Ok(PipelineOutcome::Halted {
                            session_id: session_id.clone(),
                            reason,
                        });
                    }
                }
            }

            board.mark_completed(&phase.name);
            self.tracker
                .phase_status(session_id, &phase.name, PhaseStatus::Completed);
            self.observer.record(PipelineEvent::PhaseCompleted {
                phase: phase.name.clone(),
                status: PhaseStatus::Completed,
            });

            if phase.name == input.min_evidence_subject() {
                let ledger = ledger.lock().await;
                if input.min_evidence.should_halt(contributed, &ledger) {
                    let shortfalls = input.min_evidence.shortfalls(contributed, &ledger);
                    return Ok(PipelineOutcome::Halted {
                        session_id: session_id.clone(),
                        reason: HaltReason::InsufficientEvidence {
                            phase: phase.name.clone(),
                            shortfalls,
                        },
                    });
                }
            }
        }

        // All phases complete: gate the artifact on the ledger
        let snapshot = store.latest().await;
        let conflicts = store.conflicts().await;
        let ledger = ledger.lock().await;
        let assessment = self.assessor.assess(&snapshot, &ledger);
        let artifact = ArtifactBuilder::new(&ledger).build(
            session_id.clone(),
            input.job_key.clone(),
            &snapshot,
            &conflicts,
            caveats,
            assessment,
        )?;

        self.observer.record(PipelineEvent::ArtifactEmitted {
            session_id: session_id.to_string(),
            claims: artifact.claims.len(),
            caveats: artifact.caveats.len(),
        });
        self.sink.on_artifact(session_id, &artifact);

        Ok(PipelineOutcome::Completed {
            session_id: session_id.clone(),
            artifact,
        })
    }

    /// Fan a phase's tasks out on the bounded worker pool and wait for
    /// all of them. Failures and timeouts surface as degraded reports.
    async fn run_phase_tasks(
        &self,
        input: &RunPipelineInput,
        phase: &PhaseSpec,
        store: &ContextStore,
        snapshot: ContextSnapshot,
    ) -> Vec<(TaskSpec, InvestigationReport)> {
        let semaphore = Arc::new(Semaphore::new(input.workers));
        let mut join_set = JoinSet::new();

        for task in &phase.tasks {
            let investigator = Arc::clone(
                self.investigators
                    .get(&task.agent_kind)
                    .expect("agent kinds validated at submission"),
            );
            let semaphore = Arc::clone(&semaphore);
            let task = task.clone();
            let task_input = InvestigationInput {
                job_key: input.job_key.clone(),
                params: input.params.clone(),
                snapshot: snapshot.clone(),
                interim: store.interim(),
            };

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore never closed");
                let report = run_task_with_retries(&*investigator, &task, task_input).await;
                (task, report)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((task, report)) => {
                    self.observer.record(PipelineEvent::TaskCompleted {
                        phase: phase.name.clone(),
                        agent_kind: task.agent_kind.clone(),
                        status: format!("{:?}", report.status).to_lowercase(),
                        confidence: report.confidence,
                    });
                    results.push((task, report));
                }
                Err(e) => {
                    warn!("Task join error: {}", e);
                }
            }
        }
        results
    }

    /// Re-run the tasks flagged by type-mismatch resolutions, once, with
    /// the corrected values present in their input snapshot.
    async fn run_corrective_reruns(
        &self,
        input: &RunPipelineInput,
        phase: &PhaseSpec,
        store: &ContextStore,
        ledger: &Mutex<EvidenceLedger>,
        retries: &[RetryRequest],
    ) -> Option<ResolvedMerge> {
        let snapshot = store.latest().await;
        let mut seen = std::collections::BTreeSet::new();
        let mut futures = Vec::new();

        for retry in retries {
            if !seen.insert(retry.agent_kind.clone()) {
                continue;
            }
            let Some(task) = phase
                .tasks
                .iter()
                .find(|t| t.agent_kind == retry.agent_kind)
            else {
                continue;
            };
            let Some(investigator) = self.investigators.get(&retry.agent_kind) else {
                continue;
            };
            self.observer.record(PipelineEvent::CorrectiveRerun {
                phase: phase.name.clone(),
                agent_kind: retry.agent_kind.clone(),
                key: retry.key.to_string(),
            });
            debug!(
                "Corrective re-run of {} for key {}",
                retry.agent_kind, retry.key
            );

            let investigator = Arc::clone(investigator);
            let task = task.clone();
            let task_input = InvestigationInput {
                job_key: input.job_key.clone(),
                params: input.params.clone(),
                snapshot: snapshot.clone(),
                interim: store.interim(),
            };
            futures.push(async move {
                let report = run_task_with_retries(&*investigator, &task, task_input).await;
                (task, report)
            });
        }

        if futures.is_empty() {
            return None;
        }
        let results = futures::future::join_all(futures).await;

        let mut contributions = Vec::new();
        {
            let mut ledger = ledger.lock().await;
            for (task, report) in &results {
                contributions.extend(bind_evidence(&mut ledger, &task.agent_kind, report.clone()));
            }
        }
        contributions.sort_by(|a, b| a.source_task.cmp(&b.source_task).then(a.key.cmp(&b.key)));

        let ledger = ledger.lock().await;
        Some(
            store
                .merge_phase(&phase.name, contributions, &input.resolution, &ledger)
                .await,
        )
    }

    async fn record_merge(
        &self,
        session_id: &SessionId,
        phase: &str,
        resolved: &ResolvedMerge,
        store: &ContextStore,
    ) {
        self.observer.record(PipelineEvent::SnapshotMerged {
            phase: phase.to_string(),
            version: resolved.snapshot.version(),
            entries: resolved.snapshot.len(),
            conflicts: resolved.conflicts.len(),
        });
        for conflict in &resolved.conflicts {
            self.observer.record(PipelineEvent::ConflictDetected {
                key: conflict.key.to_string(),
                classification: conflict.classification,
            });
            match &conflict.resolution {
                ConflictResolution::Resolved {
                    strategy,
                    rationale,
                    ..
                } => {
                    self.observer.record(PipelineEvent::ConflictResolved {
                        key: conflict.key.to_string(),
                        strategy: strategy.as_str().to_string(),
                        rationale: rationale.clone(),
                    });
                }
                ConflictResolution::Escalated { reason } => {
                    self.observer.record(PipelineEvent::ConflictEscalated {
                        key: conflict.key.to_string(),
                        reason: reason.clone(),
                    });
                }
                ConflictResolution::Pending => {}
            }
        }
        self.tracker.record_flow(session_id, store.flow().await);
        self.tracker
            .record_conflicts(session_id, store.conflicts().await);
    }

    /// An escalated conflict on a critical key halts the session.
    fn check_escalations(
        &self,
        policy: &ResolutionPolicy,
        resolved: &ResolvedMerge,
    ) -> Option<HaltReason> {
        resolved
            .escalated()
            .find(|c| policy.is_critical(&c.key))
            .map(|c| HaltReason::CriticalConflict {
                key: c.key.to_string(),
                detail: match &c.resolution {
                    ConflictResolution::Escalated { reason } => reason.clone(),
                    _ => "escalated".to_string(),
                },
            })
    }

    fn spawn_heartbeat(
        &self,
        session_id: &SessionId,
        interval_secs: u64,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let session_id = session_id.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.tick().await; // first tick is immediate
            loop {
                interval.tick().await;
                if registry.heartbeat(&session_id).await.is_err() {
                    warn!("Heartbeat failed for session {}", session_id);
                    cancel.cancel();
                    break;
                }
            }
        })
    }
}

/// Run one task with its retry policy: each attempt is bounded by the
/// task timeout; the first failure is retried with the same input, and a
/// second failure degrades the contribution instead of failing the phase.
async fn run_task_with_retries(
    investigator: &dyn Investigator,
    task: &TaskSpec,
    input: InvestigationInput,
) -> InvestigationReport {
    for attempt in 1..=task.retry.max_attempts() {
        match tokio::time::timeout(task.timeout(), investigator.investigate(input.clone())).await
        {
            Ok(Ok(report)) if report.status != ReportStatus::Failed => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", task.agent_kind, attempt);
                }
                return report;
            }
            Ok(Ok(_)) => {
                warn!("{} reported failure (attempt {})", task.agent_kind, attempt);
            }
            Ok(Err(e)) => {
                warn!("{} failed: {} (attempt {})", task.agent_kind, e, attempt);
            }
            Err(_) => {
                warn!(
                    "{} timed out after {}s (attempt {})",
                    task.agent_kind, task.timeout_secs, attempt
                );
            }
        }
    }
    InvestigationReport::degraded()
}

/// Record a report's evidence drafts and bind the assigned ids to its
/// findings by key. The report-level confidence caps each finding's own.
fn bind_evidence(
    ledger: &mut EvidenceLedger,
    agent_kind: &str,
    report: InvestigationReport,
) -> Vec<ContextEntry> {
    let mut ids_by_key: BTreeMap<SemanticKey, Vec<EvidenceId>> = BTreeMap::new();
    for draft in report.evidence {
        let key = draft.key.clone();
        let id = ledger.record(draft, agent_kind);
        ids_by_key.entry(key).or_default().push(id);
    }

    report
        .findings
        .into_iter()
        .map(|mut finding| {
            if let Some(ids) = ids_by_key.get(&finding.key) {
                for id in ids {
                    if !finding.evidence.contains(id) {
                        finding.evidence.push(*id);
                    }
                }
            }
            let confidence = finding.confidence.min(report.confidence);
            finding.with_confidence(confidence)
        })
        .collect()
}

fn seed_entries(params: &BTreeMap<String, String>) -> Vec<ContextEntry> {
    params
        .iter()
        .map(|(name, value)| {
            ContextEntry::new(
                SemanticKey::new("job", name),
                ContextValue::Text(value.clone()),
                "submission",
            )
        })
        .collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::investigator::InvestigatorError;
    use async_trait::async_trait;
    use inquest_domain::{EvidenceDraft, EvidenceKind};
    use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    // ==================== Stubs ====================

    struct StubRegistry {
        active: StdMutex<HashMap<String, String>>,
        counter: AtomicU64,
        revoked: AtomicBool,
    }

    impl StubRegistry {
        fn new() -> Self {
            Self {
                active: StdMutex::new(HashMap::new()),
                counter: AtomicU64::new(0),
                revoked: AtomicBool::new(false),
            }
        }

        fn occupy(&self, job_key: &str) {
            self.active
                .lock()
                .unwrap()
                .insert(job_key.to_string(), "sess-other".to_string());
        }

        /// Simulate lease expiry: every session stops being current.
        fn revoke_leases(&self) {
            self.revoked.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ExecutionRegistry for StubRegistry {
        async fn acquire(&self, job_key: &str) -> Result<SessionId, RegistryError> {
            let mut active = self.active.lock().unwrap();
            if active.contains_key(job_key) {
                return Err(RegistryError::AlreadyRunning {
                    job_key: job_key.to_string(),
                });
            }
            let id = format!("sess-{}", self.counter.fetch_add(1, Ordering::SeqCst));
            active.insert(job_key.to_string(), id.clone());
            Ok(SessionId::new(id))
        }

        async fn heartbeat(&self, _session: &SessionId) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn release(
            &self,
            session: &SessionId,
            _status: SessionStatus,
        ) -> Result<(), RegistryError> {
            self.active
                .lock()
                .unwrap()
                .retain(|_, v| v != session.as_str());
            Ok(())
        }

        async fn is_current(&self, session: &SessionId) -> bool {
            if self.revoked.load(Ordering::SeqCst) {
                return false;
            }
            self.active
                .lock()
                .unwrap()
                .values()
                .any(|v| v == session.as_str())
        }

        async fn session(&self, _session: &SessionId) -> Option<ExecutionSession> {
            None
        }
    }

    struct StubInvestigator {
        kind: String,
        findings: Vec<(String, ContextValue, f64)>,
        evidence: Vec<(String, String, EvidenceKind)>,
        hang: bool,
        calls: Arc<AtomicU32>,
        seen_keys: Arc<StdMutex<Vec<String>>>,
    }

    impl StubInvestigator {
        fn new(kind: &str) -> Self {
            Self {
                kind: kind.to_string(),
                findings: Vec::new(),
                evidence: Vec::new(),
                hang: false,
                calls: Arc::new(AtomicU32::new(0)),
                seen_keys: Arc::new(StdMutex::new(Vec::new())),
            }
        }

        fn finding(mut self, key: &str, value: ContextValue) -> Self {
            self.findings.push((key.to_string(), value, 1.0));
            self
        }

        fn evidence(mut self, claim: &str, key: &str, kind: EvidenceKind) -> Self {
            self.evidence
                .push((claim.to_string(), key.to_string(), kind));
            self
        }

        fn hanging(mut self) -> Self {
            self.hang = true;
            self
        }

        fn calls(&self) -> Arc<AtomicU32> {
            Arc::clone(&self.calls)
        }

        fn seen_keys(&self) -> Arc<StdMutex<Vec<String>>> {
            Arc::clone(&self.seen_keys)
        }
    }

    #[async_trait]
    impl Investigator for StubInvestigator {
        fn kind(&self) -> &str {
            &self.kind
        }

        async fn investigate(
            &self,
            input: InvestigationInput,
        ) -> Result<InvestigationReport, InvestigatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_keys
                .lock()
                .unwrap()
                .extend(input.snapshot.keys().map(|k| k.to_string()));

            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            let findings = self
                .findings
                .iter()
                .map(|(key, value, confidence)| {
                    ContextEntry::new(key.parse().unwrap(), value.clone(), &self.kind)
                        .with_confidence(*confidence)
                })
                .collect();
            let evidence = self
                .evidence
                .iter()
                .map(|(claim, key, kind)| {
                    EvidenceDraft::new(claim, key.parse().unwrap(), "ref://stub", *kind)
                })
                .collect();
            Ok(InvestigationReport::done(findings, evidence))
        }
    }

    fn single_phase(tasks: Vec<TaskSpec>) -> PhasePlan {
        PhasePlan::new(vec![PhaseSpec {
            name: "discovery".to_string(),
            depends_on: vec![],
            tasks,
        }])
        .unwrap()
    }

    fn flag(value: bool) -> ContextValue {
        ContextValue::Flag(value)
    }

    fn text(value: &str) -> ContextValue {
        ContextValue::Text(value.to_string())
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_single_phase_produces_gated_artifact() {
        let registry = Arc::new(StubRegistry::new());
        let miner = StubInvestigator::new("ticket-miner")
            .finding("ticket.owner", text("infra"))
            .evidence("owner is infra", "ticket.owner", EvidenceKind::Implementation);

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(miner));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![TaskSpec::new("ticket-miner", 30)]),
        );

        let outcome = use_case.execute(input.clone()).await.unwrap();
        let artifact = outcome.artifact().expect("should complete");
        assert_eq!(artifact.claims.len(), 1);
        assert_eq!(artifact.claims[0].claim, "owner is infra");
        assert!(!artifact.claims[0].substituted);

        // Slot released on completion: the same job key can run again
        assert!(use_case.execute(input).await.is_ok());
    }

    #[tokio::test]
    async fn test_already_running_is_reported_immediately() {
        let registry = Arc::new(StubRegistry::new());
        registry.occupy("OPS-1431");

        let miner = StubInvestigator::new("ticket-miner").finding("a.b", text("x"));
        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(miner));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![TaskSpec::new("ticket-miner", 30)]),
        );

        let err = use_case.execute(input).await.unwrap_err();
        match err {
            RunPipelineError::Registry(e) => assert!(e.is_already_running()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_agent_kind_rejected_before_acquire() {
        let registry = Arc::new(StubRegistry::new());
        let use_case: RunPipelineUseCase<StubRegistry> =
            RunPipelineUseCase::new(Arc::clone(&registry));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![TaskSpec::new("ghost", 30)]),
        );

        let err = use_case.execute(input).await.unwrap_err();
        assert!(matches!(err, RunPipelineError::UnknownAgentKind(k) if k == "ghost"));
        // Nothing was acquired
        assert!(registry.active.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_name_in_different_namespaces_never_conflicts() {
        let registry = Arc::new(StubRegistry::new());
        let miner = StubInvestigator::new("ticket-miner")
            .finding("ticket.targetVersion", text("2.15"))
            .evidence("target is 2.15", "ticket.targetVersion", EvidenceKind::Implementation);
        let probe = StubInvestigator::new("cluster-probe")
            .finding("env.targetVersion", text("2.14"))
            .evidence("env runs 2.14", "env.targetVersion", EvidenceKind::Implementation);

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(miner))
            .with_investigator(Arc::new(probe));
        let tracker = use_case.tracker();
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![
                TaskSpec::new("ticket-miner", 30),
                TaskSpec::new("cluster-probe", 30),
            ]),
        );

        let outcome = use_case.execute(input).await.unwrap();
        let artifact = outcome.artifact().unwrap();
        assert_eq!(artifact.claims.len(), 2);

        let session_id = match &outcome {
            PipelineOutcome::Completed { session_id, .. } => session_id.clone(),
            _ => unreachable!(),
        };
        assert!(tracker.conflicts(&session_id).is_empty());
    }

    #[tokio::test]
    async fn test_evidence_strength_decides_deployment_status() {
        let registry = Arc::new(StubRegistry::new());
        let probe = StubInvestigator::new("cluster-probe")
            .finding("deploy.deploymentStatus", flag(true))
            .evidence("observed live", "deploy.deploymentStatus", EvidenceKind::Deployment);
        let diff = StubInvestigator::new("diff-analyzer")
            .finding("deploy.deploymentStatus", flag(false))
            .evidence("gated off in source", "deploy.deploymentStatus", EvidenceKind::Implementation)
            .evidence("rollout config absent", "deploy.deploymentStatus", EvidenceKind::Implementation);

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(probe))
            .with_investigator(Arc::new(diff));
        let tracker = use_case.tracker();
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![
                TaskSpec::new("cluster-probe", 30),
                TaskSpec::new("diff-analyzer", 30),
            ]),
        );

        let outcome = use_case.execute(input).await.unwrap();
        let artifact = outcome.artifact().unwrap();
        let claim = artifact
            .claim_for(&"deploy.deploymentStatus".parse().unwrap())
            .unwrap();
        assert_eq!(claim.value, flag(false));

        let session_id = match &outcome {
            PipelineOutcome::Completed { session_id, .. } => session_id.clone(),
            _ => unreachable!(),
        };
        let conflicts = tracker.conflicts(&session_id);
        assert_eq!(conflicts.len(), 1);
        match &conflicts[0].resolution {
            ConflictResolution::Resolved { winner, rationale, .. } => {
                assert_eq!(winner, "diff-analyzer");
                assert!(rationale.contains("strength"));
            }
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_timeout_degrades_task_but_phase_completes() {
        let registry = Arc::new(StubRegistry::new());
        let hanging = StubInvestigator::new("cluster-probe").hanging();
        let hanging_calls = hanging.calls();
        let miner = StubInvestigator::new("ticket-miner")
            .finding("ticket.owner", text("infra"))
            .evidence("owner is infra", "ticket.owner", EvidenceKind::Implementation);

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(hanging))
            .with_investigator(Arc::new(miner));
        let tracker = use_case.tracker();
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![
                TaskSpec::new("cluster-probe", 1),
                TaskSpec::new("ticket-miner", 30),
            ]),
        );

        let outcome = use_case.execute(input).await.unwrap();
        // One attempt plus one retry, then degraded
        assert_eq!(hanging_calls.load(Ordering::SeqCst), 2);

        let artifact = outcome.artifact().expect("phase should still complete");
        assert!(artifact.has_caveat(CaveatKind::DegradedTask));

        let session_id = match &outcome {
            PipelineOutcome::Completed { session_id, .. } => session_id.clone(),
            _ => unreachable!(),
        };
        let view = tracker.status(&session_id).unwrap();
        assert_eq!(view.phases.get("discovery"), Some(&PhaseStatus::Completed));
        assert_eq!(view.session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn test_hopeless_first_phase_halts_with_all_three_conditions() {
        let registry = Arc::new(StubRegistry::new());
        // Investigator finds nothing at all
        let miner = StubInvestigator::new("ticket-miner");

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(miner));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![TaskSpec::new("ticket-miner", 30)]),
        );

        let outcome = use_case.execute(input).await.unwrap();
        match outcome {
            PipelineOutcome::Halted { reason, .. } => match reason {
                HaltReason::InsufficientEvidence { phase, shortfalls } => {
                    assert_eq!(phase, "discovery");
                    assert_eq!(shortfalls.len(), 3);
                }
                other => panic!("unexpected halt reason: {:?}", other),
            },
            PipelineOutcome::Completed { .. } => panic!("should have halted"),
        }
    }

    #[tokio::test]
    async fn test_escalated_conflict_on_critical_key_halts() {
        let registry = Arc::new(StubRegistry::new());
        // Same key, same domain, no evidence on either side: a tie
        let probe = StubInvestigator::new("cluster-probe")
            .finding("deploy.status", flag(true))
            .evidence("seen", "deploy.other", EvidenceKind::Implementation);
        let diff = StubInvestigator::new("diff-analyzer")
            .finding("deploy.status", flag(false))
            .evidence("read", "deploy.other2", EvidenceKind::Implementation);

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(probe))
            .with_investigator(Arc::new(diff));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![
                TaskSpec::new("cluster-probe", 30),
                TaskSpec::new("diff-analyzer", 30),
            ]),
        )
        .with_resolution(ResolutionPolicy::new().with_critical("deploy.status"));

        let outcome = use_case.execute(input).await.unwrap();
        match outcome {
            PipelineOutcome::Halted { reason, .. } => {
                assert!(matches!(reason, HaltReason::CriticalConflict { key, .. } if key == "deploy.status"));
            }
            PipelineOutcome::Completed { .. } => panic!("critical escalation must halt"),
        }
    }

    #[tokio::test]
    async fn test_type_mismatch_triggers_one_corrective_rerun() {
        let registry = Arc::new(StubRegistry::new());
        let foundation = StubInvestigator::new("foundation")
            .finding("deploy.version", text("2.15"))
            .evidence("version pinned in source", "deploy.version", EvidenceKind::Implementation);
        let guesser = StubInvestigator::new("guesser").finding("deploy.version", ContextValue::Number(2.0));
        let guesser_calls = guesser.calls();

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(foundation))
            .with_investigator(Arc::new(guesser));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![
                TaskSpec::new("foundation", 30),
                TaskSpec::new("guesser", 30),
            ]),
        )
        .with_resolution(ResolutionPolicy::new().with_priority("deploy", "foundation"));

        let outcome = use_case.execute(input).await.unwrap();
        // Initial run plus exactly one corrective re-run
        assert_eq!(guesser_calls.load(Ordering::SeqCst), 2);

        let artifact = outcome.artifact().unwrap();
        let claim = artifact.claim_for(&"deploy.version".parse().unwrap()).unwrap();
        assert_eq!(claim.value, text("2.15"));
    }

    #[tokio::test]
    async fn test_lost_lease_discards_phase_results() {
        let registry = Arc::new(StubRegistry::new());
        let miner = StubInvestigator::new("ticket-miner")
            .finding("ticket.owner", text("infra"))
            .evidence("owner is infra", "ticket.owner", EvidenceKind::Implementation);

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(miner));
        let input = RunPipelineInput::new(
            "OPS-1431",
            single_phase(vec![TaskSpec::new("ticket-miner", 30)]),
        );

        // The lease lapses while the phase is in flight; the completed
        // task results must not be merged or turned into an artifact.
        registry.revoke_leases();
        let err = use_case.execute(input).await.unwrap_err();
        assert!(matches!(err, RunPipelineError::LeaseExpired(_)));
    }

    #[tokio::test]
    async fn test_later_phase_sees_earlier_phase_context() {
        let registry = Arc::new(StubRegistry::new());
        let miner = StubInvestigator::new("ticket-miner")
            .finding("ticket.owner", text("infra"))
            .evidence("owner is infra", "ticket.owner", EvidenceKind::Implementation);
        let analyzer = StubInvestigator::new("diff-analyzer")
            .finding("diff.touched", text("gateway"))
            .evidence("gateway changed", "diff.touched", EvidenceKind::Implementation);
        let seen = analyzer.seen_keys();

        let plan = PhasePlan::new(vec![
            PhaseSpec::new("discovery").with_task(TaskSpec::new("ticket-miner", 30)),
            PhaseSpec::new("analysis")
                .depends_on("discovery")
                .with_task(TaskSpec::new("diff-analyzer", 30)),
        ])
        .unwrap();

        let use_case = RunPipelineUseCase::new(Arc::clone(&registry))
            .with_investigator(Arc::new(miner))
            .with_investigator(Arc::new(analyzer));
        let input = RunPipelineInput::new("OPS-1431", plan);

        let outcome = use_case.execute(input).await.unwrap();
        assert!(outcome.artifact().is_some());
        assert!(seen
            .lock()
            .unwrap()
            .contains(&"ticket.owner".to_string()));
    }
}
