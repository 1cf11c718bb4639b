//! Generation orchestrator: admits jobs and drives their file pipelines.
//!
//! Each job runs as its own tokio task and processes its manifest strictly
//! in order, one file at a time — later files may assume conventions the
//! earlier ones established, and subscribers get a single monotonically
//! advancing progress signal. Jobs are independent of each other; the only
//! shared mutable state is the credit ledger and the history store, both
//! internally synchronized.
//!
//! Admission (validation + credit debit) is synchronous: a request that
//! fails validation or affordability is rejected before any file leaves
//! `Pending` and no task is spawned. Everything after admission is
//! observable only through [`JobEvent`]s and snapshots.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use vizcode_core::types::{AccountId, JobId, Timestamp};
use vizcode_core::{
    sync, Artifact, CoreError, CreditLedger, FileKind, FileSpec, FileStatus, GenerationJob,
    HistoryEntry, HistoryStore, JobRequest, JobStatus, ModelDescriptor, ModelRegistry,
    RefundPolicy,
};
use vizcode_events::{EventBus, JobEvent, JobEventKind};

use crate::backend::GenerationBackend;

/// How long to wait for a job task to exit during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Orchestrator tunables.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Ceiling for a single file's generation step. A timeout is treated
    /// exactly like a generation error: fail fast, halt remaining files.
    pub file_timeout: Duration,
    /// What happens to debited credits when a job fails or is cancelled.
    pub refund_policy: RefundPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            file_timeout: Duration::from_secs(30),
            refund_policy: RefundPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Point-in-time view of one manifest file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub status: FileStatus,
}

/// Point-in-time view of a job, for the read API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub prompt: String,
    pub model_id: String,
    pub created_at: Timestamp,
    pub files: Vec<FileSnapshot>,
    /// Failure description, present only for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobSnapshot {
    fn from_job(job: &GenerationJob) -> Self {
        Self {
            id: job.id,
            status: job.status(),
            prompt: job.prompt.clone(),
            model_id: job.model_id.clone(),
            created_at: job.created_at,
            files: job
                .files()
                .iter()
                .map(|slot| FileSnapshot {
                    name: slot.spec.name.clone(),
                    kind: slot.spec.kind,
                    status: slot.status(),
                })
                .collect(),
            error: job.failure().map(|f| f.message.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Job bookkeeping
// ---------------------------------------------------------------------------

struct JobInner {
    job: GenerationJob,
    /// Every event emitted for this job, in order. Lets a late subscriber
    /// replay the full transition history before following the live bus.
    journal: Vec<JobEvent>,
    next_seq: u64,
}

/// Shared, internally synchronized state of one job.
///
/// The mutex is only ever held for short, non-awaiting sections.
struct JobRecord {
    inner: Mutex<JobInner>,
}

impl JobRecord {
    fn new(job: GenerationJob) -> Self {
        Self {
            inner: Mutex::new(JobInner {
                job,
                journal: Vec::new(),
                next_seq: 1,
            }),
        }
    }

    fn file_count(&self) -> usize {
        sync::lock(&self.inner).job.file_count()
    }

    fn begin_file(&self, index: usize) -> Result<FileSpec, CoreError> {
        sync::lock(&self.inner).job.begin_file(index)
    }

    fn complete_file(&self, index: usize, content: String) -> Result<(), CoreError> {
        sync::lock(&self.inner).job.complete_file(index, content)
    }

    fn fail_file(&self, index: usize, message: &str) -> Result<(), CoreError> {
        sync::lock(&self.inner).job.fail_file(index, message)
    }

    fn mark_cancelled(&self) {
        sync::lock(&self.inner).job.mark_cancelled();
    }

    /// Snapshot the finished job's artifact and archive entry.
    fn finalize_success(&self) -> (Artifact, HistoryEntry) {
        let inner = sync::lock(&self.inner);
        (inner.job.artifact().clone(), HistoryEntry::from_job(&inner.job))
    }

    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot::from_job(&sync::lock(&self.inner).job)
    }

    fn journal(&self) -> Vec<JobEvent> {
        sync::lock(&self.inner).journal.clone()
    }

    /// Record an event in the journal and publish it on the bus.
    fn emit(&self, bus: &EventBus, kind: JobEventKind) {
        let event = {
            let mut inner = sync::lock(&self.inner);
            let event = JobEvent::new(inner.job.id, inner.next_seq, kind);
            inner.next_seq += 1;
            inner.journal.push(event.clone());
            event
        };
        bus.publish(event);
    }
}

struct JobHandle {
    record: Arc<JobRecord>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Admits, runs, cancels, and reports on generation jobs.
pub struct Orchestrator {
    registry: Arc<ModelRegistry>,
    ledger: Arc<CreditLedger>,
    history: Arc<HistoryStore>,
    bus: Arc<EventBus>,
    backend: Arc<dyn GenerationBackend>,
    config: OrchestratorConfig,
    jobs: RwLock<HashMap<JobId, JobHandle>>,
    /// Master cancellation token -- cancelled during shutdown; every job's
    /// token is a child of it.
    shutdown: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        ledger: Arc<CreditLedger>,
        history: Arc<HistoryStore>,
        bus: Arc<EventBus>,
        backend: Arc<dyn GenerationBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            history,
            bus,
            backend,
            config,
            jobs: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Validate a request, debit its cost, and start its pipeline.
    ///
    /// Rejections ([`CoreError::EmptyPrompt`], [`CoreError::EmptyManifest`],
    /// [`CoreError::UnknownModel`], [`CoreError::InsufficientCredits`]) are
    /// synchronous and side-effect free: the debit happens last and only
    /// once everything else has been accepted, and no file ever leaves
    /// `Pending` before the debit succeeds.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, CoreError> {
        let model = self
            .registry
            .get(&request.model_id)
            .cloned()
            .ok_or_else(|| CoreError::UnknownModel(request.model_id.clone()))?;

        let job = GenerationJob::new(request)?;
        let remaining = self.ledger.debit(&job.account_id, &model)?;

        tracing::info!(
            job_id = %job.id,
            model = %model.id,
            cost = model.credit_cost,
            remaining,
            files = job.file_count(),
            "Generation job admitted",
        );

        let job_id = job.id;
        let account_id = job.account_id.clone();
        let prompt = job.prompt.clone();
        let record = Arc::new(JobRecord::new(job));
        let cancel = self.shutdown.child_token();

        let ctx = JobContext {
            job_id,
            account_id,
            prompt,
            model,
            record: Arc::clone(&record),
            cancel: cancel.clone(),
            backend: Arc::clone(&self.backend),
            ledger: Arc::clone(&self.ledger),
            history: Arc::clone(&self.history),
            bus: Arc::clone(&self.bus),
            file_timeout: self.config.file_timeout,
            refund_policy: self.config.refund_policy,
        };
        let task = tokio::spawn(run_job(ctx));

        self.jobs.write().await.insert(
            job_id,
            JobHandle {
                record,
                cancel,
                task,
            },
        );
        Ok(job_id)
    }

    /// Request cancellation of a job.
    ///
    /// The signal is observed between files (and interrupts an in-flight
    /// generation step); already-produced content is discarded. Idempotent:
    /// cancelling a terminal job has no effect.
    pub async fn cancel(&self, job_id: JobId) -> Result<(), CoreError> {
        let jobs = self.jobs.read().await;
        let handle = jobs.get(&job_id).ok_or_else(|| CoreError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        })?;
        handle.cancel.cancel();
        tracing::info!(job_id = %job_id, "Cancellation requested");
        Ok(())
    }

    /// Point-in-time view of a job, or `None` if unknown.
    pub async fn job(&self, job_id: JobId) -> Option<JobSnapshot> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|handle| handle.record.snapshot())
    }

    /// Every event emitted for a job so far, in order. `None` if unknown.
    pub async fn journal(&self, job_id: JobId) -> Option<Vec<JobEvent>> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|handle| handle.record.journal())
    }

    /// Subscribe to the live event feed for all jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.bus.subscribe()
    }

    /// Number of jobs that have not reached a terminal status.
    pub async fn active_jobs(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|handle| !handle.record.snapshot().status.is_terminal())
            .count()
    }

    /// Cancel every running job and wait briefly for their tasks to exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down generation orchestrator");
        self.shutdown.cancel();

        let mut jobs = self.jobs.write().await;
        for (job_id, handle) in jobs.drain() {
            handle.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_GRACE, handle.task)
                .await
                .is_err()
            {
                tracing::warn!(job_id = %job_id, "Job task did not stop in time");
            }
        }
        tracing::info!("Generation orchestrator shut down");
    }
}

// ---------------------------------------------------------------------------
// Job task
// ---------------------------------------------------------------------------

/// Everything a job task needs, captured at admission time.
struct JobContext {
    job_id: JobId,
    account_id: AccountId,
    prompt: String,
    model: ModelDescriptor,
    record: Arc<JobRecord>,
    cancel: CancellationToken,
    backend: Arc<dyn GenerationBackend>,
    ledger: Arc<CreditLedger>,
    history: Arc<HistoryStore>,
    bus: Arc<EventBus>,
    file_timeout: Duration,
    refund_policy: RefundPolicy,
}

impl JobContext {
    fn emit(&self, kind: JobEventKind) {
        self.record.emit(&self.bus, kind);
    }

    /// Apply the refund policy after a failed or cancelled job.
    fn settle_credits(&self) {
        if self.refund_policy != RefundPolicy::Refund {
            return;
        }
        match self.ledger.refund(&self.account_id, self.model.credit_cost) {
            Ok(available) => tracing::debug!(
                job_id = %self.job_id,
                refunded = self.model.credit_cost,
                available,
                "Refunded generation cost",
            ),
            Err(error) => tracing::error!(
                job_id = %self.job_id,
                error = %error,
                "Failed to refund generation cost",
            ),
        }
    }
}

async fn run_job(ctx: JobContext) {
    if let Err(error) = drive(&ctx).await {
        // Transitions are driven only by this task on a freshly admitted
        // job, so a refused transition is a sequencing bug, never user
        // input. Log loudly; the job snapshot keeps whatever state it had.
        tracing::error!(
            job_id = %ctx.job_id,
            error = %error,
            "Job task aborted by internal sequencing error",
        );
    }
}

/// Run the file pipeline to a terminal state.
async fn drive(ctx: &JobContext) -> Result<(), CoreError> {
    let file_count = ctx.record.file_count();

    for index in 0..file_count {
        // Cancellation observed between files.
        if ctx.cancel.is_cancelled() {
            return finish_cancelled(ctx);
        }

        let spec = ctx.record.begin_file(index)?;
        ctx.emit(JobEventKind::FileStarted {
            file: spec.name.clone(),
        });
        tracing::debug!(
            job_id = %ctx.job_id,
            file = %spec.name,
            kind = %spec.kind,
            "Generating file",
        );

        let generation = tokio::time::timeout(
            ctx.file_timeout,
            ctx.backend.generate_file(&ctx.prompt, &ctx.model, &spec),
        );
        let outcome = tokio::select! {
            // Cancellation interrupts an in-flight generation step.
            _ = ctx.cancel.cancelled() => None,
            result = generation => Some(result),
        };

        match outcome {
            None => return finish_cancelled(ctx),
            Some(Ok(Ok(content))) => {
                ctx.record.complete_file(index, content)?;
                ctx.emit(JobEventKind::FileCompleted {
                    file: spec.name.clone(),
                });
            }
            Some(Ok(Err(error))) => {
                return finish_failed(ctx, index, &spec, error.to_string());
            }
            Some(Err(_elapsed)) => {
                let message = format!(
                    "Generation timed out after {} ms",
                    ctx.file_timeout.as_millis()
                );
                return finish_failed(ctx, index, &spec, message);
            }
        }
    }

    // All files completed: archive the artifact and announce success.
    let (artifact, entry) = ctx.record.finalize_success();
    ctx.history.append(entry);
    ctx.emit(JobEventKind::JobSucceeded { artifact });
    tracing::info!(job_id = %ctx.job_id, "Generation job succeeded");
    Ok(())
}

/// Fail fast: mark the file and the job, emit events, settle credits.
/// Remaining files stay `Pending` and are never processed.
fn finish_failed(
    ctx: &JobContext,
    index: usize,
    spec: &FileSpec,
    message: String,
) -> Result<(), CoreError> {
    ctx.record.fail_file(index, &message)?;
    ctx.emit(JobEventKind::FileFailed {
        file: spec.name.clone(),
        error: message.clone(),
    });
    ctx.emit(JobEventKind::JobFailed {
        error: message.clone(),
    });
    ctx.settle_credits();
    tracing::warn!(
        job_id = %ctx.job_id,
        file = %spec.name,
        error = %message,
        "Generation job failed",
    );
    Ok(())
}

/// Halt on cancellation: no further file transitions, content discarded.
fn finish_cancelled(ctx: &JobContext) -> Result<(), CoreError> {
    ctx.record.mark_cancelled();
    ctx.emit(JobEventKind::JobCancelled);
    ctx.settle_credits();
    tracing::info!(job_id = %ctx.job_id, "Generation job cancelled");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use async_trait::async_trait;
    use vizcode_core::Tier;

    /// Deterministic backend: optionally fails or hangs on a named file.
    struct ScriptedBackend {
        fail_on: Option<&'static str>,
        hang_on: Option<&'static str>,
    }

    impl ScriptedBackend {
        fn ok() -> Self {
            Self {
                fail_on: None,
                hang_on: None,
            }
        }

        fn failing_on(name: &'static str) -> Self {
            Self {
                fail_on: Some(name),
                hang_on: None,
            }
        }

        fn hanging_on(name: &'static str) -> Self {
            Self {
                fail_on: None,
                hang_on: Some(name),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate_file(
            &self,
            prompt: &str,
            _model: &ModelDescriptor,
            file: &FileSpec,
        ) -> Result<String, BackendError> {
            if self.hang_on == Some(file.name.as_str()) {
                std::future::pending::<()>().await;
            }
            if self.fail_on == Some(file.name.as_str()) {
                return Err(BackendError::new("injected failure"));
            }
            Ok(format!("{}: {prompt}", file.kind))
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        ledger: Arc<CreditLedger>,
        history: Arc<HistoryStore>,
        bus: Arc<EventBus>,
    }

    fn harness(backend: ScriptedBackend, config: OrchestratorConfig, credits: u32) -> Harness {
        let registry = Arc::new(ModelRegistry::with_default_catalog());
        let ledger = Arc::new(CreditLedger::new());
        ledger.open_account("acct", Tier::Free, credits).unwrap();
        let history = Arc::new(HistoryStore::new(10));
        let bus = Arc::new(EventBus::default());
        let orchestrator = Orchestrator::new(
            registry,
            Arc::clone(&ledger),
            Arc::clone(&history),
            Arc::clone(&bus),
            Arc::new(backend),
            config,
        );
        Harness {
            orchestrator,
            ledger,
            history,
            bus,
        }
    }

    fn request(model_id: &str) -> JobRequest {
        JobRequest {
            account_id: "acct".into(),
            prompt: "build a login form".into(),
            model_id: model_id.into(),
            files: vec![
                FileSpec::new("component.tsx", FileKind::Component),
                FileSpec::new("styles.css", FileKind::Style),
                FileSpec::new("utils.ts", FileKind::Util),
            ],
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<JobEvent>, job_id: JobId) -> JobEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for a job event")
                .expect("event bus closed");
            if event.job_id == job_id {
                return event;
            }
        }
    }

    async fn collect_until_terminal(
        rx: &mut broadcast::Receiver<JobEvent>,
        job_id: JobId,
    ) -> Vec<JobEvent> {
        let mut events = Vec::new();
        loop {
            let event = next_event(rx, job_id).await;
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    fn event_names(events: &[JobEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.kind.name()).collect()
    }

    // -- happy path --

    #[tokio::test]
    async fn happy_path_emits_sequential_events_and_archives() {
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 5);
        let mut rx = h.bus.subscribe();

        let job_id = h.orchestrator.submit(request("vizcode-1-free")).await.unwrap();
        let events = collect_until_terminal(&mut rx, job_id).await;

        assert_eq!(
            event_names(&events),
            [
                "file_started",
                "file_completed",
                "file_started",
                "file_completed",
                "file_started",
                "file_completed",
                "job_succeeded",
            ]
        );
        // Sequence numbers are dense and ordered.
        let seqs: Vec<_> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (1..=7).collect::<Vec<_>>());

        // Files advanced in manifest order.
        assert_eq!(
            events[0].kind,
            JobEventKind::FileStarted {
                file: "component.tsx".into()
            }
        );
        assert_eq!(
            events[2].kind,
            JobEventKind::FileStarted {
                file: "styles.css".into()
            }
        );

        // Terminal event carries the full artifact.
        match &events[6].kind {
            JobEventKind::JobSucceeded { artifact } => {
                let names: Vec<_> = artifact.keys().cloned().collect();
                assert_eq!(names, ["component.tsx", "styles.css", "utils.ts"]);
            }
            other => panic!("expected job_succeeded, got {other:?}"),
        }

        // One debit, one history entry.
        assert_eq!(h.ledger.account("acct").unwrap().consumed, 1);
        assert_eq!(h.history.len(), 1);
        assert_eq!(
            h.orchestrator.job(job_id).await.unwrap().status,
            JobStatus::Succeeded
        );
    }

    #[tokio::test]
    async fn journal_matches_the_live_feed() {
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 5);
        let mut rx = h.bus.subscribe();

        let job_id = h.orchestrator.submit(request("vizcode-1-free")).await.unwrap();
        let live = collect_until_terminal(&mut rx, job_id).await;

        let journal = h.orchestrator.journal(job_id).await.unwrap();
        assert_eq!(journal, live);
    }

    // -- admission rejections --

    #[tokio::test]
    async fn insufficient_credits_rejects_synchronously() {
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 0);
        let mut rx = h.bus.subscribe();

        let err = h
            .orchestrator
            .submit(request("vizcode-1-free"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CoreError::InsufficientCredits {
                required: 1,
                available: 0
            }
        );
        // No side effects: balance untouched, no job, no events.
        assert_eq!(h.ledger.account("acct").unwrap().consumed, 0);
        assert_eq!(h.orchestrator.active_jobs().await, 0);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        assert!(h.history.is_empty());
    }

    #[tokio::test]
    async fn unknown_model_is_rejected_before_debit() {
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 5);
        let err = h.orchestrator.submit(request("gpt-99")).await.unwrap_err();
        assert_eq!(err, CoreError::UnknownModel("gpt-99".into()));
        assert_eq!(h.ledger.account("acct").unwrap().consumed, 0);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_debit() {
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 5);
        let mut bad = request("vizcode-1-free");
        bad.prompt = "   ".into();
        let err = h.orchestrator.submit(bad).await.unwrap_err();
        assert_eq!(err, CoreError::EmptyPrompt);
        assert_eq!(h.ledger.account("acct").unwrap().consumed, 0);
    }

    // -- failure paths --

    #[tokio::test]
    async fn failure_at_second_file_fails_fast() {
        let h = harness(
            ScriptedBackend::failing_on("styles.css"),
            OrchestratorConfig::default(),
            5,
        );
        let mut rx = h.bus.subscribe();

        let job_id = h.orchestrator.submit(request("vizcode-1-free")).await.unwrap();
        let events = collect_until_terminal(&mut rx, job_id).await;

        assert_eq!(
            event_names(&events),
            [
                "file_started",
                "file_completed",
                "file_started",
                "file_failed",
                "job_failed",
            ]
        );

        let snapshot = h.orchestrator.job(job_id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.files[0].status, FileStatus::Completed);
        assert_eq!(snapshot.files[1].status, FileStatus::Error);
        // Fail-fast: the third file was never touched.
        assert_eq!(snapshot.files[2].status, FileStatus::Pending);

        // No history entry; the debit is kept under the default policy.
        assert!(h.history.is_empty());
        assert_eq!(h.ledger.account("acct").unwrap().consumed, 1);
    }

    #[tokio::test]
    async fn refund_policy_returns_credits_on_failure() {
        let config = OrchestratorConfig {
            refund_policy: RefundPolicy::Refund,
            ..OrchestratorConfig::default()
        };
        let h = harness(ScriptedBackend::failing_on("component.tsx"), config, 5);
        let mut rx = h.bus.subscribe();

        let job_id = h.orchestrator.submit(request("vizcode-1-free")).await.unwrap();
        collect_until_terminal(&mut rx, job_id).await;

        assert_eq!(h.ledger.account("acct").unwrap().consumed, 0);
    }

    #[tokio::test]
    async fn timeout_is_treated_as_a_generation_error() {
        let config = OrchestratorConfig {
            file_timeout: Duration::from_millis(25),
            ..OrchestratorConfig::default()
        };
        let h = harness(ScriptedBackend::hanging_on("styles.css"), config, 5);
        let mut rx = h.bus.subscribe();

        let job_id = h.orchestrator.submit(request("vizcode-1-free")).await.unwrap();
        let events = collect_until_terminal(&mut rx, job_id).await;

        assert_eq!(events.last().map(|e| e.kind.name()), Some("job_failed"));
        match &events[3].kind {
            JobEventKind::FileFailed { file, error } => {
                assert_eq!(file, "styles.css");
                assert!(error.contains("timed out"));
            }
            other => panic!("expected file_failed, got {other:?}"),
        }

        let snapshot = h.orchestrator.job(job_id).await.unwrap();
        assert_eq!(snapshot.files[2].status, FileStatus::Pending);
    }

    // -- cancellation --

    #[tokio::test]
    async fn cancellation_interrupts_the_pipeline() {
        let h = harness(
            ScriptedBackend::hanging_on("styles.css"),
            OrchestratorConfig::default(),
            5,
        );
        let mut rx = h.bus.subscribe();

        let job_id = h.orchestrator.submit(request("vizcode-1-free")).await.unwrap();

        // Wait for the second file to start, then cancel mid-step.
        loop {
            let event = next_event(&mut rx, job_id).await;
            if event.kind
                == (JobEventKind::FileStarted {
                    file: "styles.css".into(),
                })
            {
                break;
            }
        }
        h.orchestrator.cancel(job_id).await.unwrap();

        let event = next_event(&mut rx, job_id).await;
        assert_eq!(event.kind, JobEventKind::JobCancelled);

        let snapshot = h.orchestrator.job(job_id).await.unwrap();
        assert_eq!(snapshot.status, JobStatus::Cancelled);
        // The third file never started; no archive entry was created.
        assert_eq!(snapshot.files[2].status, FileStatus::Pending);
        assert!(h.history.is_empty());
    }

    #[tokio::test]
    async fn cancel_of_unknown_job_is_not_found() {
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 5);
        let err = h.orchestrator.cancel(uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "Job", .. }));
    }

    // -- concurrency --

    #[tokio::test]
    async fn concurrent_jobs_on_one_account_cannot_overdraw() {
        // 5 credits, model costs 3: only one of two submissions may pass.
        let h = harness(ScriptedBackend::ok(), OrchestratorConfig::default(), 5);

        let (a, b) = tokio::join!(
            h.orchestrator.submit(request("vizcode-1.5-booster")),
            h.orchestrator.submit(request("vizcode-1.5-booster")),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert_eq!(h.ledger.account("acct").unwrap().consumed, 3);
    }
}
