// Wipe Orchestrator - schedules passes across targets and drives each job
// through its phases on a dedicated worker thread.
//
// A job moves Pending -> Enumerating -> Wiping -> Verifying -> Certifying ->
// Completed, or ends in Cancelled / Failed. Observers get an event stream, a
// snapshot of the latest state, and exactly one final report.

use crate::algorithms::{Algorithm, AlgorithmId, PassSeed, PatternGenerator};
use crate::config::EngineConfig;
use crate::crypto::certificates::{
    new_certificate_id, AlgorithmSummary, Certificate, CertificateBody, CertificateFiles,
    CertificateGenerator, CertificateStatus, TargetSummary,
};
use crate::error::{JobJournal, JobRecord};
use crate::io::{LocalStorage, PassExecutor, StorageAccess};
use crate::targets::{TargetEnumerator, TargetKind, WipeTarget};
use crate::verification::{VerificationOutcome, VerificationResult, VerificationSummary, Verifier};
use crate::{JobPhase, OverwriteGuarantee, WipeError, WipeOptions, WipeResult};
use chrono::{DateTime, Utc};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cooperative cancellation flag, checked by the worker at pass boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Emitted after every completed pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub job_id: String,
    pub targets_completed: usize,
    pub targets_total: usize,
    pub current_target: PathBuf,
    /// Zero-based index of the pass that just finished
    pub pass_index: usize,
    pub pass_total: usize,
    pub bytes_written: u64,
    pub bytes_total: u64,
}

#[derive(Debug, Clone)]
pub enum WipeEvent {
    Phase { job_id: String, phase: JobPhase },
    Progress(ProgressEvent),
    /// Always the last event of a job
    Result(WipeReport),
}

/// Read-only view of a running job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub job_id: String,
    pub root: PathBuf,
    pub algorithm: AlgorithmId,
    pub phase: JobPhase,
    pub targets_total: usize,
    pub targets_completed: usize,
    pub current_target: Option<PathBuf>,
    pub bytes_written: u64,
    pub bytes_total: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub path: PathBuf,
    pub kind: TargetKind,
    pub length: u64,
    pub passes_completed: usize,
    pub pass_total: usize,
    pub verification: Option<VerificationResult>,
    pub removed: bool,
    pub error: Option<String>,
}

impl TargetReport {
    pub fn is_fully_wiped(&self) -> bool {
        self.passes_completed >= self.pass_total
    }
}

/// Final outcome of a job
#[derive(Debug, Clone)]
pub struct WipeReport {
    pub job_id: String,
    pub root: PathBuf,
    pub algorithm: AlgorithmId,
    /// Terminal phase: Completed, Cancelled or Failed
    pub status: JobPhase,
    pub targets: Vec<TargetReport>,
    pub verification: VerificationSummary,
    pub warnings: Vec<String>,
    /// Present whenever certification ran, even if writing it failed
    pub certificate: Option<Certificate>,
    pub certificate_files: Option<CertificateFiles>,
    pub error: Option<WipeError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WipeReport {
    /// Targets on which every pass completed
    pub fn completed_targets(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| t.is_fully_wiped())
    }

    pub fn total_bytes(&self) -> u64 {
        self.targets.iter().map(|t| t.length).sum()
    }
}

/// Stream of [`WipeEvent`]s for one job, ending after the `Result` event
pub struct WipeEvents {
    rx: mpsc::UnboundedReceiver<WipeEvent>,
}

impl WipeEvents {
    /// Blocking receive for callers outside an async runtime.
    pub fn blocking_next(&mut self) -> Option<WipeEvent> {
        self.rx.blocking_recv()
    }
}

impl Stream for WipeEvents {
    type Item = WipeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Handle to a job running on its worker thread
pub struct JobHandle {
    job_id: String,
    cancel: CancelToken,
    events: Mutex<Option<WipeEvents>>,
    snapshot: watch::Receiver<JobSnapshot>,
    report: oneshot::Receiver<WipeReport>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Take the event stream. Only the first call returns `Some`.
    pub fn subscribe(&self) -> Option<WipeEvents> {
        lock(&self.events).take()
    }

    /// Request cancellation; takes effect at the next pass boundary.
    pub fn cancel(&self) {
        if !self.snapshot().phase.is_terminal() {
            self.cancel.cancel();
        }
    }

    /// Token for cancelling from elsewhere (e.g. a signal handler)
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn wait(self) -> WipeResult<WipeReport> {
        self.report.await.map_err(|_| WipeError::WorkerTerminated)
    }

    /// Blocking wait; must not be called from within an async runtime.
    pub fn wait_blocking(self) -> WipeResult<WipeReport> {
        self.report
            .blocking_recv()
            .map_err(|_| WipeError::WorkerTerminated)
    }
}

/// Roots with a job in flight
#[derive(Debug, Default)]
struct ActiveRoots(Mutex<Vec<PathBuf>>);

/// Releases a root when the worker exits
struct RootGuard {
    roots: Arc<ActiveRoots>,
    root: PathBuf,
}

impl ActiveRoots {
    fn register(self: &Arc<Self>, root: &Path) -> WipeResult<RootGuard> {
        let mut roots = lock(&self.0);
        if roots
            .iter()
            .any(|active| active.starts_with(root) || root.starts_with(active))
        {
            return Err(WipeError::JobAlreadyRunning(root.to_path_buf()));
        }
        roots.push(root.to_path_buf());
        Ok(RootGuard {
            roots: Arc::clone(self),
            root: root.to_path_buf(),
        })
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        let mut roots = lock(&self.roots.0);
        if let Some(pos) = roots.iter().position(|r| r == &self.root) {
            roots.swap_remove(pos);
        }
    }
}

struct EngineShared {
    config: EngineConfig,
    storage: Arc<dyn StorageAccess>,
    executor: PassExecutor,
    certificates: CertificateGenerator,
    journal: Mutex<JobJournal>,
    active: Arc<ActiveRoots>,
}

/// Entry point: starts, resumes and tracks wipe jobs
#[derive(Clone)]
pub struct WipeEngine {
    shared: Arc<EngineShared>,
}

impl std::fmt::Debug for WipeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WipeEngine")
            .field("config", &self.shared.config)
            .finish()
    }
}

impl WipeEngine {
    /// Engine over the local filesystem.
    pub fn new(config: EngineConfig) -> WipeResult<Self> {
        Self::with_storage(config, Arc::new(LocalStorage::new()))
    }

    pub fn with_storage(config: EngineConfig, storage: Arc<dyn StorageAccess>) -> WipeResult<Self> {
        config.validate()?;

        let certificates = match &config.signing_key_path {
            Some(path) => CertificateGenerator::load_or_generate(path)?,
            None => CertificateGenerator::new_ephemeral()?,
        };
        let journal = JobJournal::open(config.journal_path.as_deref())?;
        let executor = PassExecutor::new(config.io_config());

        Ok(Self {
            shared: Arc::new(EngineShared {
                config,
                storage,
                executor,
                certificates,
                journal: Mutex::new(journal),
                active: Arc::new(ActiveRoots::default()),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Hex public key that signs this engine's certificates
    pub fn public_key_hex(&self) -> String {
        self.shared.certificates.public_key_hex()
    }

    /// Start wiping `root` with the named algorithm. Returns immediately.
    pub fn start_wipe(
        &self,
        root: impl AsRef<Path>,
        algorithm: &str,
        options: WipeOptions,
    ) -> WipeResult<JobHandle> {
        let root = absolute_root(root.as_ref())?;
        let algorithm = Algorithm::from_name(algorithm)?;
        let guard = self.shared.active.register(&root)?;

        let job_id = Uuid::new_v4().to_string();
        tracing::info!(
            job_id = %job_id,
            root = %root.display(),
            algorithm = %algorithm.id,
            "Starting wipe job"
        );

        let job = WipeJob::new(
            Arc::clone(&self.shared),
            job_id,
            root,
            algorithm,
            options,
            Utc::now(),
            None,
            guard,
        );
        job.spawn()
    }

    /// Continue an interrupted or cancelled journalled job from its last
    /// completed pass.
    pub fn resume_job(&self, job_id: &str) -> WipeResult<JobHandle> {
        let record = lock(&self.shared.journal)
            .load(job_id)?
            .ok_or_else(|| WipeError::InvalidArgument(format!("unknown job '{}'", job_id)))?;
        if !record.is_resumable() {
            return Err(WipeError::InvalidArgument(format!(
                "job '{}' already completed",
                job_id
            )));
        }

        let algorithm = record.algorithm.algorithm();
        let guard = self.shared.active.register(&record.root)?;
        tracing::info!(
            job_id = %record.job_id,
            root = %record.root.display(),
            phase = %record.phase,
            "Resuming wipe job"
        );

        let job = WipeJob::new(
            Arc::clone(&self.shared),
            record.job_id.clone(),
            record.root.clone(),
            algorithm,
            record.options.clone(),
            record.created_at,
            Some(record),
            guard,
        );
        job.spawn()
    }

    /// Journalled jobs that can be resumed
    pub fn resumable_jobs(&self) -> WipeResult<Vec<JobRecord>> {
        lock(&self.shared.journal).list_resumable()
    }
}

fn absolute_root(root: &Path) -> WipeResult<PathBuf> {
    if root.as_os_str().is_empty() {
        return Err(WipeError::InvalidArgument("root path is empty".to_string()));
    }
    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| WipeError::from_lookup(root, e))?;
    Ok(cwd.join(root))
}

/// State owned exclusively by the worker thread
struct WipeJob {
    shared: Arc<EngineShared>,
    job_id: String,
    root: PathBuf,
    algorithm: Algorithm,
    options: WipeOptions,
    phase: JobPhase,
    resume: Option<JobRecord>,
    /// Built from the journal; the first pass run per target may be a partial one
    resumed: bool,
    targets: Vec<WipeTarget>,
    directories: Vec<PathBuf>,
    warnings: Vec<String>,
    seeds: Vec<Vec<Option<PassSeed>>>,
    verification: Vec<Option<VerificationResult>>,
    removed: Vec<bool>,
    target_errors: Vec<Option<String>>,
    bytes_written: u64,
    bytes_total: u64,
    journalled: bool,
    started_at: DateTime<Utc>,
    cancel: CancelToken,
    events: mpsc::UnboundedSender<WipeEvent>,
    snapshot: watch::Sender<JobSnapshot>,
    handle_parts: Option<(mpsc::UnboundedReceiver<WipeEvent>, watch::Receiver<JobSnapshot>)>,
    /// Held until the report is ready, then released before anyone sees it
    guard: Option<RootGuard>,
}

impl WipeJob {
    #[allow(clippy::too_many_arguments)]
    fn new(
        shared: Arc<EngineShared>,
        job_id: String,
        root: PathBuf,
        algorithm: Algorithm,
        options: WipeOptions,
        started_at: DateTime<Utc>,
        resume: Option<JobRecord>,
        guard: RootGuard,
    ) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();
        let (snapshot, snapshot_rx) = watch::channel(JobSnapshot {
            job_id: job_id.clone(),
            root: root.clone(),
            algorithm: algorithm.id,
            phase: JobPhase::Pending,
            targets_total: 0,
            targets_completed: 0,
            current_target: None,
            bytes_written: 0,
            bytes_total: 0,
            started_at,
            finished_at: None,
        });

        Self {
            shared,
            job_id,
            root,
            algorithm,
            options,
            phase: JobPhase::Pending,
            resumed: resume.is_some(),
            resume,
            targets: Vec::new(),
            directories: Vec::new(),
            warnings: Vec::new(),
            seeds: Vec::new(),
            verification: Vec::new(),
            removed: Vec::new(),
            target_errors: Vec::new(),
            bytes_written: 0,
            bytes_total: 0,
            journalled: false,
            started_at,
            cancel: CancelToken::new(),
            events,
            snapshot,
            handle_parts: Some((events_rx, snapshot_rx)),
            guard: Some(guard),
        }
    }

    fn spawn(mut self) -> WipeResult<JobHandle> {
        let (events_rx, snapshot_rx) = self
            .handle_parts
            .take()
            .ok_or(WipeError::WorkerTerminated)?;
        let (report_tx, report_rx) = oneshot::channel();
        let handle = JobHandle {
            job_id: self.job_id.clone(),
            cancel: self.cancel.clone(),
            events: Mutex::new(Some(WipeEvents { rx: events_rx })),
            snapshot: snapshot_rx,
            report: report_rx,
        };

        let root = self.root.clone();
        std::thread::Builder::new()
            .name(format!("ash-wipe-{}", &self.job_id[..8.min(self.job_id.len())]))
            .spawn(move || self.run(report_tx))
            .map_err(|e| WipeError::io(root, None, e))?;

        Ok(handle)
    }

    fn run(mut self, report_tx: oneshot::Sender<WipeReport>) {
        let span = tracing::info_span!("wipe_job", job_id = %self.job_id);
        let _enter = span.enter();

        let report = self.drive();
        tracing::info!(
            status = %report.status,
            targets = report.targets.len(),
            verified = report.verification.passed,
            failed = report.verification.failed,
            "Wipe job finished"
        );

        // A caller woken by the report may immediately start a job on this root
        drop(self.guard.take());

        let _ = self.events.send(WipeEvent::Result(report.clone()));
        let _ = report_tx.send(report);
    }

    fn drive(&mut self) -> WipeReport {
        let (certificate, files, error) = match self.execute() {
            Ok(certified) => certified,
            Err(WipeError::Cancelled) => {
                tracing::warn!("Wipe job cancelled");
                self.finish(JobPhase::Cancelled, Some(&WipeError::Cancelled));
                (None, None, Some(WipeError::Cancelled))
            }
            Err(e) => {
                tracing::error!(error = %e, "Wipe job failed");
                self.finish(JobPhase::Failed, Some(&e));
                (None, None, Some(e))
            }
        };
        self.report(certificate, files, error)
    }

    fn execute(&mut self) -> WipeResult<(Option<Certificate>, Option<CertificateFiles>, Option<WipeError>)> {
        self.transition(JobPhase::Enumerating)?;
        match self.resume.take() {
            Some(record) => self.restore(record)?,
            None => self.enumerate()?,
        }
        self.check_cancelled()?;

        self.transition(JobPhase::Wiping)?;
        self.wipe_all()?;

        self.transition(JobPhase::Verifying)?;
        self.verify_all()?;
        self.cleanup();

        self.transition(JobPhase::Certifying)?;
        let certificate = self.certify()?;

        match self.save_certificate(&certificate) {
            Ok(files) => {
                self.finish(JobPhase::Completed, None);
                Ok((Some(certificate), Some(files), None))
            }
            Err(e) => {
                // The wipe stands; only the artifact is missing
                tracing::error!(error = %e, "Certificate could not be written");
                self.finish(JobPhase::Failed, Some(&e));
                Ok((Some(certificate), None, Some(e)))
            }
        }
    }

    fn enumerate(&mut self) -> WipeResult<()> {
        let enumerated = TargetEnumerator::new(self.shared.storage.as_ref(), self.options.recurse)
            .enumerate(&self.root)?;

        let mut seeds = Vec::with_capacity(enumerated.targets.len());
        for _ in &enumerated.targets {
            let target_seeds = self
                .algorithm
                .passes
                .iter()
                .map(|pass| {
                    if pass.pattern.needs_seed() {
                        PassSeed::generate().map(Some)
                    } else {
                        Ok(None)
                    }
                })
                .collect::<WipeResult<Vec<_>>>()?;
            seeds.push(target_seeds);
        }

        self.warnings = enumerated.warnings();
        self.targets = enumerated.targets;
        self.directories = enumerated.directories;
        self.seeds = seeds;
        self.init_tracking();

        let record = JobRecord {
            job_id: self.job_id.clone(),
            root: self.root.clone(),
            algorithm: self.algorithm.id,
            options: self.options.clone(),
            phase: self.phase,
            targets: self.targets.clone(),
            directories: self.directories.clone(),
            warnings: self.warnings.clone(),
            seeds: self.seeds.clone(),
            created_at: self.started_at,
            updated_at: Utc::now(),
            last_error: None,
        };
        lock(&self.shared.journal).create_job(&record)?;
        self.journalled = true;

        tracing::info!(
            targets = self.targets.len(),
            bytes = self.targets.iter().map(|t| t.length).sum::<u64>(),
            skipped = self.warnings.len(),
            "Enumerated targets"
        );
        Ok(())
    }

    /// Re-validate a journalled plan before continuing it.
    fn restore(&mut self, record: JobRecord) -> WipeResult<()> {
        self.targets = record.targets;
        self.directories = record.directories;
        self.warnings = record.warnings;
        self.seeds = record.seeds;
        self.journalled = true;
        self.init_tracking();

        let pass_total = self.algorithm.pass_count();
        for (i, target) in self.targets.iter().enumerate() {
            if target.passes_completed() >= pass_total
                && matches!(self.shared.storage.metadata(&target.path), Err(ref e) if e.kind() == std::io::ErrorKind::NotFound)
            {
                // Wiped and unlinked before the interruption
                self.removed[i] = true;
                continue;
            }
            target.check_length(self.shared.storage.as_ref())?;
        }

        tracing::info!(
            targets = self.targets.len(),
            remaining_passes = self
                .targets
                .iter()
                .map(|t| pass_total.saturating_sub(t.passes_completed()))
                .sum::<usize>(),
            "Restored job from journal"
        );
        Ok(())
    }

    fn init_tracking(&mut self) {
        let n = self.targets.len();
        let passes = self.algorithm.pass_count() as u64;
        self.verification = vec![None; n];
        self.removed = vec![false; n];
        self.target_errors = vec![None; n];
        self.bytes_total = self.targets.iter().map(|t| t.length * passes).sum();
        self.bytes_written = self
            .targets
            .iter()
            .map(|t| t.length * t.passes_completed() as u64)
            .sum();
        self.publish_snapshot(None);
    }

    fn wipe_all(&mut self) -> WipeResult<()> {
        for index in 0..self.targets.len() {
            if let Err(e) = self.wipe_target(index) {
                if !matches!(e, WipeError::Cancelled) {
                    self.target_errors[index] = Some(e.to_string());
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn wipe_target(&mut self, index: usize) -> WipeResult<()> {
        let pass_total = self.algorithm.pass_count();
        if self.targets[index].passes_completed() >= pass_total {
            return Ok(());
        }

        let storage = Arc::clone(&self.shared.storage);
        let path = self.targets[index].path.clone();
        let mut handle = storage
            .open_for_write(&path)
            .map_err(|e| WipeError::io(&path, None, e))?;

        let first_pass = self.targets[index].passes_completed();
        while self.targets[index].passes_completed() < pass_total {
            self.check_cancelled()?;
            self.targets[index].check_length(storage.as_ref())?;

            let pass_index = self.targets[index].passes_completed();
            let generator = PatternGenerator::new(self.algorithm.passes, &self.seeds[index]);
            let executor = &self.shared.executor;
            let target = &mut self.targets[index];
            let outcome = if self.resumed && pass_index == first_pass {
                executor.rerun_pass(handle.as_mut(), target, &generator, pass_index)?
            } else {
                executor.execute_pass(handle.as_mut(), target, &generator, pass_index)?
            };
            self.bytes_written += outcome.bytes_written;

            let passes_completed = self.targets[index].passes_completed();
            if let Err(e) = lock(&self.shared.journal).record_pass(&self.job_id, index, passes_completed) {
                // Progress on the medium is real; only resume precision suffers
                tracing::warn!(error = %e, "Failed to checkpoint pass");
            }
            self.emit_progress(index, pass_index);
        }

        self.targets[index].check_length(storage.as_ref())
    }

    fn verify_all(&mut self) -> WipeResult<()> {
        let pass_total = self.algorithm.pass_count();
        let enabled = self.options.verify && self.algorithm.final_pass_verifies();
        let verifier = Verifier::new(
            self.shared.config.verify_mode,
            self.shared.config.chunk_size,
        );

        for index in 0..self.targets.len() {
            self.check_cancelled()?;
            let target = &self.targets[index];
            let result = if !enabled || self.removed[index] {
                VerificationResult::skipped(&target.path)
            } else {
                let generator = PatternGenerator::new(self.algorithm.passes, &self.seeds[index]);
                verifier.verify(self.shared.storage.as_ref(), target, &generator, pass_total - 1)
            };
            self.verification[index] = Some(result);
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        if self.options.keep_files {
            return;
        }
        let storage = Arc::clone(&self.shared.storage);

        for (index, target) in self.targets.iter().enumerate() {
            if target.kind != TargetKind::File || self.removed[index] {
                continue;
            }
            match storage.delete(&target.path) {
                Ok(()) => self.removed[index] = true,
                Err(e) => {
                    tracing::warn!(path = %target.path.display(), error = %e, "Failed to remove file");
                    self.warnings
                        .push(format!("failed to remove {}: {}", target.path.display(), e));
                }
            }
        }

        // Deepest first; the root itself is never in this list
        for dir in &self.directories {
            if let Err(e) = storage.remove_dir(dir) {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to remove directory");
                self.warnings
                    .push(format!("failed to remove directory {}: {}", dir.display(), e));
            }
        }
    }

    fn certify(&mut self) -> WipeResult<Certificate> {
        let results: Vec<VerificationResult> = self.verification.iter().flatten().cloned().collect();
        let summary = VerificationSummary::from_results(&results);
        let verify_enabled = self.options.verify && self.algorithm.final_pass_verifies();
        let status = if summary.failed > 0 {
            CertificateStatus::VerificationFailed
        } else if !verify_enabled || summary.skipped > 0 {
            CertificateStatus::NotVerified
        } else {
            CertificateStatus::Success
        };
        let overwrite_guarantee = if self.shared.storage.supports_positional_overwrite() {
            OverwriteGuarantee::FullOverwrite
        } else {
            OverwriteGuarantee::BestEffort
        };

        let targets = self
            .targets
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let verification = self.verification[i].as_ref();
                TargetSummary {
                    path: t.path.clone(),
                    kind: t.kind,
                    length: t.length,
                    passes_completed: t.passes_completed(),
                    verification: verification
                        .map(|v| v.outcome)
                        .unwrap_or(VerificationOutcome::Skipped),
                    bytes_verified: verification.map(|v| v.bytes_compared).unwrap_or(0),
                    removed: self.removed[i],
                }
            })
            .collect();

        let now = Utc::now();
        let body = CertificateBody {
            certificate_id: new_certificate_id(),
            job_id: self.job_id.clone(),
            algorithm: AlgorithmSummary::from(&self.algorithm),
            overwrite_guarantee,
            operator_id: self.options.operator_id.clone(),
            root_path: self.root.clone(),
            targets,
            warnings: self.warnings.clone(),
            status,
            verification: summary,
            started_at: self.started_at,
            finished_at: now,
            generated_at: now,
        };
        self.shared.certificates.generate(body)
    }

    fn save_certificate(&self, certificate: &Certificate) -> WipeResult<CertificateFiles> {
        let dir = self
            .options
            .certificate_dir
            .clone()
            .unwrap_or_else(|| self.shared.config.certificate_dir());
        self.shared.certificates.save_certificate(certificate, &dir)
    }

    fn check_cancelled(&self) -> WipeResult<()> {
        if self.cancel.is_cancelled() {
            return Err(WipeError::Cancelled);
        }
        Ok(())
    }

    fn transition(&mut self, next: JobPhase) -> WipeResult<()> {
        if !self.phase.can_transition_to(next) {
            return Err(WipeError::InvalidArgument(format!(
                "illegal phase transition {} -> {}",
                self.phase, next
            )));
        }
        tracing::debug!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;

        if self.journalled {
            if let Err(e) = lock(&self.shared.journal).set_phase(&self.job_id, next, None) {
                tracing::warn!(error = %e, "Failed to journal phase");
            }
        }
        let _ = self.events.send(WipeEvent::Phase {
            job_id: self.job_id.clone(),
            phase: next,
        });
        self.publish_snapshot(None);
        Ok(())
    }

    /// Enter a terminal phase, recording the error in the journal.
    fn finish(&mut self, terminal: JobPhase, error: Option<&WipeError>) {
        if self.transition(terminal).is_err() {
            return;
        }
        if let (true, Some(e)) = (self.journalled, error) {
            let message = e.to_string();
            if let Err(e) = lock(&self.shared.journal).set_phase(&self.job_id, terminal, Some(&message)) {
                tracing::warn!(error = %e, "Failed to journal job error");
            }
        }
    }

    fn targets_completed(&self) -> usize {
        let pass_total = self.algorithm.pass_count();
        self.targets
            .iter()
            .filter(|t| t.passes_completed() >= pass_total)
            .count()
    }

    fn emit_progress(&self, index: usize, pass_index: usize) {
        let current = self.targets[index].path.clone();
        let event = ProgressEvent {
            job_id: self.job_id.clone(),
            targets_completed: self.targets_completed(),
            targets_total: self.targets.len(),
            current_target: current.clone(),
            pass_index,
            pass_total: self.algorithm.pass_count(),
            bytes_written: self.bytes_written,
            bytes_total: self.bytes_total,
        };
        tracing::debug!(
            path = %current.display(),
            pass = pass_index + 1,
            of = event.pass_total,
            bytes = event.bytes_written,
            "Progress"
        );
        let _ = self.events.send(WipeEvent::Progress(event));
        self.publish_snapshot(Some(current));
    }

    fn publish_snapshot(&self, current_target: Option<PathBuf>) {
        let snapshot = JobSnapshot {
            job_id: self.job_id.clone(),
            root: self.root.clone(),
            algorithm: self.algorithm.id,
            phase: self.phase,
            targets_total: self.targets.len(),
            targets_completed: self.targets_completed(),
            current_target,
            bytes_written: self.bytes_written,
            bytes_total: self.bytes_total,
            started_at: self.started_at,
            finished_at: self.phase.is_terminal().then(Utc::now),
        };
        self.snapshot.send_replace(snapshot);
    }

    fn report(
        &self,
        certificate: Option<Certificate>,
        certificate_files: Option<CertificateFiles>,
        error: Option<WipeError>,
    ) -> WipeReport {
        let pass_total = self.algorithm.pass_count();
        let targets: Vec<TargetReport> = self
            .targets
            .iter()
            .enumerate()
            .map(|(i, t)| TargetReport {
                path: t.path.clone(),
                kind: t.kind,
                length: t.length,
                passes_completed: t.passes_completed(),
                pass_total,
                verification: self.verification.get(i).cloned().flatten(),
                removed: self.removed.get(i).copied().unwrap_or(false),
                error: self.target_errors.get(i).cloned().flatten(),
            })
            .collect();
        let results: Vec<VerificationResult> =
            targets.iter().filter_map(|t| t.verification.clone()).collect();

        WipeReport {
            job_id: self.job_id.clone(),
            root: self.root.clone(),
            algorithm: self.algorithm.id,
            status: self.phase,
            targets,
            verification: VerificationSummary::from_results(&results),
            warnings: self.warnings.clone(),
            certificate,
            certificate_files,
            error,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
