use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::RunError;
use super::events::{estimate_max_duration, ProgressEvent, ProgressSink};
use super::timer::ElapsedTimer;
use crate::adapters::{ChunkRequest, Fuser, Splitter, Terminator, Transcriber};
use crate::session::{fused_file_name, RunReport, Session, TerminationStatus};

const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Where the orchestrator currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Splitting,
    Transcribing { cursor: usize, total: usize },
    Terminating,
}

/// One slice of the source audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub source_path: PathBuf,
}

/// The collaborators a run is driven through
#[derive(Clone)]
pub struct Collaborators {
    pub splitter: Arc<dyn Splitter>,
    pub transcriber: Arc<dyn Transcriber>,
    pub terminator: Arc<dyn Terminator>,
    pub fuser: Arc<dyn Fuser>,
}

/// Snapshot of the orchestrator for status displays
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub run_id: Option<Uuid>,
    #[serde(flatten)]
    pub phase: RunPhase,
    pub elapsed_secs: u64,
    pub fusion_offered: bool,
    pub artifacts: Vec<PathBuf>,
    pub last_session_name: Option<String>,
}

/// Artifacts kept between a run and a later fusion
#[derive(Debug, Default)]
struct ArtifactLedger {
    artifacts: Vec<PathBuf>,
    last_session_name: Option<String>,
    /// Run whose artifacts are currently offered for fusion
    offered_by: Option<Uuid>,
}

impl ArtifactLedger {
    fn fusion_offered(&self) -> bool {
        self.offered_by.is_some()
    }
}

/// Working state of the active run
struct Run {
    chunks: Vec<Chunk>,
    cursor: usize,
    error_count: usize,
    artifacts: Vec<PathBuf>,
}

#[derive(Clone)]
struct ActiveRun {
    run_id: Uuid,
    token: CancellationToken,
}

struct Inner {
    collaborators: Collaborators,
    sink: Arc<dyn ProgressSink>,
    running: AtomicBool,
    active: StdMutex<Option<ActiveRun>>,
    phase: RwLock<RunPhase>,
    ledger: Mutex<ArtifactLedger>,
    /// Serializes `fuse` calls without holding the ledger during a merge
    merging: Mutex<()>,
    /// Keeps offer and withdrawal notices of consecutive runs in order
    notices: Mutex<()>,
    timer: ElapsedTimer,
}

/// Drives split, sequential chunk transcription, termination and fusion
///
/// Cloning is cheap and every clone drives the same state. At most one run is
/// active at a time; at most one transcription call is outstanding within it.
#[derive(Clone)]
pub struct TranscriptionOrchestrator {
    inner: Arc<Inner>,
}

impl TranscriptionOrchestrator {
    pub fn new(collaborators: Collaborators, sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_timer_interval(collaborators, sink, DEFAULT_TIMER_INTERVAL)
    }

    pub fn with_timer_interval(
        collaborators: Collaborators,
        sink: Arc<dyn ProgressSink>,
        timer_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                collaborators,
                sink,
                running: AtomicBool::new(false),
                active: StdMutex::new(None),
                phase: RwLock::new(RunPhase::Idle),
                ledger: Mutex::new(ArtifactLedger::default()),
                merging: Mutex::new(()),
                notices: Mutex::new(()),
                timer: ElapsedTimer::new(timer_interval),
            }),
        }
    }

    /// Run a session to completion.
    pub async fn start_run(&self, session: Session) -> Result<RunReport, RunError> {
        self.prepare_run(session)?.run().await
    }

    /// Claim the orchestrator for `session` without starting any work yet.
    ///
    /// Fails with `AlreadyRunning` if another run holds it; the active run is
    /// left untouched.
    pub fn prepare_run(&self, session: Session) -> Result<PendingRun, RunError> {
        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Refusing to start {}: a run is already active", session.name);
            return Err(RunError::AlreadyRunning);
        }

        let guard = RunningGuard {
            inner: Arc::clone(&self.inner),
        };

        let active = ActiveRun {
            run_id: Uuid::new_v4(),
            token: CancellationToken::new(),
        };
        if let Ok(mut slot) = self.inner.active.lock() {
            *slot = Some(active.clone());
        }

        Ok(PendingRun {
            orchestrator: self.clone(),
            session,
            active,
            guard,
        })
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Ask the active run to stop scheduling chunks. Returns false when no
    /// run is active.
    pub fn request_cancel(&self) -> bool {
        match self.active_run() {
            Some(active) => {
                info!("Cancellation requested for run {}", active.run_id);
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn phase(&self) -> RunPhase {
        *self.inner.phase.read().await
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.timer.elapsed()
    }

    pub fn timer(&self) -> &ElapsedTimer {
        &self.inner.timer
    }

    pub async fn fusion_offered(&self) -> bool {
        self.inner.ledger.lock().await.fusion_offered()
    }

    pub async fn artifacts(&self) -> Vec<PathBuf> {
        self.inner.ledger.lock().await.artifacts.clone()
    }

    pub async fn last_session_name(&self) -> Option<String> {
        self.inner.ledger.lock().await.last_session_name.clone()
    }

    pub async fn status(&self) -> OrchestratorStatus {
        let phase = self.phase().await;
        let ledger = self.inner.ledger.lock().await;
        OrchestratorStatus {
            running: self.is_running(),
            run_id: self.active_run().map(|active| active.run_id),
            phase,
            elapsed_secs: self.elapsed().as_secs(),
            fusion_offered: ledger.fusion_offered(),
            artifacts: ledger.artifacts.clone(),
            last_session_name: ledger.last_session_name.clone(),
        }
    }

    /// Merge the artifacts of the last completed run.
    ///
    /// Only allowed while fusion is offered. On success the artifact list is
    /// consumed; on failure it is kept so the merge can be retried. The
    /// ledger stays readable while the merge is in progress.
    pub async fn fuse(&self) -> Result<PathBuf, RunError> {
        if self.is_running() {
            return Err(RunError::AlreadyRunning);
        }

        let _merging = self.inner.merging.lock().await;
        let (offer, artifacts, session_name) = {
            let ledger = self.inner.ledger.lock().await;
            let offer = ledger.offered_by.ok_or(RunError::FusionUnavailable)?;
            let session_name = ledger
                .last_session_name
                .clone()
                .ok_or(RunError::FusionUnavailable)?;
            (offer, ledger.artifacts.clone(), session_name)
        };

        let result = self
            .inner
            .collaborators
            .fuser
            .fuse(&artifacts, &fused_file_name(&session_name))
            .await;

        match result {
            Ok(output) => {
                {
                    let mut ledger = self.inner.ledger.lock().await;
                    // A run started meanwhile has already replaced the list
                    if ledger.offered_by == Some(offer) {
                        ledger.artifacts.clear();
                        ledger.offered_by = None;
                    }
                }
                self.emit(ProgressEvent::FusionCompleted {
                    output: output.clone(),
                })
                .await;
                Ok(output)
            }
            Err(err) => {
                self.emit(ProgressEvent::FusionFailed {
                    error: err.to_string(),
                })
                .await;
                Err(RunError::Fusion(err))
            }
        }
    }

    fn active_run(&self) -> Option<ActiveRun> {
        self.inner
            .active
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().cloned())
    }

    async fn set_phase(&self, phase: RunPhase) {
        *self.inner.phase.write().await = phase;
    }

    async fn emit(&self, event: ProgressEvent) {
        self.inner.sink.emit(event).await;
    }

    /// A new run discards whatever the previous one left for fusion.
    async fn reset_ledger(&self) {
        let _notices = self.inner.notices.lock().await;
        let withdrawn = {
            let mut ledger = self.inner.ledger.lock().await;
            ledger.artifacts.clear();
            ledger.offered_by.take().is_some()
        };
        if withdrawn {
            self.emit(ProgressEvent::FusionWithdrawn).await;
        }
    }

    /// Announce the offer made by `run_id`, unless it is already gone.
    async fn announce_fusion(&self, run_id: Uuid) {
        let _notices = self.inner.notices.lock().await;
        let artifacts = {
            let ledger = self.inner.ledger.lock().await;
            (ledger.offered_by == Some(run_id)).then(|| ledger.artifacts.len())
        };
        if let Some(artifacts) = artifacts {
            self.emit(ProgressEvent::FusionOffered { run_id, artifacts })
                .await;
        }
    }

    async fn finish(&self) {
        self.inner.timer.stop();
        self.set_phase(RunPhase::Idle).await;
        if let Ok(mut slot) = self.inner.active.lock() {
            *slot = None;
        }
    }

    async fn execute(
        &self,
        session: Session,
        active: ActiveRun,
        guard: RunningGuard,
    ) -> Result<RunReport, RunError> {
        let run_id = active.run_id;
        let token = active.token;
        let collaborators = &self.inner.collaborators;
        let started_at = Utc::now();

        self.reset_ledger().await;
        self.inner.timer.start();
        self.set_phase(RunPhase::Splitting).await;

        info!("Run {} started for session {}", run_id, session.name);
        self.emit(ProgressEvent::SplitStarted {
            run_id,
            session_name: session.name.clone(),
            file_path: session.file_path.clone(),
            chunk_minutes: session.chunk_duration_minutes,
        })
        .await;

        let paths = match collaborators
            .splitter
            .split(
                &session.file_path,
                &session.name,
                session.chunk_duration_minutes,
            )
            .await
        {
            Ok(paths) => paths,
            Err(err) => {
                // Nothing was allocated for this run, so termination is skipped
                self.emit(ProgressEvent::SplitFailed {
                    run_id,
                    error: err.to_string(),
                })
                .await;
                self.finish().await;
                drop(guard);
                return Err(RunError::Split(err));
            }
        };

        let mut run = Run {
            chunks: paths
                .into_iter()
                .enumerate()
                .map(|(index, source_path)| Chunk { index, source_path })
                .collect(),
            cursor: 0,
            error_count: 0,
            artifacts: Vec::new(),
        };
        let total = run.chunks.len();

        self.emit(ProgressEvent::SplitCompleted {
            run_id,
            chunks: run.chunks.iter().map(|c| c.source_path.clone()).collect(),
            estimated_max_secs: estimate_max_duration(total, session.chunk_duration_minutes)
                .as_secs(),
        })
        .await;

        while run.cursor < total {
            if token.is_cancelled() {
                break;
            }

            let chunk = &run.chunks[run.cursor];
            let request = ChunkRequest {
                chunk_path: chunk.source_path.clone(),
                use_system_proxy: session.use_system_proxy,
                language: session.language.clone(),
                label: session.chunk_label(chunk.index),
            };

            self.set_phase(RunPhase::Transcribing {
                cursor: run.cursor,
                total,
            })
            .await;
            self.emit(ProgressEvent::ChunkDispatched {
                run_id,
                index: chunk.index,
                total,
                label: request.label.clone(),
            })
            .await;

            let index = chunk.index;
            match collaborators.transcriber.transcribe(&request).await {
                Ok(artifact) => {
                    run.artifacts.push(artifact.clone());
                    self.emit(ProgressEvent::ChunkSucceeded {
                        run_id,
                        index,
                        artifact,
                    })
                    .await;
                }
                Err(err) => {
                    run.error_count += 1;
                    self.emit(ProgressEvent::ChunkFailed {
                        run_id,
                        index,
                        error: err.to_string(),
                    })
                    .await;
                }
            }

            if token.is_cancelled() {
                break;
            }
            run.cursor += 1;
        }

        let cancelled = token.is_cancelled();
        self.set_phase(RunPhase::Terminating).await;

        let termination = match collaborators.terminator.terminate(cancelled).await {
            Ok(message) => TerminationStatus::Completed(message),
            Err(err) => TerminationStatus::Failed(err.to_string()),
        };
        let (message, cleanup_error) = match &termination {
            TerminationStatus::Completed(message) => (Some(message.clone()), None),
            TerminationStatus::Failed(err) => (None, Some(err.clone())),
        };
        self.emit(ProgressEvent::RunTerminated {
            run_id,
            cancelled,
            error_count: run.error_count,
            message,
            cleanup_error,
        })
        .await;

        let fusion_offered = !cancelled && run.artifacts.len() >= 2;
        {
            let mut ledger = self.inner.ledger.lock().await;
            ledger.last_session_name = Some(session.name.clone());
            ledger.artifacts = if cancelled {
                Vec::new()
            } else {
                run.artifacts.clone()
            };
            ledger.offered_by = fusion_offered.then_some(run_id);
        }

        // Idle and unclaimed before the offer is announced
        self.finish().await;
        drop(guard);
        if fusion_offered {
            self.announce_fusion(run_id).await;
        }

        debug!(
            "Run {} done: {} chunks, {} errors, cancelled: {}",
            run_id, total, run.error_count, cancelled
        );

        Ok(RunReport {
            run_id,
            session_name: session.name,
            started_at,
            finished_at: Utc::now(),
            chunk_count: total,
            error_count: run.error_count,
            cancelled,
            transcribed: run.artifacts,
            termination,
            fusion_offered,
        })
    }
}

/// A run that holds the orchestrator but has not started yet
///
/// Dropping it without calling [`PendingRun::run`] releases the orchestrator.
pub struct PendingRun {
    orchestrator: TranscriptionOrchestrator,
    session: Session,
    active: ActiveRun,
    guard: RunningGuard,
}

impl PendingRun {
    pub fn run_id(&self) -> Uuid {
        self.active.run_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Token observed by this run; cancelling it is equivalent to
    /// `TranscriptionOrchestrator::request_cancel`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.active.token.clone()
    }

    /// Execute the run on its own task and wait for its report.
    ///
    /// Dropping the returned future does not abort the run: it carries on
    /// through termination in the background, and the orchestrator stays
    /// claimed until it has.
    pub async fn run(self) -> Result<RunReport, RunError> {
        let PendingRun {
            orchestrator,
            session,
            active,
            guard,
        } = self;
        let run_id = active.run_id;

        let handle =
            tokio::spawn(async move { orchestrator.execute(session, active, guard).await });

        match handle.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                warn!("Run {} did not complete: {}", run_id, err);
                Err(RunError::Interrupted(run_id))
            }
        }
    }
}

/// Releases the single-run claim when the run ends, however it ends
struct RunningGuard {
    inner: Arc<Inner>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        // Normally already done by `finish`; covers a run that never got there
        self.inner.timer.stop();
        if let Ok(mut phase) = self.inner.phase.try_write() {
            *phase = RunPhase::Idle;
        }
        if let Ok(mut slot) = self.inner.active.lock() {
            *slot = None;
        }
        self.inner.running.store(false, Ordering::SeqCst);
    }
}
