// Scripted collaborators shared by the orchestrator and HTTP tests.
#![allow(dead_code)]

use albertine::run::{Collaborators, ProgressEvent, ProgressSink, TranscriptionOrchestrator};
use albertine::{
    AdapterError, CancellationToken, ChunkRequest, Fuser, Splitter, Terminator, Transcriber,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn chunk_paths(count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| PathBuf::from(format!("chunks/chunk-{}.wav", i)))
        .collect()
}

pub fn artifact_for(chunk: &Path) -> PathBuf {
    let stem = chunk.file_stem().unwrap().to_string_lossy().into_owned();
    PathBuf::from(format!("out/{}.txt", stem))
}

/// Returns a fixed chunk list, or fails with a format error
pub struct FixedSplitter {
    result: Result<Vec<PathBuf>, String>,
    pub calls: Mutex<Vec<(PathBuf, String, u32)>>,
}

impl FixedSplitter {
    pub fn chunks(count: usize) -> Self {
        Self {
            result: Ok(chunk_paths(count)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Splitter for FixedSplitter {
    async fn split(
        &self,
        file_path: &Path,
        session_name: &str,
        chunk_minutes: u32,
    ) -> Result<Vec<PathBuf>, AdapterError> {
        self.calls.lock().unwrap().push((
            file_path.to_path_buf(),
            session_name.to_string(),
            chunk_minutes,
        ));
        self.result.clone().map_err(AdapterError::Format)
    }
}

/// Succeeds for every chunk except the scripted failures, and tracks how
/// many calls overlap
#[derive(Default)]
pub struct ScriptedTranscriber {
    failing: HashSet<PathBuf>,
    pub calls: Mutex<Vec<ChunkRequest>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_during: Mutex<Option<(usize, CancellationToken)>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the chunks at these indexes
    pub fn failing_at(indexes: &[usize]) -> Self {
        let paths = chunk_paths(indexes.iter().copied().max().map_or(0, |m| m + 1));
        Self {
            failing: indexes.iter().map(|&i| paths[i].clone()).collect(),
            ..Self::default()
        }
    }

    /// Every call signals `started`, then waits for `release`
    pub fn gated(started: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((started, release)),
            ..Self::default()
        }
    }

    /// Request `token` while the call for chunk `index` is in flight
    pub fn cancel_during(&self, index: usize, token: CancellationToken) {
        *self.cancel_during.lock().unwrap() = Some((index, token));
    }

    pub fn dispatched(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.chunk_path.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, request: &ChunkRequest) -> Result<PathBuf, AdapterError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };

        if let Some((index, token)) = self.cancel_during.lock().unwrap().as_ref() {
            if *index == call_index {
                token.cancel();
            }
        }

        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }
        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&request.chunk_path) {
            Err(AdapterError::Service {
                status: 503,
                message: "service unavailable".to_string(),
            })
        } else {
            Ok(artifact_for(&request.chunk_path))
        }
    }
}

#[derive(Default)]
pub struct RecordingTerminator {
    fail: bool,
    pub calls: Mutex<Vec<bool>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<bool> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Terminator for RecordingTerminator {
    async fn terminate(&self, cancelled: bool) -> Result<String, AdapterError> {
        self.calls.lock().unwrap().push(cancelled);
        if self.fail {
            Err(AdapterError::Cleanup("permission denied".to_string()))
        } else {
            Ok("Temporary files removed.".to_string())
        }
    }
}

/// Fails the first `failures` calls, then writes nothing and returns
/// `out/<name>`
#[derive(Default)]
pub struct RecordingFuser {
    failures: AtomicUsize,
    pub calls: Mutex<Vec<(Vec<PathBuf>, String)>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl RecordingFuser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_times(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    /// Every merge signals `started`, then waits for `release`
    pub fn gated(started: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((started, release)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(Vec<PathBuf>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fuser for RecordingFuser {
    async fn fuse(&self, artifacts: &[PathBuf], output_name: &str) -> Result<PathBuf, AdapterError> {
        self.calls
            .lock()
            .unwrap()
            .push((artifacts.to_vec(), output_name.to_string()));

        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AdapterError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only output directory",
            )));
        }
        Ok(PathBuf::from("out").join(output_name))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub orchestrator: TranscriptionOrchestrator,
    pub splitter: Arc<FixedSplitter>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub terminator: Arc<RecordingTerminator>,
    pub fuser: Arc<RecordingFuser>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(splitter: FixedSplitter, transcriber: ScriptedTranscriber) -> Self {
        Self::with_all(
            splitter,
            transcriber,
            RecordingTerminator::new(),
            RecordingFuser::new(),
        )
    }

    pub fn with_all(
        splitter: FixedSplitter,
        transcriber: ScriptedTranscriber,
        terminator: RecordingTerminator,
        fuser: RecordingFuser,
    ) -> Self {
        let splitter = Arc::new(splitter);
        let transcriber = Arc::new(transcriber);
        let terminator = Arc::new(terminator);
        let fuser = Arc::new(fuser);
        let sink = Arc::new(RecordingSink::default());

        let orchestrator = TranscriptionOrchestrator::new(
            Collaborators {
                splitter: splitter.clone(),
                transcriber: transcriber.clone(),
                terminator: terminator.clone(),
                fuser: fuser.clone(),
            },
            sink.clone(),
        );

        Self {
            orchestrator,
            splitter,
            transcriber,
            terminator,
            fuser,
            sink,
        }
    }
}
