pub mod adapters;
pub mod app;
pub mod config;
pub mod http;
pub mod nats;
pub mod run;
pub mod session;
pub mod settings;

pub use adapters::{AdapterError, ChunkRequest, Fuser, Splitter, Terminator, Transcriber};
pub use config::Config;
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsProgressSink, ProgressMessage};
pub use run::{
    BroadcastSink, CancellationToken, Chunk, Collaborators, ElapsedTimer, LogSink, PendingRun,
    ProgressEvent, ProgressSink, RunError, RunPhase, TranscriptionOrchestrator,
};
pub use session::{
    check_session_name, validate_session_name, NameRejection, RunReport, Session, SessionError,
    TerminationStatus,
};
pub use settings::{Settings, SettingsStore};
