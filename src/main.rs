use albertine::adapters::{encrypt_api_key, fetch_api_key};
use albertine::run::{BroadcastSink, ProgressSink};
use albertine::{app, create_router, AppState, Config, Session, SettingsStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "albertine", version, about = "Chunked audio transcription runs")]
struct Cli {
    /// Service configuration file (extension optional)
    #[arg(short, long, default_value = "config/albertine")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe one audio file, chunk by chunk
    Run {
        /// Session name (4-20 letters, digits, '-' or '_')
        #[arg(short, long)]
        name: String,

        /// Audio file to transcribe
        #[arg(short, long)]
        file: PathBuf,

        /// Chunk duration in minutes, overriding the stored setting
        #[arg(long)]
        chunk_duration: Option<u32>,

        /// Language code, overriding the stored setting
        #[arg(long)]
        language: Option<String>,

        /// Bypass the system proxy for this run
        #[arg(long)]
        no_proxy: bool,

        /// Merge the transcripts once the run completes
        #[arg(long)]
        fuse: bool,
    },
    /// Serve the HTTP API
    Serve,
    /// Show or change the stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Obfuscate an API key for storage in the key file
    EncryptKey { key: String },
    /// Download the obfuscated API key to the configured key file
    FetchKey,
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        chunk_duration: Option<u32>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        no_proxy: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    info!("Albertine v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run {
            name,
            file,
            chunk_duration,
            language,
            no_proxy,
            fuse,
        } => {
            let store = SettingsStore::load(cfg.settings.path())?;
            let settings = store.settings();
            let session = Session::with_options(
                name,
                file,
                chunk_duration.unwrap_or(settings.chunk_duration),
                language.unwrap_or_else(|| settings.language.clone()),
                !(no_proxy || settings.no_proxy),
            )?;
            run_once(&cfg, session, fuse).await
        }
        Command::Serve => serve(&cfg).await,
        Command::Settings { action } => {
            let mut store = SettingsStore::load(cfg.settings.path())?;
            if let SettingsAction::Set {
                chunk_duration,
                language,
                no_proxy,
            } = action
            {
                if let Some(minutes) = chunk_duration {
                    store.set_chunk_duration(minutes)?;
                }
                if let Some(language) = language {
                    store.set_language(&language)?;
                }
                if let Some(no_proxy) = no_proxy {
                    store.set_no_proxy(no_proxy)?;
                }
            }
            println!("{}", serde_json::to_string_pretty(store.settings())?);
            Ok(())
        }
        Command::EncryptKey { key } => {
            println!("{}", encrypt_api_key(&key));
            Ok(())
        }
        Command::FetchKey => {
            let url = cfg
                .transcription
                .key_url
                .as_deref()
                .context("transcription.key_url is not configured")?;
            fetch_api_key(url, cfg.transcription.key_file()).await
        }
    }
}

async fn run_once(cfg: &Config, session: Session, fuse: bool) -> Result<()> {
    let orchestrator = app::orchestrator(cfg, Vec::new()).await?;

    // First Ctrl-C stops scheduling; the chunk in flight still completes
    let canceller = orchestrator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, no further chunks will be sent");
            canceller.request_cancel();
        }
    });

    let report = orchestrator.start_run(session).await?;
    info!(
        "{} ({} chunks in {:.1}s)",
        report.summary(),
        report.chunk_count,
        report.duration_secs()
    );

    if fuse && report.fusion_offered {
        match orchestrator.fuse().await {
            Ok(output) => info!("Merged transcript: {}", output.display()),
            Err(e) => error!("{}", e),
        }
    }

    Ok(())
}

async fn serve(cfg: &Config) -> Result<()> {
    let events = BroadcastSink::new(256);
    let extra: Vec<Arc<dyn ProgressSink>> = vec![Arc::new(events.clone())];
    let orchestrator = app::orchestrator(cfg, extra).await?;
    let settings = SettingsStore::load(cfg.settings.path())?;

    let router = create_router(AppState::new(orchestrator, settings, events));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;

    Ok(())
}
