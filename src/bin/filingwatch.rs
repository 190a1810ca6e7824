//! filingwatch CLI — polls the BSE announcement feed and alerts on new
//! financial-results filings.
//!
//! Usage:
//!   filingwatch run [--state path]
//!   filingwatch watch [--interval secs] [--state path]
//!   filingwatch status [--state path]
//!   filingwatch reset [--state path]
//!
//! Settings come from the environment (WATCHLIST_CODES, MAX_PAGES,
//! MAX_ALERTS_PER_RUN, TELEGRAM_BOT_TOKEN, ...).

use clap::{Parser, Subcommand};
use filingwatch::watermark::lock_path_for;
use filingwatch::{
    BseSource, DisabledNotifier, FileWatermarkStore, Notifier, RunLock, TelegramNotifier,
    WatchConfig, WatchError, WatchPipeline, WatermarkStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "filingwatch",
    version,
    about = "Alerts on new financial-results disclosures"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to the watermark file (overrides STATE_FILE)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one ingestion cycle and exit
    Run,
    /// Run cycles back to back until interrupted
    Watch {
        /// Seconds between the end of one cycle and the start of the next
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
    /// Print the persisted watermark
    Status,
    /// Forget the watermark; the next run bootstraps
    Reset,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_pipeline(config: Arc<WatchConfig>) -> Result<WatchPipeline, WatchError> {
    info!(
        state = %config.state_path.display(),
        watchlist = config.watchlist.len(),
        max_pages = config.max_pages,
        max_alerts = config.max_notifications,
        today_only = config.recency_filter,
        bootstrap = config.bootstrap_if_empty,
        "configuration loaded"
    );
    let source = BseSource::new(config.request_timeout)?.with_page_size(config.page_size);
    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(creds) => Arc::new(TelegramNotifier::new(
            creds.bot_token.clone(),
            creds.chat_id.clone(),
            config.request_timeout,
        )?),
        None => {
            warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set; alerts will only be logged");
            Arc::new(DisabledNotifier)
        }
    };
    let store = FileWatermarkStore::new(&config.state_path);
    let lock = lock_path_for(&config.state_path);

    Ok(WatchPipeline::new(config, Arc::new(source), Arc::new(store), notifier).with_lock(lock))
}

fn runtime() -> Result<tokio::runtime::Runtime, i32> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error!(error = %e, "failed to create tokio runtime");
            1
        })
}

/// Exit code for one cycle. A concurrent run is a skip, not a failure.
async fn run_cycle(pipeline: &WatchPipeline) -> i32 {
    match pipeline.run().await {
        Ok(_) => 0,
        Err(WatchError::AlreadyRunning(path)) => {
            warn!(lock = %path.display(), "another run is in progress; skipping");
            0
        }
        Err(e) => {
            error!(error = %e, "run failed");
            1
        }
    }
}

fn cmd_run(config: Arc<WatchConfig>) -> i32 {
    let pipeline = match build_pipeline(config) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "startup failed");
            return 1;
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    rt.block_on(run_cycle(&pipeline))
}

fn cmd_watch(config: Arc<WatchConfig>, interval: u64) -> i32 {
    let pipeline = match build_pipeline(config) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "startup failed");
            return 1;
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };
    rt.block_on(async {
        info!(interval_secs = interval, "watching");
        loop {
            run_cycle(&pipeline).await;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted; stopping");
                    return 0;
                }
            }
        }
    })
}

fn cmd_status(config: &WatchConfig) -> i32 {
    let store = FileWatermarkStore::new(&config.state_path);
    let load = store.load();
    match load.last_sequence_id {
        Some(id) => println!("{}  last_sequence_id={}", config.state_path.display(), id),
        None if load.corrupt => println!("{}  unreadable (next run bootstraps)", config.state_path.display()),
        None => println!("{}  absent (next run bootstraps)", config.state_path.display()),
    }
    0
}

fn cmd_reset(config: &WatchConfig) -> i32 {
    let _lock = match RunLock::try_acquire(lock_path_for(&config.state_path)) {
        Ok(lock) => lock,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match FileWatermarkStore::new(&config.state_path).clear() {
        Ok(()) => {
            println!("Cleared watermark at {}", config.state_path.display());
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let mut config = match WatchConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };
    if let Some(state) = cli.state {
        config = config.with_state_path(state);
    }

    let code = match cli.command {
        Commands::Run => cmd_run(Arc::new(config)),
        Commands::Watch { interval } => cmd_watch(Arc::new(config), interval),
        Commands::Status => cmd_status(&config),
        Commands::Reset => cmd_reset(&config),
    };
    std::process::exit(code);
}
