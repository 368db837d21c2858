//! MemoAI TUI entry point.
//!
//! # Usage
//!
//! ```bash
//! # Local backend on the default port
//! memoai-tui
//!
//! # Remote backend, answers delivered whole
//! memoai-tui --server https://memoai.example.com --no-streaming
//! ```

use std::{fs::OpenOptions, sync::Mutex};

use clap::Parser;
use memoai_app::{SystemEnv, prefs::RedbPreferenceStore};
use memoai_tui::{Args, Runtime, TerminalDriver};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // The terminal belongs to the UI, so logs go to a file.
    let log_file = OpenOptions::new().create(true).append(true).open(&args.log_file)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(log_file)).with_ansi(false))
        .with(filter)
        .init();

    tracing::info!(server = %args.server, "MemoAI TUI starting");

    let prefs = RedbPreferenceStore::open(&args.prefs)?;
    let config = args.client_config();
    let driver = TerminalDriver::new(config.connection.handshake_timeout)?;
    let mut runtime = Runtime::new(driver, SystemEnv::new(), config, prefs);
    let _ = runtime.app_mut().set_model_settings(args.model_settings());

    runtime.run().await?;

    tracing::info!("MemoAI TUI stopped");
    Ok(())
}
