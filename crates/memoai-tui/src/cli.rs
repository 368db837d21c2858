//! Command-line arguments.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use memoai_app::state::ModelSettings;
use memoai_client::ClientConfig;
use memoai_core::ConnectionConfig;
use memoai_proto::endpoint::DEFAULT_BASE_URL;

/// MemoAI terminal chat client
#[derive(Parser, Debug, Clone)]
#[command(name = "memoai-tui")]
#[command(about = "Terminal chat client for the MemoAI backend")]
#[command(version)]
pub struct Args {
    /// Backend base URL
    #[arg(short, long, env = "MEMOAI_SERVER", default_value = DEFAULT_BASE_URL)]
    pub server: String,

    /// Ask for whole answers instead of streamed chunks
    #[arg(long)]
    pub no_streaming: bool,

    /// Delay before reconnecting after the connection drops
    #[arg(long, default_value_t = 1000)]
    pub reconnect_delay_ms: u64,

    /// Preferences database
    #[arg(long, default_value = "memoai-prefs.redb")]
    pub prefs: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log file; the terminal itself is taken by the UI
    #[arg(long, default_value = "memoai-tui.log")]
    pub log_file: PathBuf,
}

impl Args {
    /// Client configuration for these arguments.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.clone(),
            connection: ConnectionConfig {
                reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
                ..ConnectionConfig::default()
            },
        }
    }

    /// Generation settings for these arguments.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings { streaming: !self.no_streaming, ..ModelSettings::default() }
    }
}
