//! `wisp serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use wisp_config::{CliSettings, Config};
use wisp_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover wisp.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Site port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Live-reload WebSocket port to bind to (overrides config).
    #[arg(long)]
    ws_port: Option<u16>,

    /// Reload debounce window in milliseconds (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Enable verbose output (show server and watcher logs).
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        // Resolve flags before moving into CliSettings
        let live_reload_enabled = self.resolve_live_reload_enabled();

        // Build CLI settings from args
        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            ws_port: self.ws_port,
            root: self.root,
            live_reload_enabled,
            debounce_ms: self.debounce_ms,
        };

        // Load config
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(?config, "configuration loaded");

        // Print startup banner
        output.separator();
        output.highlight(&format!("wisp {version}"));
        output.info(&format!(
            "Serving {} at http://{}:{}",
            config.site_resolved.root.display(),
            config.server.host,
            config.server.port
        ));
        if config.live_reload.enabled {
            output.info(&format!(
                "Live reload on ws://{}:{}",
                config.server.host, config.server.ws_port
            ));
        } else {
            output.info("Live reload: disabled");
        }
        output.info("Press Ctrl+C to stop");
        output.separator();

        // Build server config and run
        let server_config = server_config_from_config(&config);
        run_server(server_config).await?;

        Ok(())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}
