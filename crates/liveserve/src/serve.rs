//! Serve command: file server plus change watcher.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use liveserve_config::{CliSettings, Config};
use liveserve_server::{Server, server_config_from_config};
use liveserve_watch::{ChangeEvents, ChangeWatcher, WatchHandle};
use tokio::task::JoinHandle;

use crate::browser;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for serving a directory.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover liveserve.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve and watch (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long, env = "LIVESERVE_PORT")]
    port: Option<u16>,

    /// Do not open the browser on startup.
    #[arg(long)]
    no_browser: bool,

    /// Disable change notifications.
    #[arg(long)]
    no_watch: bool,

    /// Enable verbose output (debug logging).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Serve until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server cannot bind.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        self.run(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then stop the watcher.
    async fn run<F>(self, shutdown: F) -> Result<(), CliError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            root_dir: self.root,
            open_browser: self.no_browser.then_some(false),
            watch_enabled: self.no_watch.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let server_config = server_config_from_config(&config);

        // Dropping the handle on an early return releases the watch
        let watch = if config.watch.enabled {
            start_watcher(
                &server_config.root_dir,
                Duration::from_millis(config.watch.debounce_ms),
                &output,
            )
        } else {
            None
        };

        let server = Server::bind(&server_config).await?;
        let url = server.url();

        output.success(&format!("Server running at {url}"));
        output.info(&format!("Serving files from: {}", server.root_dir().display()));
        if watch.is_some() {
            output.info("Watching for file changes...");
        } else {
            output.info("File watching: disabled");
        }
        output.info("Press Ctrl+C to stop");

        if config.server.open_browser
            && let Err(e) = browser::open(&url)
        {
            output.warning(&format!("Could not open browser: {e}"));
        }

        let (notifier, watch_handle) = match watch {
            Some((events, handle)) => (Some(spawn_notifier(events)), Some(handle)),
            None => (None, None),
        };

        server.serve(shutdown).await?;

        if let Some(handle) = watch_handle
            && tokio::task::spawn_blocking(move || handle.stop())
                .await
                .is_err()
        {
            tracing::warn!("Failed to stop change watcher cleanly");
        }
        // The event stream ends once the watcher is gone
        if let Some(notifier) = notifier {
            let _ = notifier.await;
        }

        output.info("");
        output.info("Server stopped");
        Ok(())
    }
}

/// Start the change watcher, degrading to serve-only on failure.
fn start_watcher(
    root_dir: &Path,
    debounce: Duration,
    output: &Output,
) -> Option<(ChangeEvents, WatchHandle)> {
    match ChangeWatcher::new(root_dir).with_debounce(debounce).start() {
        Ok(watch) => Some(watch),
        Err(e) => {
            tracing::warn!(error = %e, "Change watcher unavailable");
            output.warning(&format!(
                "Warning: {e}. Serving without change notifications."
            ));
            None
        }
    }
}

/// Print a reminder for every reported change.
fn spawn_notifier(mut events: ChangeEvents) -> JoinHandle<()> {
    tokio::spawn(async move {
        let output = Output::new();
        while let Some(event) = events.recv().await {
            output.highlight(&format!("File changed: {}", event.path.display()));
            output.info("Refresh your browser to see changes!");
        }
    })
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
