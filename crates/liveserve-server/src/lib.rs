//! Static file HTTP server for liveserve.
//!
//! This crate provides a native Rust HTTP server using axum that serves a
//! directory tree:
//! - GET/HEAD on any path under the root directory
//! - `index.html`/`index.htm` for directories, or an HTML listing
//! - 403 for paths escaping the root, 404 for missing paths
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use liveserve_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         host: "0.0.0.0".to_string(),
//!         port: 8000,
//!         root_dir: PathBuf::from("site"),
//!         ..ServerConfig::default()
//!     };
//!
//!     let server = Server::bind(&config).await.unwrap();
//!     println!("Serving at {}", server.url());
//!     server
//!         .serve(async { tokio::signal::ctrl_c().await.unwrap() })
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (liveserve-server)
//!                        │
//!                        ├─► access log middleware (tracing)
//!                        │
//!                        └─► resolve path ──► canonicalize ──► root check
//!                                 │
//!                                 ├─► file      ──► tower-http ServeFile
//!                                 ├─► directory ──► index.html / listing
//!                                 └─► error     ──► 403 / 404 / 500
//! ```

mod app;
mod error;
mod listing;
mod middleware;
mod resolve;
mod state;
mod static_files;

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

pub use error::ServerError;
use state::AppState;

/// Default time in-flight requests get to finish after shutdown is requested.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on (`0` lets the OS choose).
    pub port: u16,
    /// Directory tree to serve.
    pub root_dir: PathBuf,
    /// How long open connections may keep running once shutdown starts.
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            root_dir: PathBuf::from("."),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// A bound, not yet serving, HTTP server.
///
/// Binding and serving are separate steps so the caller can act (e.g. open a
/// browser) once the port is known to be taken.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    root_dir: PathBuf,
    shutdown_grace: Duration,
}

impl Server {
    /// Validate the root directory and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::RootDir`] if the root is missing or not a
    /// directory, and [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let root_dir = canonical_root(&config.root_dir)?;

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(address = %local_addr, root = %root_dir.display(), "Server listening");

        Ok(Self {
            listener,
            local_addr,
            root_dir,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Canonical root directory being served.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// URL to open in a browser.
    #[must_use]
    pub fn url(&self) -> String {
        browser_url(self.local_addr)
    }

    /// Serve requests until `shutdown` resolves.
    ///
    /// After `shutdown` resolves no new connections are accepted. In-flight
    /// requests get the configured grace period to finish; connections still
    /// open after that (stalled or slow clients) are abandoned.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop fails.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = Arc::new(AppState {
            root_dir: self.root_dir,
        });
        let app = app::create_router(state);

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let signal = async move {
            shutdown.await;
            let _ = started_tx.send(());
        };
        let server = axum::serve(
            self.listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .into_future();

        let grace = self.shutdown_grace;
        let deadline = async move {
            match started_rx.await {
                Ok(()) => tokio::time::sleep(grace).await,
                // The server ended on its own before shutdown was requested
                Err(_) => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = server => result?,
            () = deadline => {
                tracing::warn!(
                    grace_ms = grace.as_millis(),
                    "Connections still open after shutdown grace period, closing"
                );
            }
        }

        tracing::info!(address = %self.local_addr, "Server stopped");
        Ok(())
    }
}

/// Build the router for `root_dir` without binding a socket.
///
/// # Errors
///
/// Returns [`ServerError::RootDir`] if the root is missing or not a directory.
pub fn router(root_dir: &Path) -> Result<Router, ServerError> {
    let root_dir = canonical_root(root_dir)?;
    Ok(app::create_router(Arc::new(AppState { root_dir })))
}

/// Browser URL for a bound address.
///
/// Wildcard and loopback addresses map to `localhost`.
#[must_use]
pub fn browser_url(addr: SocketAddr) -> String {
    let ip = addr.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        format!("http://localhost:{}/", addr.port())
    } else {
        format!("http://{addr}/")
    }
}

/// Create server configuration from liveserve config.
#[must_use]
pub fn server_config_from_config(config: &liveserve_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        root_dir: config.serve_resolved.root_dir.clone(),
        shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
    }
}

/// Canonicalize the root and require it to be a directory.
fn canonical_root(path: &Path) -> Result<PathBuf, ServerError> {
    let root_err = |source| ServerError::RootDir {
        path: path.to_path_buf(),
        source,
    };
    let root_dir = std::fs::canonicalize(path).map_err(root_err)?;
    if !root_dir.is_dir() {
        return Err(root_err(io::Error::from(io::ErrorKind::NotADirectory)));
    }
    Ok(root_dir)
}
