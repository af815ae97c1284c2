//! Error types for the HTTP server.

use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Server startup and runtime error.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address could not be bound (port in use, no permission).
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The root directory is missing or not a directory.
    #[error("Invalid root directory {}: {source}", path.display())]
    RootDir {
        /// Configured root directory.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },

    /// I/O error while running the server.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Per-request error, turned into an HTTP status.
#[derive(Debug, thiserror::Error)]
pub(crate) enum RequestError {
    /// Request path resolves outside the root directory.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Request path being served.
        path: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl RequestError {
    /// Classify a filesystem error for `path`.
    ///
    /// Missing files, non-directories used as directories and unreadable
    /// entries are all reported as not found.
    pub(crate) fn from_io(path: &str, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::PermissionDenied => Self::NotFound(path.to_owned()),
            _ => Self::Io {
                path: path.to_owned(),
                source,
            },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Io { path, source } => {
                tracing::error!(path, error = %source, "I/O error while serving request");
            }
            Self::Forbidden(path) => tracing::warn!(path, "Rejected path outside root"),
            Self::NotFound(_) => {}
        }

        let reason = status.canonical_reason().unwrap_or_default();
        (status, format!("{} {reason}\n", status.as_u16())).into_response()
    }
}
