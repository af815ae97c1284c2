//! Filesystem change watcher for liveserve.
//!
//! Watches a root directory recursively and reports modifications to web
//! source files (`.html`, `.css`, `.js`). Creation, deletion and rename events
//! are deliberately not reported.
//!
//! # Example
//!
//! ```ignore
//! use liveserve_watch::ChangeWatcher;
//!
//! let (mut events, handle) = ChangeWatcher::new("site").start()?;
//! while let Some(event) = events.recv().await {
//!     println!("File changed: {}", event.path.display());
//! }
//! handle.stop();
//! ```
//!
//! # Threads
//!
//! ```text
//! notify callback ──record──► EventDebouncer ◄──drain (every 50ms)── drain thread
//!                                                                        │
//!                                                    ChangeEvents ◄──────┘
//! ```
//!
//! The drain thread owns the OS watcher, so joining it in
//! [`WatchHandle::stop`] releases the underlying watch descriptors.

mod debouncer;

use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

use debouncer::EventDebouncer;

/// File extensions whose modification triggers a notification.
pub const WATCHED_EXTENSIONS: &[&str] = &["html", "css", "js"];

/// Default debounce duration.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// How often the drain thread checks for ready events and shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created.
    Created,
    /// File contents were modified.
    Modified,
    /// File was removed.
    Removed,
}

/// A change to a file under the watched root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// Kind of change.
    pub kind: ChangeKind,
}

/// Watcher error.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The OS watch could not be registered on the root directory.
    #[error("Failed to watch {}: {source}", path.display())]
    Setup {
        /// Directory that could not be watched.
        path: PathBuf,
        /// Underlying notify error.
        #[source]
        source: notify::Error,
    },
}

impl WatchError {
    fn setup(path: &Path, source: notify::Error) -> Self {
        Self::Setup {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Recursive watcher over a root directory.
pub struct ChangeWatcher {
    root_dir: PathBuf,
    extensions: Vec<String>,
    debounce: Duration,
}

impl ChangeWatcher {
    /// Create a watcher for `root_dir` using the default allow-list.
    #[must_use]
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            extensions: WATCHED_EXTENSIONS.iter().map(|&e| e.to_owned()).collect(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Set the debounce duration.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Replace the extension allow-list (without leading dots).
    #[must_use]
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    /// Directory being watched.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Register the recursive watch and spawn the drain thread.
    ///
    /// Subdirectories created after this call are picked up automatically.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Setup`] if the root cannot be resolved or watched.
    pub fn start(self) -> Result<(ChangeEvents, WatchHandle), WatchError> {
        let root_dir = self
            .root_dir
            .canonicalize()
            .map_err(|e| WatchError::setup(&self.root_dir, notify::Error::io(e)))?;

        let (event_tx, event_rx) = async_mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let debouncer = Arc::new(EventDebouncer::new(self.debounce));

        let watcher_debouncer = Arc::clone(&debouncer);
        let watcher_root = root_dir.clone();
        let mut watcher = notify::recommended_watcher(move |res| {
            record_notify_event(res, &watcher_root, &watcher_debouncer);
        })
        .map_err(|e| WatchError::setup(&root_dir, e))?;

        watcher
            .watch(&root_dir, RecursiveMode::Recursive)
            .map_err(|e| WatchError::setup(&root_dir, e))?;

        tracing::debug!(root = %root_dir.display(), "Watching for changes");

        // The drain thread owns the watcher so that joining it releases the OS watch.
        let extensions = self.extensions;
        let thread = std::thread::Builder::new()
            .name("liveserve-watch".to_owned())
            .spawn(move || {
                let _watcher = watcher;

                loop {
                    match shutdown_rx.recv_timeout(POLL_INTERVAL) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }

                    for event in debouncer.drain_ready() {
                        if !is_notifiable(&event, &extensions) {
                            tracing::trace!(path = %event.path.display(), kind = ?event.kind, "Ignored change");
                            continue;
                        }
                        tracing::debug!(path = %event.path.display(), "Change detected");
                        if event_tx.send(event).is_err() {
                            // Nobody is listening any more
                            return;
                        }
                    }
                }

                tracing::debug!("Change watcher stopped");
            })
            .map_err(|e| WatchError::setup(&root_dir, notify::Error::io(e)))?;

        Ok((
            ChangeEvents { rx: event_rx },
            WatchHandle {
                shutdown: Some(shutdown_tx),
                thread: Some(thread),
            },
        ))
    }
}

/// Stream of reported changes.
///
/// Ends (yields `None`) once the watcher has stopped.
pub struct ChangeEvents {
    rx: async_mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeEvents {
    /// Wait for the next change.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Take a change if one is ready.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}

/// Handle to stop watching.
///
/// Dropping the handle stops the watcher in the background; [`stop`](Self::stop)
/// additionally waits until the OS watch has been released.
pub struct WatchHandle {
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stop watching and wait for the drain thread to exit.
    ///
    /// Blocks for at most one poll interval.
    pub fn stop(mut self) {
        self.shutdown.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Change watcher thread panicked");
        }
    }
}

/// Map a notify event kind to a [`ChangeKind`].
///
/// Renames and metadata-only changes are not content modifications and map to `None`.
fn change_kind(kind: EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_) | ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        _ => None,
    }
}

/// Record a raw notify event into the debouncer.
fn record_notify_event(
    res: Result<notify::Event, notify::Error>,
    root_dir: &Path,
    debouncer: &EventDebouncer,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "File watcher error");
            return;
        }
    };
    let Some(kind) = change_kind(event.kind) else {
        return;
    };
    for path in event.paths {
        if path.starts_with(root_dir) {
            debouncer.record(path, kind);
        }
    }
}

/// Whether a debounced event should be delivered to consumers.
fn is_notifiable(event: &ChangeEvent, extensions: &[String]) -> bool {
    event.kind == ChangeKind::Modified && has_watched_extension(&event.path, extensions)
}

/// Whether `path` has one of `extensions` (case-insensitive).
fn has_watched_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
