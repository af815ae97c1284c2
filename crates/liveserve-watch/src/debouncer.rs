//! Event debouncing for change notifications.
//!
//! Coalesces multiple filesystem events into single events per path, so an
//! editor that emits several events per save yields one notification.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::{ChangeEvent, ChangeKind};

/// Pending event waiting to be emitted.
struct PendingEvent {
    kind: ChangeKind,
    deadline: Instant,
}

/// Thread-safe event debouncer.
///
/// Written to from the notify callback thread and drained from the watcher's
/// drain thread.
pub(crate) struct EventDebouncer {
    pending: Mutex<HashMap<PathBuf, PendingEvent>>,
    debounce_duration: Duration,
}

impl EventDebouncer {
    /// Create a new debouncer with the specified debounce duration.
    pub(crate) fn new(debounce_duration: Duration) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            debounce_duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, PendingEvent>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record an event, pushing the path's deadline forward.
    pub(crate) fn record(&self, path: PathBuf, kind: ChangeKind) {
        use std::collections::hash_map::Entry;

        let mut pending = self.lock();
        let deadline = Instant::now() + self.debounce_duration;

        match pending.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(PendingEvent { kind, deadline });
            }
            Entry::Occupied(mut entry) => {
                let existing_kind = entry.get().kind;
                if let Some(coalesced_kind) = Self::coalesce(existing_kind, kind) {
                    entry.get_mut().kind = coalesced_kind;
                    entry.get_mut().deadline = deadline;
                } else {
                    // Created + Removed: the file never existed for us
                    entry.remove();
                }
            }
        }
    }

    /// Coalesce two event kinds.
    ///
    /// Returns `None` if both events should be discarded (Created + Removed).
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: ChangeKind, new: ChangeKind) -> Option<ChangeKind> {
        use ChangeKind::{Created, Modified, Removed};

        match (existing, new) {
            (Created, Created) => Some(Created),
            (Created, Modified) => Some(Created), // Content written right after create
            (Created, Removed) => None,

            (Modified, Created) => Some(Created), // File was recreated
            (Modified, Modified) => Some(Modified),
            (Modified, Removed) => Some(Removed),

            (Removed, Created) => Some(Modified), // Atomic save: old file replaced
            (Removed, Modified) => Some(Removed),
            (Removed, Removed) => Some(Removed),
        }
    }

    /// Drain events that have passed their debounce deadline.
    pub(crate) fn drain_ready(&self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let mut pending = self.lock();

        let mut ready = Vec::new();
        pending.retain(|path, event| {
            if event.deadline <= now {
                ready.push(ChangeEvent {
                    path: path.clone(),
                    kind: event.kind,
                });
                false
            } else {
                true
            }
        });
        ready
    }

    /// Number of paths still waiting for their deadline.
    #[cfg(test)]
    fn pending_len(&self) -> usize {
        self.lock().len()
    }
}
