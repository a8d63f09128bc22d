// ── Device state store ──
//
// Single source of truth for one controller's state. Every mutation goes
// through `watch::Sender::send_if_modified`, which serializes writers:
// the poll task, the push listener and command handlers all write here.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use autelis_api::{StatusSnapshot, StatusUpdateEvent};

use crate::error::CoreError;
use crate::model::PoolState;

/// Reactive store for a controller's [`PoolState`].
///
/// Readers either clone the current state or subscribe to a `watch`
/// receiver that wakes on every change.
pub struct DeviceStore {
    state: watch::Sender<PoolState>,
    pub(crate) last_snapshot: watch::Sender<Option<DateTime<Utc>>>,
    pub(crate) last_push_event: watch::Sender<Option<DateTime<Utc>>>,
}

impl DeviceStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PoolState::default());
        let (last_snapshot, _) = watch::channel(None);
        let (last_push_event, _) = watch::channel(None);

        Self {
            state,
            last_snapshot,
            last_push_event,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Clone of the current state.
    pub fn state(&self) -> PoolState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<PoolState> {
        self.state.subscribe()
    }

    pub fn is_reachable(&self) -> bool {
        self.state.borrow().reachable
    }

    /// Whether `element` was discovered as installed equipment.
    pub fn has_equipment(&self, element: &str) -> bool {
        self.state.borrow().equipment.contains_key(element)
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Register installed equipment and apply the first snapshot.
    pub fn discover(&self, snapshot: &StatusSnapshot) -> Result<(), CoreError> {
        self.write_snapshot(snapshot, true)
    }

    /// Apply a poll result. Nothing changes if validation fails.
    pub fn apply_snapshot(&self, snapshot: &StatusSnapshot) -> Result<(), CoreError> {
        self.write_snapshot(snapshot, false)
    }

    /// Apply one push update. Returns `false` if it was not recognized.
    pub fn apply_event(&self, event: &StatusUpdateEvent) -> bool {
        let applied = self
            .state
            .send_if_modified(|state| state.apply_event(&event.element, &event.value));

        if applied {
            self.last_push_event.send_replace(Some(Utc::now()));
        }
        applied
    }

    /// Flag the controller as not responding.
    pub fn mark_unreachable(&self) {
        let changed = self.state.send_if_modified(|state| {
            let was_reachable = state.reachable;
            state.reachable = false;
            was_reachable
        });
        if changed {
            warn!("controller marked unreachable");
        }
    }

    fn write_snapshot(&self, snapshot: &StatusSnapshot, discover: bool) -> Result<(), CoreError> {
        let mut result = Ok(());

        self.state.send_if_modified(|state| {
            let mut next = state.clone();
            if discover {
                next.register_equipment(snapshot);
            }

            match next.apply_snapshot(snapshot) {
                Ok(()) => {
                    let changed = next != *state;
                    *state = next;
                    changed
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });

        if result.is_ok() {
            self.last_snapshot.send_replace(Some(Utc::now()));
            debug!(discover, "status snapshot applied");
        }
        result
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_snapshot(&self) -> Option<DateTime<Utc>> {
        *self.last_snapshot.borrow()
    }

    pub fn last_push_event(&self) -> Option<DateTime<Utc>> {
        *self.last_push_event.borrow()
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}
