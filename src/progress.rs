//! Progress reporting towards the page-readiness barrier
//!
//! The loader only pushes outcomes: one `add_unit` per piece of work at
//! registration time, then exactly one `complete` or `invalid` per unit.
//! It never asks the sink for aggregate state. [`ProgressBarrier`] is the
//! in-crate sink: it counts units, broadcasts an [`Event`] per report and
//! fires [`Event::Ready`] once every registered unit is terminal.

use crate::types::Event;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};

/// Events buffered per subscriber by [`ProgressBarrier::new`]
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Receiver of unit registrations and terminal outcomes
///
/// Each registered unit must receive at most one terminal call.
pub trait ProgressSink: Send + Sync {
    /// Register one more expected unit
    fn add_unit(&self, label: &str);

    /// Report that a unit finished successfully
    fn complete(&self, label: &str);

    /// Report that a unit failed
    fn invalid(&self, label: &str);
}

/// Snapshot of the barrier's counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    /// Units registered
    pub total: usize,
    /// Units that completed
    pub completed: usize,
    /// Units that ended invalid
    pub invalid: usize,
}

impl ProgressCounts {
    /// Units that reached a terminal state
    pub fn terminal(&self) -> usize {
        self.completed + self.invalid
    }

    /// Every registered unit is terminal (and at least one was registered)
    pub fn is_ready(&self) -> bool {
        self.total > 0 && self.terminal() == self.total
    }
}

/// Unit-counting barrier that signals page readiness
pub struct ProgressBarrier {
    counts: Mutex<ProgressCounts>,
    event_tx: broadcast::Sender<Event>,
    ready_tx: watch::Sender<Option<ProgressCounts>>,
}

impl Default for ProgressBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBarrier {
    /// Create an empty barrier buffering up to 256 events per subscriber
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty barrier buffering up to `capacity` events per subscriber
    ///
    /// A subscriber that falls further behind skips the oldest events
    /// (possibly [`Event::Ready`] itself); size this to at least twice the
    /// expected unit count when every event matters.
    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, _rx) = broadcast::channel(capacity.max(1));
        let (ready_tx, _ready_rx) = watch::channel(None);
        Self {
            counts: Mutex::new(ProgressCounts::default()),
            event_tx,
            ready_tx,
        }
    }

    /// Subscribe to progress events
    ///
    /// Events are best effort for slow receivers; use
    /// [`wait_ready`](Self::wait_ready) to learn about readiness reliably.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Current counters
    pub fn counts(&self) -> ProgressCounts {
        *self.lock()
    }

    /// Whether readiness has been signalled
    pub fn is_ready(&self) -> bool {
        self.ready_tx.borrow().is_some()
    }

    /// Wait until every registered unit is terminal
    ///
    /// Returns the counters at the moment readiness fired.
    pub async fn wait_ready(&self) -> ProgressCounts {
        let mut rx = self.ready_tx.subscribe();
        loop {
            if let Some(counts) = *rx.borrow_and_update() {
                return counts;
            }
            // The sender lives in `self`, so the channel cannot close while we borrow it
            if rx.changed().await.is_err() {
                return self.counts();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressCounts> {
        // Counters stay consistent even if a holder panicked mid-update
        self.counts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit_event(&self, event: Event) {
        // send() only fails when nobody is subscribed
        self.event_tx.send(event).ok();
    }

    fn record_terminal(&self, label: &str, success: bool) {
        let (event, counts) = {
            let mut counts = self.lock();
            if counts.terminal() >= counts.total {
                tracing::warn!(
                    label,
                    total = counts.total,
                    "terminal progress report with no pending unit, ignoring"
                );
                return;
            }
            let event = if success {
                counts.completed += 1;
                Event::UnitComplete {
                    label: label.to_string(),
                    completed: counts.completed,
                    total: counts.total,
                }
            } else {
                counts.invalid += 1;
                Event::UnitInvalid {
                    label: label.to_string(),
                    invalid: counts.invalid,
                    total: counts.total,
                }
            };
            (event, *counts)
        };

        self.emit_event(event);

        if !counts.is_ready() {
            return;
        }
        let fired = self.ready_tx.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            *state = Some(counts);
            true
        });
        if fired {
            tracing::info!(
                completed = counts.completed,
                invalid = counts.invalid,
                "all progress units terminal, page ready"
            );
            self.emit_event(Event::Ready {
                completed: counts.completed,
                invalid: counts.invalid,
            });
        }
    }
}

impl ProgressSink for ProgressBarrier {
    fn add_unit(&self, label: &str) {
        let total = {
            let mut counts = self.lock();
            counts.total += 1;
            counts.total
        };
        tracing::debug!(label, total, "progress unit registered");
        self.emit_event(Event::UnitAdded {
            label: label.to_string(),
            total,
        });
    }

    fn complete(&self, label: &str) {
        self.record_terminal(label, true);
    }

    fn invalid(&self, label: &str) {
        self.record_terminal(label, false);
    }
}
