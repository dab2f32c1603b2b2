// ── Reading monitor ──
//
// Classifies a stream of readings against the store's live thresholds and
// broadcasts only the edges of `needs_attention`. Notification layers
// subscribe here instead of re-deriving transitions from levels.

use chrono::{DateTime, Utc};
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Assessment, classify};
use crate::model::Reading;
use crate::store::ConfigStore;

const EVENT_CHANNEL_SIZE: usize = 64;

/// Direction of a breach transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BreachKind {
    /// A reading started needing attention.
    Entered,
    /// Readings are back to all-normal.
    Cleared,
}

/// Emitted once per transition, not once per bad reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreachEvent {
    pub at: DateTime<Utc>,
    pub kind: BreachKind,
    pub assessment: Assessment,
}

/// Edge detector over successive assessments. Starts in the clear state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreachTracker {
    in_breach: bool,
}

impl BreachTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_breach(&self) -> bool {
        self.in_breach
    }

    /// Feed one assessment; returns the transition it caused, if any.
    pub fn update(&mut self, assessment: &Assessment) -> Option<BreachKind> {
        match (self.in_breach, assessment.needs_attention) {
            (false, true) => {
                self.in_breach = true;
                Some(BreachKind::Entered)
            }
            (true, false) => {
                self.in_breach = false;
                Some(BreachKind::Cleared)
            }
            _ => None,
        }
    }
}

/// Classifies readings and broadcasts [`BreachEvent`]s.
pub struct ReadingMonitor {
    store: ConfigStore,
    tracker: BreachTracker,
    events: broadcast::Sender<BreachEvent>,
}

impl ReadingMonitor {
    pub fn new(store: ConfigStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            store,
            tracker: BreachTracker::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreachEvent> {
        self.events.subscribe()
    }

    /// Classify one reading against the current thresholds. Returns (and
    /// broadcasts) an event when the breach state flips.
    pub fn observe(&mut self, reading: &Reading) -> Option<BreachEvent> {
        let thresholds = self.store.thresholds();
        let assessment = classify(reading, &thresholds);
        let kind = self.tracker.update(&assessment)?;

        let event = BreachEvent {
            at: reading.timestamp,
            kind,
            assessment,
        };
        info!(
            %kind,
            flagged = ?assessment.flagged(),
            worst = %assessment.worst(),
            "protection state changed"
        );
        // No subscribers is fine; the caller still gets the event.
        let _ = self.events.send(event.clone());
        Some(event)
    }

    /// Consume `readings` until the stream ends or `cancel` fires.
    pub async fn run<S>(mut self, mut readings: S, cancel: CancellationToken)
    where
        S: Stream<Item = Reading> + Unpin,
    {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("reading monitor cancelled");
                    break;
                }
                next = readings.next() => match next {
                    Some(reading) => {
                        self.observe(&reading);
                    }
                    None => {
                        debug!("reading stream ended");
                        break;
                    }
                },
            }
        }
    }
}
