//! Diagnostics and event delivery.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-round flagged pixel counts for one image.
///
/// Intended for logging; nothing branches on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectionReport {
    /// Number of newly flagged pixels in each detection round.
    pub round_counts: Vec<usize>,
}

impl DetectionReport {
    /// Creates an empty report with room for `rounds` entries.
    #[must_use]
    pub fn with_capacity(rounds: usize) -> Self {
        Self {
            round_counts: Vec::with_capacity(rounds),
        }
    }

    /// Records the count of one round.
    pub fn push(&mut self, flagged: usize) {
        self.round_counts.push(flagged);
    }

    /// Total pixels flagged over all rounds.
    #[must_use]
    pub fn total(&self) -> usize {
        self.round_counts.iter().sum()
    }

    /// Number of rounds run.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.round_counts.len()
    }
}

impl fmt::Display for DetectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, count) in self.round_counts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{count}")?;
        }
        Ok(())
    }
}

/// Receiver of progress events.
///
/// Implemented for any `FnMut(E)` closure, so callers can forward events
/// to a logger, a channel or a UI without the processing code knowing
/// which.
pub trait EventSink<E> {
    /// Delivers one event.
    fn emit(&mut self, event: E);
}

impl<E, F> EventSink<E> for F
where
    F: FnMut(E),
{
    fn emit(&mut self, event: E) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<E> EventSink<E> for NullSink {
    fn emit(&mut self, _event: E) {}
}
