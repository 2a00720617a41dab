use std::collections::BTreeSet;
use std::sync::mpsc::{Receiver, TryRecvError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::scan::{AttendanceEvent, ScanOutcome};

/// Read-only view of the roster handed to event sources on every poll.
#[derive(Debug, Clone, Copy)]
pub struct RosterView<'a> {
    pub expected: u32,
    pub marked: &'a BTreeSet<u32>,
}

impl RosterView<'_> {
    pub fn is_full(&self) -> bool {
        self.marked.len() >= self.expected as usize
    }

    pub fn unmarked(&self) -> Vec<u32> {
        (1..=self.expected)
            .filter(|roll| !self.marked.contains(roll))
            .collect()
    }
}

/// Producer of scan events for a live session.
///
/// The controller polls once per marking interval and validates whatever comes back, so an
/// implementation only has to report what it saw.
pub trait AttendanceEventSource: Send {
    /// Next event for this interval, if any.
    fn next_event(&mut self, roster: RosterView<'_>) -> Option<AttendanceEvent>;

    /// Everything the source has for this interval. Defaults to a single `next_event`;
    /// sources backed by a queue hand over all of it.
    fn poll(&mut self, roster: RosterView<'_>) -> Vec<AttendanceEvent> {
        self.next_event(roster).into_iter().collect()
    }

    /// True once the source will not produce anything else.
    fn is_exhausted(&self, _roster: RosterView<'_>) -> bool {
        false
    }

    /// Release the underlying subscription. Called once on teardown.
    fn close(&mut self) {}
}

/// Demo source: one random unmarked student "scans" per poll until the roster is full.
pub struct SimulatedScans {
    rng: StdRng,
    closed: bool,
}

impl SimulatedScans {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            closed: false,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            closed: false,
        }
    }
}

impl Default for SimulatedScans {
    fn default() -> Self {
        Self::new()
    }
}

impl AttendanceEventSource for SimulatedScans {
    fn next_event(&mut self, roster: RosterView<'_>) -> Option<AttendanceEvent> {
        if self.closed || roster.is_full() {
            return None;
        }
        roster
            .unmarked()
            .choose(&mut self.rng)
            .copied()
            .map(AttendanceEvent::marked)
    }

    fn is_exhausted(&self, roster: RosterView<'_>) -> bool {
        self.closed || roster.is_full()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Source fed from a channel, e.g. by a network subscription thread.
///
/// A dropped sender is reported once as a `ConnectionError` with roll `0`.
pub struct ChannelEventSource {
    rx: Receiver<AttendanceEvent>,
    disconnected: bool,
    closed: bool,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AttendanceEvent>) -> Self {
        Self {
            rx,
            disconnected: false,
            closed: false,
        }
    }
}

impl AttendanceEventSource for ChannelEventSource {
    fn next_event(&mut self, _roster: RosterView<'_>) -> Option<AttendanceEvent> {
        if self.closed || self.disconnected {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.disconnected = true;
                Some(AttendanceEvent::failed(0, ScanOutcome::ConnectionError))
            }
        }
    }

    /// Drains the queue, so a burst of scans lands in one interval.
    fn poll(&mut self, roster: RosterView<'_>) -> Vec<AttendanceEvent> {
        std::iter::from_fn(|| self.next_event(roster)).collect()
    }

    fn is_exhausted(&self, _roster: RosterView<'_>) -> bool {
        self.closed || self.disconnected
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
