use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use thiserror::Error;

use crate::event_source::{AttendanceEventSource, RosterView};
use crate::export::ExportError;
use crate::roll_grid::RollGrid;
use crate::runtime::Cadence;
use crate::scan::{AttendanceEvent, ScanOutcome};
use crate::session::{SessionConfig, SessionRuntimeState};
use crate::summary::{EndReason, SessionSummary, Tally};
use crate::timer::{CountdownTimer, TimerTick, DEFAULT_WARNING_SECS};

const CODE_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub mark_interval: Duration,
    pub warning_threshold_secs: u32,
    pub allow_manual_marking: bool,
    /// How many recent scan outcomes to keep for display.
    pub feed_len: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            mark_interval: Duration::from_secs(2),
            warning_threshold_secs: DEFAULT_WARNING_SECS,
            allow_manual_marking: true,
            feed_len: 8,
        }
    }
}

/// Something that happened while time advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    Tick { seconds_left: u32, warning: bool },
    Expired,
    /// A scan event from the source, carrying the resolved outcome.
    Scan(AttendanceEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OverrideError {
    #[error("manual marking is disabled")]
    Disabled,
    #[error("session has ended")]
    SessionEnded,
    #[error("roll number {0} is not on this roster")]
    OutOfRange(u32),
}

/// Drives one live attendance session: the countdown, the marking feed and termination.
///
/// Time only moves through [`LiveSession::advance`]. The session keeps a one-second cadence
/// for the countdown and a separate cadence for polling the event source, and processes due
/// ticks in order. Once the session ends neither cadence fires again and the marked set is
/// frozen.
pub struct LiveSession {
    config: SessionConfig,
    state: SessionRuntimeState,
    timer: CountdownTimer,
    source: Box<dyn AttendanceEventSource>,
    settings: ControllerSettings,
    second: Cadence,
    marking: Cadence,
    paused: bool,
    end_requested: bool,
    end_reason: Option<EndReason>,
    started_at: DateTime<Local>,
    ended_at: Option<DateTime<Local>>,
    code: String,
    retired_codes: Vec<String>,
    feed: VecDeque<AttendanceEvent>,
    source_closed: bool,
    /// Updates produced outside `advance`, handed out by the next call.
    pending: Vec<SessionUpdate>,
}

impl LiveSession {
    pub fn new(
        config: SessionConfig,
        source: Box<dyn AttendanceEventSource>,
        settings: ControllerSettings,
    ) -> Self {
        let timer = CountdownTimer::new(config.timer_minutes, settings.warning_threshold_secs);
        info!(
            "session started: class={:?} expected={} minutes={}",
            config.class_name, config.expected_students, config.timer_minutes
        );

        let mut session = Self {
            state: SessionRuntimeState::new(timer.seconds_left()),
            timer,
            source,
            second: Cadence::new(Duration::from_secs(1)),
            marking: Cadence::new(settings.mark_interval),
            settings,
            paused: false,
            end_requested: false,
            end_reason: None,
            started_at: Local::now(),
            ended_at: None,
            code: new_code(),
            retired_codes: Vec::new(),
            feed: VecDeque::with_capacity(settings.feed_len),
            source_closed: false,
            pending: Vec::new(),
            config,
        };

        if session.timer.is_expired() {
            let mut updates = Vec::new();
            session.on_second(&mut updates);
            session.pending = updates;
        }
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionRuntimeState {
        &self.state
    }

    pub fn marked(&self) -> &BTreeSet<u32> {
        &self.state.marked
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn seconds_left(&self) -> u32 {
        self.state.seconds_remaining
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn is_end_requested(&self) -> bool {
        self.end_requested
    }

    /// Code currently shown in the QR placeholder.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Most recent scan outcomes, newest last.
    pub fn feed(&self) -> impl DoubleEndedIterator<Item = &AttendanceEvent> + ExactSizeIterator {
        self.feed.iter()
    }

    pub fn grid(&self) -> RollGrid<'_> {
        RollGrid::new(self.config.expected_students, &self.state.marked)
            .interactive(self.is_active() && self.settings.allow_manual_marking)
    }

    fn roster(&self) -> RosterView<'_> {
        RosterView {
            expected: self.config.expected_students,
            marked: &self.state.marked,
        }
    }

    /// Whether the marking feed is still being polled.
    pub fn is_filling(&self) -> bool {
        self.state.is_active
            && !self.source_closed
            && !self.roster().is_full()
            && !self.source.is_exhausted(self.roster())
    }

    pub fn tally(&self) -> Tally {
        Tally {
            present: self.state.marked.len(),
            expected: self.config.expected_students,
        }
    }

    pub fn export_csv(&self) -> Result<String, ExportError> {
        crate::export::attendance_csv(self.config.expected_students, &self.state.marked)
    }

    /// Advance simulated time.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<SessionUpdate> {
        let mut updates = std::mem::take(&mut self.pending);
        let mut remaining = elapsed;

        while self.state.is_active && !self.paused {
            let filling = self.is_filling();
            let step = if filling {
                self.second.until_next().min(self.marking.until_next())
            } else {
                self.second.until_next()
            };

            if step > remaining {
                self.second.feed(remaining);
                if filling {
                    self.marking.feed(remaining);
                }
                break;
            }
            remaining -= step;

            let second_due = self.second.feed(step) > 0;
            let mark_due = filling && self.marking.feed(step) > 0;

            // the countdown goes first so an expiry at the same instant closes the roster
            if second_due {
                self.on_second(&mut updates);
            }
            if mark_due && self.state.is_active {
                self.on_mark(&mut updates);
            }
        }

        updates
    }

    fn on_second(&mut self, updates: &mut Vec<SessionUpdate>) {
        match self.timer.tick() {
            TimerTick::Idle => {}
            TimerTick::Running {
                seconds_left,
                warning,
            } => {
                self.state.seconds_remaining = seconds_left;
                updates.push(SessionUpdate::Tick {
                    seconds_left,
                    warning,
                });
            }
            TimerTick::Expired => {
                self.state.seconds_remaining = 0;
                updates.push(SessionUpdate::Expired);
                self.finish(EndReason::TimerExpired);
            }
        }
    }

    fn on_mark(&mut self, updates: &mut Vec<SessionUpdate>) {
        let roster = RosterView {
            expected: self.config.expected_students,
            marked: &self.state.marked,
        };
        for event in self.source.poll(roster) {
            let outcome = self.apply_event(event);
            updates.push(SessionUpdate::Scan(AttendanceEvent {
                roll: event.roll,
                outcome,
            }));
        }
    }

    fn resolve(&self, event: AttendanceEvent) -> ScanOutcome {
        if !self.state.is_active {
            return ScanOutcome::SessionEnded;
        }
        match event.outcome {
            ScanOutcome::Marked if event.roll == 0 => ScanOutcome::InvalidCode,
            ScanOutcome::Marked if event.roll > self.config.expected_students => {
                ScanOutcome::LimitExceeded
            }
            ScanOutcome::Marked if self.state.marked.contains(&event.roll) => {
                ScanOutcome::AlreadyMarked
            }
            outcome => outcome,
        }
    }

    /// Validate an event from any source and record it. Returns the outcome shown to the
    /// student.
    pub fn apply_event(&mut self, event: AttendanceEvent) -> ScanOutcome {
        let outcome = self.resolve(event);
        if outcome == ScanOutcome::Marked {
            self.state.marked.insert(event.roll);
            debug!(
                "roll {} marked ({}/{})",
                event.roll,
                self.state.marked.len(),
                self.config.expected_students
            );
        } else {
            warn!("scan for roll {} rejected: {}", event.roll, outcome);
        }

        if self.settings.feed_len > 0 {
            if self.feed.len() == self.settings.feed_len {
                self.feed.pop_front();
            }
            self.feed.push_back(AttendanceEvent {
                roll: event.roll,
                outcome,
            });
        }
        outcome
    }

    /// A student scanned `code` claiming `roll`.
    pub fn submit_scan(&mut self, roll: u32, code: &str) -> ScanOutcome {
        let code = code.trim();
        let outcome = if !self.state.is_active {
            ScanOutcome::SessionEnded
        } else if code.eq_ignore_ascii_case(&self.code) {
            if self.paused {
                ScanOutcome::ExpiredCode
            } else {
                ScanOutcome::Marked
            }
        } else if self
            .retired_codes
            .iter()
            .any(|old| code.eq_ignore_ascii_case(old))
        {
            ScanOutcome::ExpiredCode
        } else {
            ScanOutcome::InvalidCode
        };
        self.apply_event(AttendanceEvent { roll, outcome })
    }

    /// Replace the displayed code. Scans of the old code report `ExpiredCode`.
    pub fn rotate_code(&mut self) {
        if !self.state.is_active {
            return;
        }
        let old = std::mem::replace(&mut self.code, new_code());
        self.retired_codes.push(old);
        info!("session code rotated");
    }

    pub fn pause(&mut self) {
        if self.state.is_active && !self.paused {
            self.paused = true;
            self.timer.set_running(false);
            info!("session paused at {}", self.timer.display());
        }
    }

    pub fn resume(&mut self) {
        if self.state.is_active && self.paused {
            self.paused = false;
            self.timer.set_running(true);
            info!("session resumed at {}", self.timer.display());
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// First half of "end session early": waits for [`LiveSession::confirm_end`].
    pub fn request_end(&mut self) {
        if self.state.is_active {
            self.end_requested = true;
        }
    }

    pub fn cancel_end(&mut self) {
        self.end_requested = false;
    }

    /// Ends the session if an end was requested. Returns true when the session ended.
    pub fn confirm_end(&mut self) -> bool {
        if !self.end_requested {
            return false;
        }
        self.finish(EndReason::EndedEarly);
        true
    }

    /// Ends immediately without confirmation.
    pub fn end_now(&mut self) {
        self.finish(EndReason::EndedEarly);
    }

    /// Teacher override: flip a roll while the session is live. Returns the new presence.
    pub fn manual_toggle(&mut self, roll: u32) -> Result<bool, OverrideError> {
        if !self.settings.allow_manual_marking {
            return Err(OverrideError::Disabled);
        }
        if !self.state.is_active {
            return Err(OverrideError::SessionEnded);
        }
        let roll = self.grid().toggle(roll).ok_or(OverrideError::OutOfRange(roll))?;
        if self.state.marked.remove(&roll) {
            info!("roll {roll} unmarked manually");
            Ok(false)
        } else {
            self.state.marked.insert(roll);
            info!("roll {roll} marked manually");
            Ok(true)
        }
    }

    fn finish(&mut self, reason: EndReason) {
        if !self.state.is_active {
            return;
        }
        self.state.is_active = false;
        self.paused = false;
        self.end_requested = false;
        self.timer.set_running(false);
        self.end_reason = Some(reason);
        self.ended_at = Some(Local::now());
        self.close_source();
        info!(
            "session ended ({reason}): {}/{} present",
            self.state.marked.len(),
            self.config.expected_students
        );
    }

    fn close_source(&mut self) {
        if !self.source_closed {
            self.source.close();
            self.source_closed = true;
        }
    }

    /// Final tally once the session has ended.
    pub fn summary(&self) -> Option<SessionSummary> {
        Some(SessionSummary {
            config: self.config.clone(),
            marked: self.state.marked.clone(),
            end_reason: self.end_reason?,
            started_at: self.started_at,
            ended_at: self.ended_at?,
        })
    }

    /// Teardown: ends the session if still live, releases the source, returns the summary.
    pub fn close(&mut self) -> SessionSummary {
        self.finish(EndReason::Closed);
        self.close_source();
        SessionSummary {
            config: self.config.clone(),
            marked: self.state.marked.clone(),
            end_reason: self.end_reason.unwrap_or(EndReason::Closed),
            started_at: self.started_at,
            ended_at: self.ended_at.unwrap_or_else(Local::now),
        }
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.close_source();
    }
}

fn new_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}
