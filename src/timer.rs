/// Default "final minute" warning threshold in seconds.
pub const DEFAULT_WARNING_SECS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Running,
    Paused,
    Expired,
}

/// What a single simulated second did to the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Paused, or already expired and reported.
    Idle,
    Running { seconds_left: u32, warning: bool },
    /// Reached zero. Returned exactly once per timer.
    Expired,
}

/// Decrementing whole-second clock.
///
/// The timer never reads the wall clock itself: every call to [`CountdownTimer::tick`]
/// stands for one elapsed second, which keeps pause/resume free of drift and makes the
/// behaviour deterministic under test.
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    seconds_left: u32,
    warning_threshold_secs: u32,
    running: bool,
    expiry_reported: bool,
}

impl CountdownTimer {
    pub fn new(minutes: u32, warning_threshold_secs: u32) -> Self {
        Self::from_secs(minutes.saturating_mul(60), warning_threshold_secs)
    }

    pub fn from_secs(seconds: u32, warning_threshold_secs: u32) -> Self {
        Self {
            seconds_left: seconds,
            warning_threshold_secs,
            running: true,
            expiry_reported: false,
        }
    }

    pub fn tick(&mut self) -> TimerTick {
        if self.seconds_left == 0 {
            // a zero-length timer reports its expiry on first observation
            return self.report_expiry();
        }
        if !self.running {
            return TimerTick::Idle;
        }

        self.seconds_left -= 1;
        if self.seconds_left == 0 {
            return self.report_expiry();
        }

        TimerTick::Running {
            seconds_left: self.seconds_left,
            warning: self.is_warning(),
        }
    }

    fn report_expiry(&mut self) -> TimerTick {
        if self.expiry_reported {
            TimerTick::Idle
        } else {
            self.expiry_reported = true;
            TimerTick::Expired
        }
    }

    /// Pause or resume. Has no effect once expired.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn state(&self) -> TimerState {
        if self.seconds_left == 0 {
            TimerState::Expired
        } else if self.running {
            TimerState::Running
        } else {
            TimerState::Paused
        }
    }

    pub fn is_expired(&self) -> bool {
        self.seconds_left == 0
    }

    pub fn is_warning(&self) -> bool {
        self.seconds_left > 0 && self.seconds_left <= self.warning_threshold_secs
    }

    pub fn warning_threshold_secs(&self) -> u32 {
        self.warning_threshold_secs
    }

    /// `MM:SS`
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.seconds_left / 60, self.seconds_left % 60)
    }
}
