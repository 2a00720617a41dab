use serde::{Deserialize, Serialize};

/// Result of one attendance scan, as seen by the student and the teacher's feed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ScanOutcome {
    Marked,
    AlreadyMarked,
    ExpiredCode,
    SessionEnded,
    LimitExceeded,
    InvalidCode,
    ConnectionError,
}

impl ScanOutcome {
    pub const ALL: [ScanOutcome; 7] = [
        ScanOutcome::Marked,
        ScanOutcome::AlreadyMarked,
        ScanOutcome::ExpiredCode,
        ScanOutcome::SessionEnded,
        ScanOutcome::LimitExceeded,
        ScanOutcome::InvalidCode,
        ScanOutcome::ConnectionError,
    ];

    /// Stable machine-readable code.
    pub fn code(&self) -> String {
        self.to_string()
    }

    pub fn title(&self) -> &'static str {
        match self {
            ScanOutcome::Marked => "Attendance Marked!",
            ScanOutcome::AlreadyMarked => "Already Marked",
            ScanOutcome::ExpiredCode => "QR Code Expired",
            ScanOutcome::SessionEnded => "Session Ended",
            ScanOutcome::LimitExceeded => "Limit Exceeded",
            ScanOutcome::InvalidCode => "Invalid QR Code",
            ScanOutcome::ConnectionError => "Connection Error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ScanOutcome::Marked => "Your attendance has been recorded successfully.",
            ScanOutcome::AlreadyMarked => {
                "Your attendance for this session has already been recorded."
            }
            ScanOutcome::ExpiredCode => "This QR code has expired. Please scan the current code.",
            ScanOutcome::SessionEnded => {
                "This attendance session has ended. Contact your teacher."
            }
            ScanOutcome::LimitExceeded => "Session attendance limit has been reached.",
            ScanOutcome::InvalidCode => "The QR code is invalid or corrupted. Please try again.",
            ScanOutcome::ConnectionError => {
                "Unable to connect to the attendance server. Check your internet connection."
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Marked)
    }

    /// The student may scan again after this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanOutcome::ConnectionError | ScanOutcome::InvalidCode | ScanOutcome::ExpiredCode
        )
    }

    /// No further scan can succeed for this session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanOutcome::SessionEnded | ScanOutcome::LimitExceeded)
    }
}

/// One scan delivered by an attendance event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub roll: u32,
    pub outcome: ScanOutcome,
}

impl AttendanceEvent {
    pub fn marked(roll: u32) -> Self {
        Self {
            roll,
            outcome: ScanOutcome::Marked,
        }
    }

    pub fn failed(roll: u32, outcome: ScanOutcome) -> Self {
        Self { roll, outcome }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Scanning,
    Loading,
    Done(ScanOutcome),
}

/// Student scan screen flow: `Scanning -> Loading -> Done(outcome)`.
#[derive(Debug, Clone)]
pub struct ScanAttempt {
    roll: u32,
    phase: ScanPhase,
    attempts: u32,
    marked: bool,
}

impl ScanAttempt {
    pub fn new(roll: u32) -> Self {
        Self {
            roll,
            phase: ScanPhase::Scanning,
            attempts: 0,
            marked: false,
        }
    }

    pub fn roll(&self) -> u32 {
        self.roll
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once any attempt in this flow succeeded.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn can_scan(&self) -> bool {
        match self.phase {
            ScanPhase::Scanning => true,
            ScanPhase::Loading => false,
            ScanPhase::Done(outcome) => !outcome.is_terminal() && !self.marked,
        }
    }

    /// Starts an attempt. Returns false when the flow does not accept one.
    pub fn begin(&mut self) -> bool {
        if self.phase != ScanPhase::Scanning {
            return false;
        }
        self.phase = ScanPhase::Loading;
        self.attempts += 1;
        true
    }

    pub fn resolve(&mut self, outcome: ScanOutcome) {
        if self.phase != ScanPhase::Loading {
            return;
        }
        if outcome.is_success() {
            self.marked = true;
        }
        self.phase = ScanPhase::Done(outcome);
    }

    /// Back to scanning after a non-terminal outcome.
    pub fn retry(&mut self) -> bool {
        match self.phase {
            ScanPhase::Done(outcome) if !outcome.is_terminal() && !self.marked => {
                self.phase = ScanPhase::Scanning;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_kebab_case() {
        let codes: Vec<String> = ScanOutcome::ALL.iter().map(|o| o.code()).collect();
        assert_eq!(
            codes,
            vec![
                "marked",
                "already-marked",
                "expired-code",
                "session-ended",
                "limit-exceeded",
                "invalid-code",
                "connection-error"
            ]
        );
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&ScanOutcome::AlreadyMarked).unwrap();
        assert_eq!(json, "\"already-marked\"");
        let back: ScanOutcome = serde_json::from_str("\"connection-error\"").unwrap();
        assert_eq!(back, ScanOutcome::ConnectionError);
    }

    #[test]
    fn test_retryable_and_terminal_are_disjoint() {
        for outcome in ScanOutcome::ALL {
            assert!(!(outcome.is_retryable() && outcome.is_terminal()), "{outcome}");
        }
        assert!(ScanOutcome::ConnectionError.is_retryable());
        assert!(ScanOutcome::SessionEnded.is_terminal());
        assert!(ScanOutcome::LimitExceeded.is_terminal());
    }

    #[test]
    fn test_every_outcome_has_copy() {
        for outcome in ScanOutcome::ALL {
            assert!(!outcome.title().is_empty());
            assert!(!outcome.message().is_empty());
        }
    }

    #[test]
    fn test_attempt_flow_retry_after_connection_error() {
        let mut attempt = ScanAttempt::new(12);
        assert!(attempt.begin());
        assert!(!attempt.begin());
        attempt.resolve(ScanOutcome::ConnectionError);
        assert_eq!(attempt.phase(), ScanPhase::Done(ScanOutcome::ConnectionError));
        assert!(attempt.can_scan());
        assert!(attempt.retry());
        assert_eq!(attempt.phase(), ScanPhase::Scanning);

        assert!(attempt.begin());
        attempt.resolve(ScanOutcome::Marked);
        assert!(attempt.is_marked());
        assert_eq!(attempt.attempts(), 2);
        assert!(!attempt.retry());
    }

    #[test]
    fn test_terminal_outcome_disables_scanning() {
        let mut attempt = ScanAttempt::new(3);
        attempt.begin();
        attempt.resolve(ScanOutcome::SessionEnded);
        assert!(!attempt.can_scan());
        assert!(!attempt.retry());
        assert!(!attempt.begin());
    }

    #[test]
    fn test_resolve_ignored_outside_loading() {
        let mut attempt = ScanAttempt::new(3);
        attempt.resolve(ScanOutcome::Marked);
        assert_eq!(attempt.phase(), ScanPhase::Scanning);
        assert!(!attempt.is_marked());
    }
}
