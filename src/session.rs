use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Semester {
    #[default]
    #[strum(serialize = "Semester 1")]
    One,
    #[strum(serialize = "Semester 2")]
    Two,
    #[strum(serialize = "Semester 3")]
    Three,
    #[strum(serialize = "Semester 4")]
    Four,
    #[strum(serialize = "Semester 5")]
    Five,
    #[strum(serialize = "Semester 6")]
    Six,
    #[strum(serialize = "Semester 7")]
    Seven,
    #[strum(serialize = "Semester 8")]
    Eight,
}

impl Semester {
    pub const ALL: [Semester; 8] = [
        Semester::One,
        Semester::Two,
        Semester::Three,
        Semester::Four,
        Semester::Five,
        Semester::Six,
        Semester::Seven,
        Semester::Eight,
    ];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum Shift {
    #[default]
    Morning,
    Day,
    Evening,
}

impl Shift {
    pub const ALL: [Shift; 3] = [Shift::Morning, Shift::Day, Shift::Evening];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum SessionType {
    #[default]
    Lecture,
    Lab,
    Tutorial,
    Exam,
}

impl SessionType {
    pub const ALL: [SessionType; 4] = [
        SessionType::Lecture,
        SessionType::Lab,
        SessionType::Tutorial,
        SessionType::Exam,
    ];
}

/// A bookable start/end time, stored as minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(u16);

impl TimeSlot {
    pub const FIRST: TimeSlot = TimeSlot(8 * 60);
    pub const LAST: TimeSlot = TimeSlot(18 * 60);
    pub const STEP_MINUTES: u16 = 30;

    pub fn new(hour: u16, minute: u16) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(TimeSlot(hour * 60 + minute))
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// The fixed slot list: 08:00 to 18:00 in 30 minute steps.
    pub fn all() -> Vec<TimeSlot> {
        (Self::FIRST.0..=Self::LAST.0)
            .step_by(Self::STEP_MINUTES as usize)
            .map(TimeSlot)
            .collect()
    }

    /// Slots strictly after `start`.
    pub fn after(start: TimeSlot) -> Vec<TimeSlot> {
        Self::all().into_iter().filter(|s| *s > start).collect()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got {s:?}"))?;
        let hour = h.trim().parse::<u16>().map_err(|e| e.to_string())?;
        let minute = m.trim().parse::<u16>().map_err(|e| e.to_string())?;
        TimeSlot::new(hour, minute).ok_or_else(|| format!("time out of range: {s:?}"))
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

/// Immutable parameters of one attendance session, produced by the creation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub timer_minutes: u32,
    pub expected_students: u32,
    pub class_name: String,
    pub group: Option<String>,
    pub semester: Semester,
    pub batch_year: u16,
    pub shift: Shift,
    pub session_type: SessionType,
    pub date: NaiveDate,
    pub start: TimeSlot,
    pub end: TimeSlot,
    pub notes: String,
    /// Login of the teacher who ran the session.
    #[serde(default)]
    pub teacher: Option<String>,
}

impl SessionConfig {
    /// Minimal config for quick-start sessions and tests.
    pub fn quick(class_name: &str, timer_minutes: u32, expected_students: u32) -> Self {
        Self {
            timer_minutes,
            expected_students,
            class_name: class_name.to_string(),
            group: None,
            semester: Semester::default(),
            batch_year: 2024,
            shift: Shift::default(),
            session_type: SessionType::default(),
            date: chrono::Local::now().date_naive(),
            start: TimeSlot::FIRST,
            end: TimeSlot(TimeSlot::FIRST.0 + 60),
            notes: String::new(),
            teacher: None,
        }
    }

    pub fn title(&self) -> &str {
        if self.class_name.trim().is_empty() {
            "Attendance Session"
        } else {
            &self.class_name
        }
    }
}

/// Mutable state owned by the live session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRuntimeState {
    pub is_active: bool,
    pub marked: BTreeSet<u32>,
    pub seconds_remaining: u32,
}

impl SessionRuntimeState {
    pub fn new(seconds_remaining: u32) -> Self {
        Self {
            is_active: true,
            marked: BTreeSet::new(),
            seconds_remaining,
        }
    }
}
