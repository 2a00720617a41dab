use std::collections::BTreeMap;

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::{SessionConfig, SessionType, Semester, Shift, TimeSlot};

/// Roster size used for years without an entry in the table.
pub const GLOBAL_MAX_STUDENTS: u32 = 500;
pub const DEFAULT_MAX_TIMER_MINUTES: u32 = 60;

/// Per batch-year roster capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct BatchLimits(BTreeMap<u16, u32>);

impl BatchLimits {
    pub fn new(limits: impl IntoIterator<Item = (u16, u32)>) -> Self {
        Self(limits.into_iter().collect())
    }

    pub fn capacity(&self, year: u16) -> u32 {
        self.0
            .get(&year)
            .copied()
            .unwrap_or(GLOBAL_MAX_STUDENTS)
            .clamp(1, GLOBAL_MAX_STUDENTS)
    }

    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FormStep {
    Basics,
    Schedule,
    Settings,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [FormStep::Basics, FormStep::Schedule, FormStep::Settings];

    pub fn index(&self) -> usize {
        match self {
            FormStep::Basics => 0,
            FormStep::Schedule => 1,
            FormStep::Settings => 2,
        }
    }

    pub fn fields(&self) -> &'static [FormField] {
        match self {
            FormStep::Basics => &[
                FormField::ClassName,
                FormField::Group,
                FormField::BatchYear,
                FormField::ExpectedStudents,
            ],
            FormStep::Schedule => &[FormField::Date, FormField::Start, FormField::End],
            FormStep::Settings => &[
                FormField::TimerMinutes,
                FormField::Semester,
                FormField::Shift,
                FormField::SessionType,
                FormField::Notes,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FormField {
    #[strum(serialize = "Class name")]
    ClassName,
    Group,
    #[strum(serialize = "Batch year")]
    BatchYear,
    #[strum(serialize = "Expected students")]
    ExpectedStudents,
    Date,
    #[strum(serialize = "Start time")]
    Start,
    #[strum(serialize = "End time")]
    End,
    #[strum(serialize = "Timer (min)")]
    TimerMinutes,
    Semester,
    Shift,
    #[strum(serialize = "Session type")]
    SessionType,
    Notes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("class name is required")]
    MissingClassName,
    #[error("expected students must be between 1 and {max}")]
    StudentCount { max: u32 },
    #[error("pick an end time after the start time")]
    EndTime,
    #[error("timer must be between 1 and {max} minutes")]
    TimerDuration { max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormNav {
    Step(FormStep),
    /// "Back" on the first step leaves the form.
    Exit,
    Done(Box<SessionConfig>),
}

/// Multi-step session creation form.
#[derive(Debug, Clone)]
pub struct SessionForm {
    step: FormStep,
    focus: usize,
    limits: BatchLimits,
    max_timer_minutes: u32,
    class_name: String,
    group: String,
    batch_year: u16,
    expected_students: u32,
    date: NaiveDate,
    start: TimeSlot,
    end: Option<TimeSlot>,
    timer_minutes: u32,
    semester: Semester,
    shift: Shift,
    session_type: SessionType,
    notes: String,
}

impl SessionForm {
    pub fn new(limits: BatchLimits, timer_minutes: u32, expected_students: u32) -> Self {
        let today = Local::now().date_naive();
        let batch_year = limits.years().last().unwrap_or(today.year() as u16);
        let start = TimeSlot::FIRST;
        let mut form = Self {
            step: FormStep::Basics,
            focus: 0,
            max_timer_minutes: DEFAULT_MAX_TIMER_MINUTES,
            class_name: String::new(),
            group: String::new(),
            batch_year,
            expected_students,
            date: today,
            start,
            end: TimeSlot::after(start).first().copied(),
            timer_minutes,
            semester: Semester::default(),
            shift: Shift::default(),
            session_type: SessionType::default(),
            notes: String::new(),
            limits,
        };
        // the configured default may exceed the default year's capacity
        form.set_batch_year(batch_year);
        form
    }

    pub fn with_max_timer_minutes(mut self, max: u32) -> Self {
        self.max_timer_minutes = max.max(1);
        self
    }

    pub fn step(&self) -> FormStep {
        self.step
    }

    pub fn focused(&self) -> FormField {
        self.step.fields()[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.step.fields().len();
    }

    pub fn focus_prev(&mut self) {
        let len = self.step.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn set_class_name(&mut self, name: &str) {
        self.class_name = name.to_string();
    }

    pub fn set_group(&mut self, group: &str) {
        self.group = group.to_string();
    }

    pub fn batch_year(&self) -> u16 {
        self.batch_year
    }

    pub fn capacity(&self) -> u32 {
        self.limits.capacity(self.batch_year)
    }

    /// Changing the year clamps the roster size to that year's capacity.
    pub fn set_batch_year(&mut self, year: u16) {
        self.batch_year = year;
        let max = self.capacity();
        if self.expected_students > max {
            self.expected_students = max;
        }
    }

    pub fn expected_students(&self) -> u32 {
        self.expected_students
    }

    pub fn set_expected_students(&mut self, count: u32) {
        self.expected_students = count;
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
    }

    pub fn start(&self) -> TimeSlot {
        self.start
    }

    /// Clears the end time when it is no longer after the new start.
    pub fn set_start(&mut self, start: TimeSlot) {
        self.start = start;
        if self.end.is_some_and(|end| end <= start) {
            self.end = None;
        }
    }

    pub fn end(&self) -> Option<TimeSlot> {
        self.end
    }

    pub fn end_slots(&self) -> Vec<TimeSlot> {
        TimeSlot::after(self.start)
    }

    /// Only slots offered by [`SessionForm::end_slots`] are accepted.
    pub fn set_end(&mut self, end: TimeSlot) -> bool {
        if end > self.start {
            self.end = Some(end);
            true
        } else {
            false
        }
    }

    pub fn timer_minutes(&self) -> u32 {
        self.timer_minutes
    }

    pub fn set_timer_minutes(&mut self, minutes: u32) {
        self.timer_minutes = minutes;
    }

    pub fn set_semester(&mut self, semester: Semester) {
        self.semester = semester;
    }

    pub fn set_shift(&mut self, shift: Shift) {
        self.shift = shift;
    }

    pub fn set_session_type(&mut self, session_type: SessionType) {
        self.session_type = session_type;
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.notes = notes.to_string();
    }

    /// Display value of a field.
    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::ClassName => self.class_name.clone(),
            FormField::Group => self.group.clone(),
            FormField::BatchYear => self.batch_year.to_string(),
            FormField::ExpectedStudents => {
                format!("{} (max {})", self.expected_students, self.capacity())
            }
            FormField::Date => self.date.format("%Y-%m-%d").to_string(),
            FormField::Start => self.start.to_string(),
            FormField::End => self
                .end
                .map(|e| e.to_string())
                .unwrap_or_else(|| "--:--".to_string()),
            FormField::TimerMinutes => self.timer_minutes.to_string(),
            FormField::Semester => self.semester.to_string(),
            FormField::Shift => self.shift.to_string(),
            FormField::SessionType => self.session_type.to_string(),
            FormField::Notes => self.notes.clone(),
        }
    }

    /// Typed character on the focused field.
    pub fn input_char(&mut self, c: char) {
        match self.focused() {
            FormField::ClassName => self.class_name.push(c),
            FormField::Group => self.group.push(c),
            FormField::Notes => self.notes.push(c),
            FormField::ExpectedStudents => {
                if let Some(d) = c.to_digit(10) {
                    self.expected_students =
                        append_digit(self.expected_students, d).min(GLOBAL_MAX_STUDENTS);
                }
            }
            FormField::TimerMinutes => {
                if let Some(d) = c.to_digit(10) {
                    self.timer_minutes = append_digit(self.timer_minutes, d).min(999);
                }
            }
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focused() {
            FormField::ClassName => {
                self.class_name.pop();
            }
            FormField::Group => {
                self.group.pop();
            }
            FormField::Notes => {
                self.notes.pop();
            }
            FormField::ExpectedStudents => self.expected_students /= 10,
            FormField::TimerMinutes => self.timer_minutes /= 10,
            _ => {}
        }
    }

    /// Left/right on the focused field.
    pub fn adjust(&mut self, delta: i32) {
        match self.focused() {
            FormField::BatchYear => {
                let year = (self.batch_year as i32 + delta).clamp(2000, 2100) as u16;
                self.set_batch_year(year);
            }
            FormField::ExpectedStudents => {
                self.expected_students = step_u32(self.expected_students, delta, self.capacity());
            }
            FormField::Date => {
                if let Some(date) = self
                    .date
                    .checked_add_signed(ChronoDuration::days(delta as i64))
                {
                    self.date = date;
                }
            }
            FormField::Start => {
                // the last slot cannot start a session
                let slots = TimeSlot::all();
                let starts = &slots[..slots.len() - 1];
                self.set_start(cycle(starts, &self.start, delta));
            }
            FormField::End => {
                let ends = self.end_slots();
                if ends.is_empty() {
                    return;
                }
                let next = match self.end {
                    Some(end) => cycle(&ends, &end, delta),
                    None => ends[0],
                };
                self.set_end(next);
            }
            FormField::TimerMinutes => {
                self.timer_minutes = step_u32(self.timer_minutes, delta, self.max_timer_minutes);
            }
            FormField::Semester => self.semester = cycle(&Semester::ALL, &self.semester, delta),
            FormField::Shift => self.shift = cycle(&Shift::ALL, &self.shift, delta),
            FormField::SessionType => {
                self.session_type = cycle(&SessionType::ALL, &self.session_type, delta)
            }
            FormField::ClassName | FormField::Group | FormField::Notes => {}
        }
    }

    fn validate_step(&self, step: FormStep) -> Result<(), FormError> {
        match step {
            FormStep::Basics => {
                if self.class_name.trim().is_empty() {
                    return Err(FormError::MissingClassName);
                }
                let max = self.capacity();
                if !(1..=max).contains(&self.expected_students) {
                    return Err(FormError::StudentCount { max });
                }
            }
            FormStep::Schedule => match self.end {
                Some(end) if end > self.start => {}
                _ => return Err(FormError::EndTime),
            },
            FormStep::Settings => {
                let max = self.max_timer_minutes;
                if !(1..=max).contains(&self.timer_minutes) {
                    return Err(FormError::TimerDuration { max });
                }
            }
        }
        Ok(())
    }

    /// Validate the current step and move forward. On the last step this produces the
    /// session configuration.
    pub fn next(&mut self) -> Result<FormNav, FormError> {
        self.validate_step(self.step)?;
        let next = match self.step {
            FormStep::Basics => FormStep::Schedule,
            FormStep::Schedule => FormStep::Settings,
            FormStep::Settings => return self.submit().map(|c| FormNav::Done(Box::new(c))),
        };
        self.step = next;
        self.focus = 0;
        Ok(FormNav::Step(next))
    }

    pub fn back(&mut self) -> FormNav {
        let prev = match self.step {
            FormStep::Basics => return FormNav::Exit,
            FormStep::Schedule => FormStep::Basics,
            FormStep::Settings => FormStep::Schedule,
        };
        self.step = prev;
        self.focus = 0;
        FormNav::Step(prev)
    }

    pub fn submit(&self) -> Result<SessionConfig, FormError> {
        for step in FormStep::ALL {
            self.validate_step(step)?;
        }
        let group = self.group.trim();
        Ok(SessionConfig {
            timer_minutes: self.timer_minutes,
            expected_students: self.expected_students,
            class_name: self.class_name.trim().to_string(),
            group: (!group.is_empty()).then(|| group.to_string()),
            semester: self.semester,
            batch_year: self.batch_year,
            shift: self.shift,
            session_type: self.session_type,
            date: self.date,
            start: self.start,
            end: self.end.ok_or(FormError::EndTime)?,
            notes: self.notes.trim().to_string(),
            teacher: None,
        })
    }
}

fn append_digit(value: u32, digit: u32) -> u32 {
    value.saturating_mul(10).saturating_add(digit)
}

fn step_u32(value: u32, delta: i32, max: u32) -> u32 {
    (value as i64 + delta as i64).clamp(1, max.max(1) as i64) as u32
}

fn cycle<T: Copy + PartialEq>(items: &[T], current: &T, delta: i32) -> T {
    let len = items.len() as i32;
    let idx = items.iter().position(|i| i == current).unwrap_or(0) as i32;
    items[(idx + delta).rem_euclid(len) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn form() -> SessionForm {
        SessionForm::new(BatchLimits::new([(2023, 200), (2024, 180)]), 5, 50)
    }

    fn filled() -> SessionForm {
        let mut form = form();
        form.set_class_name("CS 101");
        form
    }

    #[test]
    fn test_defaults() {
        let form = form();
        assert_eq!(form.step(), FormStep::Basics);
        assert_eq!(form.timer_minutes(), 5);
        assert_eq!(form.expected_students(), 50);
        assert_eq!(form.batch_year(), 2024);
        assert_eq!(form.end(), TimeSlot::new(8, 30));
    }

    #[test]
    fn test_year_change_clamps_student_count() {
        let mut form = form();
        form.set_batch_year(2030);
        form.set_expected_students(190);
        form.set_batch_year(2024);
        assert_eq!(form.expected_students(), 180);

        // raising capacity never raises the count
        form.set_batch_year(2023);
        assert_eq!(form.expected_students(), 180);
    }

    #[test]
    fn test_default_count_clamped_to_default_year() {
        let form = SessionForm::new(BatchLimits::new([(2024, 180)]), 5, 300);
        assert_eq!(form.batch_year(), 2024);
        assert_eq!(form.expected_students(), 180);
    }

    #[test]
    fn test_unknown_year_uses_global_max() {
        let form = form();
        assert_eq!(form.limits.capacity(1999), GLOBAL_MAX_STUDENTS);
    }

    #[test]
    fn test_class_name_required() {
        let mut form = form();
        form.set_class_name("   ");
        assert_eq!(form.next(), Err(FormError::MissingClassName));
        assert_eq!(form.step(), FormStep::Basics);
    }

    #[test]
    fn test_student_count_bounded() {
        let mut form = filled();
        form.set_expected_students(181);
        assert_eq!(form.next(), Err(FormError::StudentCount { max: 180 }));
        form.set_expected_students(0);
        assert_eq!(form.next(), Err(FormError::StudentCount { max: 180 }));
    }

    #[test]
    fn test_end_slots_strictly_after_start() {
        let mut form = form();
        for start in TimeSlot::all() {
            form.set_start(start);
            assert!(form.end_slots().iter().all(|end| *end > start));
        }
    }

    #[test]
    fn test_start_change_clears_stale_end() {
        let mut form = form();
        form.set_start(TimeSlot::new(9, 0).unwrap());
        assert!(form.set_end(TimeSlot::new(10, 0).unwrap()));
        form.set_start(TimeSlot::new(10, 0).unwrap());
        assert_eq!(form.end(), None);
        assert!(!form.set_end(TimeSlot::new(9, 30).unwrap()));
    }

    #[test]
    fn test_steps_forward_and_back() {
        let mut form = filled();
        assert_eq!(form.next(), Ok(FormNav::Step(FormStep::Schedule)));
        assert_eq!(form.next(), Ok(FormNav::Step(FormStep::Settings)));
        assert_eq!(form.back(), FormNav::Step(FormStep::Schedule));
        assert_eq!(form.back(), FormNav::Step(FormStep::Basics));
        assert_eq!(form.back(), FormNav::Exit);
    }

    #[test]
    fn test_schedule_requires_end() {
        let mut form = filled();
        form.next().unwrap();
        form.set_start(TimeSlot::new(12, 0).unwrap());
        form.set_start(TimeSlot::new(13, 0).unwrap());
        form.end = None;
        assert_eq!(form.next(), Err(FormError::EndTime));
    }

    #[test]
    fn test_last_step_submits_config() {
        let mut form = filled();
        form.set_group(" Section A ");
        form.next().unwrap();
        form.next().unwrap();
        form.set_timer_minutes(10);
        let nav = form.next().unwrap();
        assert_matches!(nav, FormNav::Done(config) => {
            assert_eq!(config.class_name, "CS 101");
            assert_eq!(config.group.as_deref(), Some("Section A"));
            assert_eq!(config.timer_minutes, 10);
            assert_eq!(config.expected_students, 50);
        });
    }

    #[test]
    fn test_timer_bounds() {
        let mut form = filled().with_max_timer_minutes(30);
        form.set_timer_minutes(31);
        assert_eq!(form.submit(), Err(FormError::TimerDuration { max: 30 }));
        form.set_timer_minutes(0);
        assert_eq!(form.submit(), Err(FormError::TimerDuration { max: 30 }));
    }

    #[test]
    fn test_keyboard_editing() {
        let mut form = form();
        for c in "Lab".chars() {
            form.input_char(c);
        }
        assert_eq!(form.class_name(), "Lab");
        form.backspace();
        assert_eq!(form.class_name(), "La");

        form.focus_next();
        form.focus_next();
        assert_eq!(form.focused(), FormField::BatchYear);
        form.adjust(-1);
        assert_eq!(form.batch_year(), 2023);

        form.focus_next();
        form.backspace();
        form.backspace();
        form.input_char('4');
        form.input_char('2');
        assert_eq!(form.expected_students(), 42);
        form.adjust(1);
        assert_eq!(form.expected_students(), 43);

        form.focus_next();
        assert_eq!(form.focused(), FormField::ClassName);
        form.focus_prev();
        assert_eq!(form.focused(), FormField::ExpectedStudents);
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(cycle(&Shift::ALL, &Shift::Evening, 1), Shift::Morning);
        assert_eq!(cycle(&Shift::ALL, &Shift::Morning, -1), Shift::Evening);
    }
}
