use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::export::{attendance_csv, ExportError};
use crate::session::SessionConfig;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
pub enum EndReason {
    #[strum(serialize = "time expired")]
    TimerExpired,
    #[strum(serialize = "ended early")]
    EndedEarly,
    #[strum(serialize = "closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub present: usize,
    pub expected: u32,
}

impl Tally {
    pub fn absent(&self) -> usize {
        (self.expected as usize).saturating_sub(self.present)
    }

    pub fn percentage(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            ((self.present as f64 / self.expected as f64) * 100.0).round()
        }
    }
}

/// Read-only record of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub config: SessionConfig,
    pub marked: BTreeSet<u32>,
    pub end_reason: EndReason,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}

impl SessionSummary {
    pub fn tally(&self) -> Tally {
        Tally {
            present: self.marked.len(),
            expected: self.config.expected_students,
        }
    }

    pub fn export_csv(&self) -> Result<String, ExportError> {
        attendance_csv(self.config.expected_students, &self.marked)
    }

    /// Administrative correction after the fact. Returns the roll's new presence, or
    /// `None` when the roll is outside the roster.
    pub fn toggle(&mut self, roll: u32) -> Option<bool> {
        if !(1..=self.config.expected_students).contains(&roll) {
            return None;
        }
        if self.marked.remove(&roll) {
            Some(false)
        } else {
            self.marked.insert(roll);
            Some(true)
        }
    }

    /// `cs-101_2024-01-15_090530.csv`, stamped with the session's start time.
    pub fn export_file_name(&self) -> String {
        let slug: String = self
            .config
            .title()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        let slug = slug
            .split('-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        format!("{}_{}.csv", slug, self.started_at.format("%Y-%m-%d_%H%M%S"))
    }
}
