use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::auth::Account;
use crate::controller::ControllerSettings;
use crate::form::{BatchLimits, DEFAULT_MAX_TIMER_MINUTES};
use crate::timer::DEFAULT_WARNING_SECS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub default_timer_minutes: u32,
    pub default_expected_students: u32,
    pub max_timer_minutes: u32,
    pub warning_threshold_secs: u32,
    pub mark_interval_ms: u64,
    pub allow_manual_marking: bool,
    pub batch_limits: BatchLimits,
    pub export_dir: Option<PathBuf>,
    pub teachers: Vec<Account>,
    pub admins: Vec<Account>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_timer_minutes: 5,
            default_expected_students: 50,
            max_timer_minutes: DEFAULT_MAX_TIMER_MINUTES,
            warning_threshold_secs: DEFAULT_WARNING_SECS,
            mark_interval_ms: 2000,
            allow_manual_marking: true,
            batch_limits: BatchLimits::new([(2022, 240), (2023, 200), (2024, 180), (2025, 180)]),
            export_dir: None,
            teachers: vec![Account::new("teacher@school.edu", "teacher")],
            admins: vec![Account::new("admin", "admin")],
        }
    }
}

impl Settings {
    pub fn mark_interval(&self) -> Duration {
        Duration::from_millis(self.mark_interval_ms.max(1))
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(AppDirs::export_dir)
    }
}

impl From<&Settings> for ControllerSettings {
    fn from(s: &Settings) -> Self {
        Self {
            mark_interval: s.mark_interval(),
            warning_threshold_secs: s.warning_threshold_secs,
            allow_manual_marking: s.allow_manual_marking,
            ..ControllerSettings::default()
        }
    }
}

/// Upper bound the admin screen allows for session length.
pub const TIMER_MINUTES_CEILING: u32 = 240;
const WARNING_STEP_SECS: i64 = 5;

/// Fields the admin settings screen can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SettingsField {
    #[strum(serialize = "Default session duration (minutes)")]
    DefaultDuration,
    #[strum(serialize = "Max session duration (minutes)")]
    MaxDuration,
    #[strum(serialize = "Warning threshold (seconds)")]
    WarningSecs,
    #[strum(serialize = "Allow manual marking")]
    ManualMarking,
}

impl SettingsField {
    pub const ALL: [SettingsField; 4] = [
        SettingsField::DefaultDuration,
        SettingsField::MaxDuration,
        SettingsField::WarningSecs,
        SettingsField::ManualMarking,
    ];
}

/// Draft copy of [`Settings`] edited on the admin screen; nothing changes until it is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsEditor {
    draft: Settings,
    focus: usize,
    dirty: bool,
}

impl SettingsEditor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            draft: settings.clone(),
            focus: 0,
            dirty: false,
        }
    }

    pub fn draft(&self) -> &Settings {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn focused(&self) -> SettingsField {
        SettingsField::ALL[self.focus]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % SettingsField::ALL.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + SettingsField::ALL.len() - 1) % SettingsField::ALL.len();
    }

    pub fn value(&self, field: SettingsField) -> String {
        match field {
            SettingsField::DefaultDuration => self.draft.default_timer_minutes.to_string(),
            SettingsField::MaxDuration => self.draft.max_timer_minutes.to_string(),
            SettingsField::WarningSecs => self.draft.warning_threshold_secs.to_string(),
            SettingsField::ManualMarking if self.draft.allow_manual_marking => "on".to_string(),
            SettingsField::ManualMarking => "off".to_string(),
        }
    }

    /// Step the focused field. Lowering the maximum drags the default down with it.
    pub fn adjust(&mut self, delta: i32) {
        let field = self.focused();
        let d = &mut self.draft;
        match field {
            SettingsField::DefaultDuration => {
                d.default_timer_minutes =
                    clamp_step(d.default_timer_minutes, delta as i64, 1, d.max_timer_minutes);
            }
            SettingsField::MaxDuration => {
                d.max_timer_minutes =
                    clamp_step(d.max_timer_minutes, delta as i64, 1, TIMER_MINUTES_CEILING);
                d.default_timer_minutes = d.default_timer_minutes.min(d.max_timer_minutes);
            }
            SettingsField::WarningSecs => {
                d.warning_threshold_secs = clamp_step(
                    d.warning_threshold_secs,
                    delta as i64 * WARNING_STEP_SECS,
                    0,
                    d.max_timer_minutes * 60,
                );
            }
            SettingsField::ManualMarking => d.allow_manual_marking = !d.allow_manual_marking,
        }
        self.dirty = true;
    }
}

fn clamp_step(value: u32, delta: i64, min: u32, max: u32) -> u32 {
    (value as i64 + delta).clamp(min as i64, max.max(min) as i64) as u32
}

pub trait SettingsStore {
    fn load(&self) -> Settings;
    fn save(&self, settings: &Settings) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::settings_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Settings>(&bytes) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("ignoring unreadable settings {}: {e}", self.path.display());
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        }
    }

    fn save(&self, settings: &Settings) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(settings)?;
        fs::write(&self.path, data)
    }
}
