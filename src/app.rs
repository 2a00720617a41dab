use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{info, warn};

use crate::auth::{Authenticator, Credentials, Identity, Role};
use crate::config::{Settings, SettingsEditor, SettingsStore};
use crate::controller::{ControllerSettings, LiveSession, SessionUpdate};
use crate::event_source::AttendanceEventSource;
use crate::form::{FormNav, SessionForm};
use crate::routes::Route;
use crate::scan::{ScanAttempt, ScanOutcome, ScanPhase};
use crate::session::SessionConfig;
use crate::sink::{CsvFileSink, MemoryArchive, SessionSink};

/// Builds the event source for each new live session.
pub type SourceFactory = Box<dyn FnMut() -> Box<dyn AttendanceEventSource>>;

const MAX_ROLL_DIGITS: usize = 4;
const MAX_CODE_LEN: usize = 12;

pub const HOME_MENU: [&str; 4] = ["Teacher", "Student", "Admin", "Quit"];
pub const ADMIN_MENU: [&str; 4] = [
    "Attendance Sessions",
    "Teachers",
    "System Settings",
    "Back to Home",
];

/// Quick numbers for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub sessions: usize,
    pub students_marked: usize,
    pub teachers: usize,
}

/// One row of the admin teacher list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherRow {
    pub login: String,
    pub sessions: usize,
    pub live: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LoginState {
    pub credentials: Credentials,
    pub focus_password: bool,
    pub error: Option<String>,
}

impl LoginState {
    fn input_char(&mut self, c: char) {
        if self.focus_password {
            self.credentials.password.push(c);
        } else {
            self.credentials.login.push(c);
        }
    }

    fn backspace(&mut self) {
        if self.focus_password {
            self.credentials.password.pop();
        } else {
            self.credentials.login.pop();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StudentState {
    pub roll_input: String,
    pub code_input: String,
    pub attempt: Option<ScanAttempt>,
    pub error: Option<String>,
    pending_code: Option<String>,
}

/// Whole-application state: current route plus what each screen needs.
pub struct App {
    pub route: Route,
    pub settings: Settings,
    pub teacher: Option<Identity>,
    pub admin: Option<Identity>,
    pub login: LoginState,
    pub form: SessionForm,
    pub form_error: Option<String>,
    pub live: Option<LiveSession>,
    /// Roll number typed for a manual override.
    pub roll_input: String,
    pub archive: MemoryArchive,
    pub exporter: CsvFileSink,
    pub student: StudentState,
    pub notice: Option<String>,
    pub home_selection: usize,
    pub admin_selection: usize,
    pub dashboard_selection: usize,
    pub settings_editor: SettingsEditor,
    pub should_quit: bool,
    authenticator: Box<dyn Authenticator>,
    new_source: SourceFactory,
    settings_store: Option<Box<dyn SettingsStore>>,
}

impl App {
    pub fn new(
        settings: Settings,
        authenticator: Box<dyn Authenticator>,
        new_source: SourceFactory,
        exporter: CsvFileSink,
    ) -> Self {
        Self {
            route: Route::Home,
            form: new_form(&settings),
            settings_editor: SettingsEditor::new(&settings),
            settings,
            teacher: None,
            admin: None,
            login: LoginState::default(),
            form_error: None,
            live: None,
            roll_input: String::new(),
            archive: MemoryArchive::new(),
            exporter,
            student: StudentState::default(),
            notice: None,
            home_selection: 0,
            admin_selection: 0,
            dashboard_selection: 0,
            should_quit: false,
            authenticator,
            new_source,
            settings_store: None,
        }
    }

    /// Where the admin settings screen persists to. Without a store, saves only apply to
    /// this run.
    pub fn with_settings_store(mut self, store: Box<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn dashboard_stats(&self) -> DashboardStats {
        DashboardStats {
            sessions: self.archive.len(),
            students_marked: self
                .archive
                .sessions()
                .iter()
                .map(|s| s.tally().present)
                .sum(),
            teachers: self.settings.teachers.len(),
        }
    }

    pub fn teacher_rows(&self) -> Vec<TeacherRow> {
        let ran_by = |login: &str, config: &SessionConfig| config.teacher.as_deref() == Some(login);
        self.settings
            .teachers
            .iter()
            .map(|account| TeacherRow {
                login: account.login.clone(),
                sessions: self
                    .archive
                    .sessions()
                    .iter()
                    .filter(|s| ran_by(&account.login, &s.config))
                    .count(),
                live: self
                    .live
                    .as_ref()
                    .is_some_and(|live| live.is_active() && ran_by(&account.login, live.config())),
            })
            .collect()
    }

    /// Switch screens. Guarded routes fall back to the matching login.
    pub fn navigate(&mut self, route: Route) {
        let route = if route.requires_teacher() && self.teacher.is_none() {
            Route::TeacherLogin
        } else if route.requires_admin() && self.admin.is_none() {
            Route::AdminLogin
        } else {
            route
        };
        if matches!(route, Route::TeacherLogin | Route::AdminLogin) && route != self.route {
            self.login = LoginState::default();
        }
        if route == Route::AdminSettings && self.route != Route::AdminSettings {
            self.settings_editor = SettingsEditor::new(&self.settings);
        }
        self.roll_input.clear();
        self.route = route;
    }

    pub fn start_session(&mut self, mut config: SessionConfig) {
        if let Some(mut previous) = self.live.take() {
            self.store(previous.close());
        }
        if config.teacher.is_none() {
            config.teacher = self.teacher.as_ref().map(|t| t.login.clone());
        }
        let source = (self.new_source)();
        let settings = ControllerSettings::from(&self.settings);
        self.live = Some(LiveSession::new(config, source, settings));
        self.form = new_form(&self.settings);
        self.form_error = None;
        self.notice = None;
        self.navigate(Route::LiveSession);
    }

    /// Tears down the live session, archives and exports it, and shows its summary.
    pub fn finish_live(&mut self) {
        if let Some(mut live) = self.live.take() {
            let summary = live.close();
            self.store(summary);
            let session = self.archive.len().saturating_sub(1);
            self.navigate(Route::SessionSummary { session });
        }
    }

    fn store(&mut self, summary: crate::summary::SessionSummary) {
        if let Err(e) = self.archive.store(&summary) {
            warn!("could not archive session: {e}");
        }
        match self.exporter.write(&summary) {
            Ok(path) => self.notice = Some(format!("Exported to {}", path.display())),
            Err(e) => {
                warn!("export failed: {e}");
                self.notice = Some(format!("Export failed: {e}"));
            }
        }
    }

    pub fn quit(&mut self) {
        self.finish_live();
        self.should_quit = true;
    }

    /// Advance live state by `elapsed` wall-clock time.
    pub fn on_tick(&mut self, elapsed: Duration) {
        if let Some(live) = self.live.as_mut() {
            for update in live.advance(elapsed) {
                if update == SessionUpdate::Expired {
                    self.notice = Some("Time is up. The session has ended.".to_string());
                }
            }
        }
        self.resolve_pending_scan();
    }

    fn resolve_pending_scan(&mut self) {
        let Some(code) = self.student.pending_code.take() else {
            return;
        };
        let Some(attempt) = self.student.attempt.as_mut() else {
            return;
        };
        let outcome = match self.live.as_mut() {
            Some(live) => live.submit_scan(attempt.roll(), &code),
            None => ScanOutcome::SessionEnded,
        };
        info!("student scan for roll {}: {}", attempt.roll(), outcome);
        attempt.resolve(outcome);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        match self.route {
            Route::Home => self.on_home_key(key),
            Route::TeacherLogin => self.on_login_key(key, Role::Teacher),
            Route::AdminLogin => self.on_login_key(key, Role::Admin),
            Route::CreateSession => self.on_form_key(key),
            Route::LiveSession => self.on_live_key(key),
            Route::SessionSummary { session } => self.on_summary_key(key, session),
            Route::StudentEntry => self.on_student_entry_key(key),
            Route::StudentScan { .. } => self.on_scan_key(key),
            Route::AdminDashboard => self.on_dashboard_key(key),
            Route::AdminSessions { selected } => self.on_admin_key(key, selected),
            Route::AdminTeachers => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    self.navigate(Route::AdminDashboard)
                }
            }
            Route::AdminSettings => self.on_settings_key(key),
        }
    }

    fn on_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => {
                self.home_selection = (self.home_selection + HOME_MENU.len() - 1) % HOME_MENU.len()
            }
            KeyCode::Down | KeyCode::Tab => {
                self.home_selection = (self.home_selection + 1) % HOME_MENU.len()
            }
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Enter => match self.home_selection {
                0 if self.live.is_some() => self.navigate(Route::LiveSession),
                0 => self.navigate(Route::CreateSession),
                1 => self.navigate(Route::StudentEntry),
                2 => self.navigate(Route::AdminDashboard),
                _ => self.quit(),
            },
            _ => {}
        }
    }

    fn on_login_key(&mut self, key: KeyEvent, role: Role) {
        match key.code {
            KeyCode::Esc => self.navigate(Route::Home),
            KeyCode::Tab | KeyCode::Up | KeyCode::Down | KeyCode::BackTab => {
                self.login.focus_password = !self.login.focus_password
            }
            KeyCode::Backspace => self.login.backspace(),
            KeyCode::Char(c) => self.login.input_char(c),
            KeyCode::Enter => {
                match self
                    .authenticator
                    .authenticate(role, &self.login.credentials)
                {
                    Ok(identity) => {
                        info!("{} signed in as {}", identity.role, identity.login);
                        match role {
                            Role::Teacher => {
                                self.teacher = Some(identity);
                                let next = if self.live.is_some() {
                                    Route::LiveSession
                                } else {
                                    Route::CreateSession
                                };
                                self.navigate(next);
                            }
                            Role::Admin => {
                                self.admin = Some(identity);
                                self.navigate(Route::AdminDashboard);
                            }
                        }
                        self.login = LoginState::default();
                    }
                    Err(e) => {
                        warn!("{role} sign-in failed: {e}");
                        self.login.credentials.password.clear();
                        self.login.error = Some(e.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.form_error = None;
                if self.form.back() == FormNav::Exit {
                    self.navigate(Route::Home);
                }
            }
            KeyCode::Enter => match self.form.next() {
                Ok(FormNav::Done(config)) => self.start_session(*config),
                Ok(_) => self.form_error = None,
                Err(e) => self.form_error = Some(e.to_string()),
            },
            KeyCode::Tab | KeyCode::Down => self.form.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.form.focus_prev(),
            KeyCode::Left => self.form.adjust(-1),
            KeyCode::Right => self.form.adjust(1),
            KeyCode::Backspace => self.form.backspace(),
            KeyCode::Char(c) => self.form.input_char(c),
            _ => {}
        }
    }

    fn on_live_key(&mut self, key: KeyEvent) {
        let Some(live) = self.live.as_mut() else {
            self.navigate(Route::CreateSession);
            return;
        };

        if live.is_end_requested() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    live.confirm_end();
                }
                KeyCode::Char('n') | KeyCode::Esc => live.cancel_end(),
                _ => {}
            }
            return;
        }

        if !live.is_active() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q')) {
                self.finish_live();
            }
            return;
        }

        match key.code {
            KeyCode::Char(' ') | KeyCode::Char('p') => live.toggle_pause(),
            KeyCode::Char('r') => live.rotate_code(),
            KeyCode::Char('e') | KeyCode::Esc => live.request_end(),
            KeyCode::Char('v') => self.navigate(Route::StudentEntry),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.roll_input.len() < MAX_ROLL_DIGITS {
                    self.roll_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.roll_input.pop();
            }
            KeyCode::Enter | KeyCode::Char('m') => {
                let roll = self.roll_input.parse::<u32>().unwrap_or(0);
                self.roll_input.clear();
                self.notice = Some(match live.manual_toggle(roll) {
                    Ok(true) => format!("Roll {roll} marked present"),
                    Ok(false) => format!("Roll {roll} marked absent"),
                    Err(e) => e.to_string(),
                });
            }
            _ => {}
        }
    }

    fn on_summary_key(&mut self, key: KeyEvent, session: usize) {
        match key.code {
            KeyCode::Char('n') => self.navigate(Route::CreateSession),
            KeyCode::Char('x') => self.export_archived(session),
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.navigate(Route::Home),
            _ => {}
        }
    }

    fn export_archived(&mut self, session: usize) {
        let Some(summary) = self.archive.get(session) else {
            return;
        };
        self.notice = Some(match self.exporter.write(summary) {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(e) => format!("Export failed: {e}"),
        });
    }

    fn on_student_entry_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.navigate(Route::Home),
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.student.roll_input.len() < MAX_ROLL_DIGITS {
                    self.student.roll_input.push(c);
                }
            }
            KeyCode::Backspace => {
                self.student.roll_input.pop();
            }
            KeyCode::Enter => match self.student.roll_input.parse::<u32>() {
                Ok(roll) if roll > 0 => {
                    self.student.error = None;
                    self.student.code_input.clear();
                    self.student.attempt = Some(ScanAttempt::new(roll));
                    self.navigate(Route::StudentScan { roll });
                }
                _ => self.student.error = Some("Enter a valid roll number".to_string()),
            },
            _ => {}
        }
    }

    fn on_scan_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.student = StudentState {
                roll_input: std::mem::take(&mut self.student.roll_input),
                ..StudentState::default()
            };
            self.navigate(Route::StudentEntry);
            return;
        }
        let Some(attempt) = self.student.attempt.as_mut() else {
            self.navigate(Route::StudentEntry);
            return;
        };

        match attempt.phase() {
            ScanPhase::Scanning => match key.code {
                KeyCode::Char(c) if c.is_ascii_alphanumeric() => {
                    if self.student.code_input.len() < MAX_CODE_LEN {
                        self.student.code_input.push(c.to_ascii_uppercase());
                    }
                }
                KeyCode::Backspace => {
                    self.student.code_input.pop();
                }
                KeyCode::Enter if !self.student.code_input.is_empty() => {
                    if attempt.begin() {
                        self.student.pending_code = Some(self.student.code_input.clone());
                    }
                }
                _ => {}
            },
            ScanPhase::Loading => {}
            ScanPhase::Done(_) => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('r')) && attempt.retry() {
                    self.student.code_input.clear();
                }
            }
        }
    }

    fn on_admin_key(&mut self, key: KeyEvent, selected: Option<usize>) {
        match selected {
            None => match key.code {
                KeyCode::Esc => self.navigate(Route::AdminDashboard),
                KeyCode::Up => self.admin_selection = self.admin_selection.saturating_sub(1),
                KeyCode::Down => {
                    if self.admin_selection + 1 < self.archive.len() {
                        self.admin_selection += 1;
                    }
                }
                KeyCode::Enter if self.admin_selection < self.archive.len() => {
                    self.navigate(Route::AdminSessions {
                        selected: Some(self.admin_selection),
                    })
                }
                _ => {}
            },
            Some(idx) => match key.code {
                KeyCode::Esc => self.navigate(Route::AdminSessions { selected: None }),
                KeyCode::Char('x') => self.export_archived(idx),
                KeyCode::Char(c) if c.is_ascii_digit() => {
                    if self.roll_input.len() < MAX_ROLL_DIGITS {
                        self.roll_input.push(c);
                    }
                }
                KeyCode::Backspace => {
                    self.roll_input.pop();
                }
                KeyCode::Enter => {
                    let roll = self.roll_input.parse::<u32>().unwrap_or(0);
                    self.roll_input.clear();
                    if !self.settings.allow_manual_marking {
                        self.notice = Some("Manual marking is disabled".to_string());
                        return;
                    }
                    if let Some(summary) = self.archive.get_mut(idx) {
                        self.notice = Some(match summary.toggle(roll) {
                            Some(true) => format!("Roll {roll} marked present"),
                            Some(false) => format!("Roll {roll} marked absent"),
                            None => format!("Roll number {roll} is not on this roster"),
                        });
                    }
                }
                _ => {}
            },
        }
    }

    fn on_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.navigate(Route::Home),
            KeyCode::Up => {
                self.dashboard_selection =
                    (self.dashboard_selection + ADMIN_MENU.len() - 1) % ADMIN_MENU.len()
            }
            KeyCode::Down | KeyCode::Tab => {
                self.dashboard_selection = (self.dashboard_selection + 1) % ADMIN_MENU.len()
            }
            KeyCode::Enter => match self.dashboard_selection {
                0 => self.navigate(Route::AdminSessions { selected: None }),
                1 => self.navigate(Route::AdminTeachers),
                2 => self.navigate(Route::AdminSettings),
                _ => self.navigate(Route::Home),
            },
            _ => {}
        }
    }

    fn on_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.navigate(Route::AdminDashboard),
            KeyCode::Tab | KeyCode::Down => self.settings_editor.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.settings_editor.focus_prev(),
            KeyCode::Left => self.settings_editor.adjust(-1),
            KeyCode::Right | KeyCode::Char(' ') => self.settings_editor.adjust(1),
            KeyCode::Enter | KeyCode::Char('s') => self.save_settings(),
            _ => {}
        }
    }

    /// Applies the draft and writes it to the settings store, if there is one.
    pub fn save_settings(&mut self) {
        let draft = self.settings_editor.draft().clone();
        let saved = match self.settings_store.as_ref() {
            Some(store) => store.save(&draft).map(|_| true),
            None => Ok(false),
        };
        match saved {
            Ok(persisted) => {
                info!(
                    "settings updated: default {} min, max {} min, manual marking {}",
                    draft.default_timer_minutes,
                    draft.max_timer_minutes,
                    draft.allow_manual_marking
                );
                self.settings = draft;
                self.settings_editor = SettingsEditor::new(&self.settings);
                self.form = new_form(&self.settings);
                self.notice = Some(if persisted {
                    "Settings saved".to_string()
                } else {
                    "Settings applied for this run".to_string()
                });
            }
            Err(e) => {
                warn!("could not save settings: {e}");
                self.notice = Some(format!("Could not save settings: {e}"));
            }
        }
    }
}

fn new_form(settings: &Settings) -> SessionForm {
    SessionForm::new(
        settings.batch_limits.clone(),
        settings.default_timer_minutes,
        settings.default_expected_students,
    )
    .with_max_timer_minutes(settings.max_timer_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Account, CredentialTable};
    use crate::config::{FileSettingsStore, SettingsField};
    use crate::event_source::SimulatedScans;
    use crate::form::FormStep;
    use crate::summary::EndReason;
    use tempfile::{tempdir, TempDir};

    fn app() -> (App, TempDir) {
        let dir = tempdir().unwrap();
        let settings = Settings::default();
        let auth = CredentialTable::new(
            vec![Account::new("t@school.edu", "pw")],
            vec![Account::new("admin", "root")],
        );
        let mut seed = 0;
        let app = App::new(
            settings,
            Box::new(auth),
            Box::new(move || {
                seed += 1;
                Box::new(SimulatedScans::seeded(seed)) as Box<dyn AttendanceEventSource>
            }),
            CsvFileSink::new(dir.path()),
        );
        (app, dir)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn sign_in_teacher(app: &mut App) {
        app.navigate(Route::CreateSession);
        assert_eq!(app.route, Route::TeacherLogin);
        type_str(app, "t@school.edu");
        press(app, KeyCode::Tab);
        type_str(app, "pw");
        press(app, KeyCode::Enter);
        assert_eq!(app.route, Route::CreateSession);
    }

    fn sign_in_admin(app: &mut App) {
        app.navigate(Route::AdminDashboard);
        assert_eq!(app.route, Route::AdminLogin);
        type_str(app, "admin");
        press(app, KeyCode::Tab);
        type_str(app, "root");
        press(app, KeyCode::Enter);
        assert_eq!(app.route, Route::AdminDashboard);
    }

    fn start_live(app: &mut App, students: u32) {
        sign_in_teacher(app);
        app.form.set_class_name("CS 101");
        app.form.set_expected_students(students);
        press(app, KeyCode::Enter);
        press(app, KeyCode::Enter);
        press(app, KeyCode::Enter);
        assert_eq!(app.route, Route::LiveSession);
    }

    #[test]
    fn test_guarded_routes_redirect_to_login() {
        let (mut app, _dir) = app();
        app.navigate(Route::LiveSession);
        assert_eq!(app.route, Route::TeacherLogin);
        app.navigate(Route::AdminSessions { selected: None });
        assert_eq!(app.route, Route::AdminLogin);
    }

    #[test]
    fn test_failed_login_stays_put() {
        let (mut app, _dir) = app();
        app.navigate(Route::TeacherLogin);
        type_str(&mut app, "t@school.edu");
        press(&mut app, KeyCode::Tab);
        type_str(&mut app, "wrong");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::TeacherLogin);
        assert_eq!(app.login.error.as_deref(), Some("invalid login or password"));
        assert!(app.login.credentials.password.is_empty());
        assert!(app.teacher.is_none());
    }

    #[test]
    fn test_form_back_from_first_step_exits() {
        let (mut app, _dir) = app();
        sign_in_teacher(&mut app);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.route, Route::Home);
    }

    #[test]
    fn test_form_errors_are_shown() {
        let (mut app, _dir) = app();
        sign_in_teacher(&mut app);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.form.step(), FormStep::Basics);
        assert_eq!(app.form_error.as_deref(), Some("class name is required"));
    }

    #[test]
    fn test_live_session_to_summary() {
        let (mut app, dir) = app();
        start_live(&mut app, 5);
        app.on_tick(Duration::from_secs(4));
        assert_eq!(app.live.as_ref().unwrap().marked().len(), 2);

        press(&mut app, KeyCode::Char('e'));
        assert!(app.live.as_ref().unwrap().is_end_requested());
        press(&mut app, KeyCode::Char('n'));
        assert!(app.live.as_ref().unwrap().is_active());

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('y'));
        let live = app.live.as_ref().unwrap();
        assert!(!live.is_active());
        assert_eq!(live.end_reason(), Some(EndReason::EndedEarly));

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::SessionSummary { session: 0 });
        assert!(app.live.is_none());
        assert_eq!(app.archive.len(), 1);
        assert_eq!(app.archive.get(0).unwrap().end_reason, EndReason::EndedEarly);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_manual_override_from_live_screen() {
        let (mut app, _dir) = app();
        start_live(&mut app, 30);
        type_str(&mut app, "12");
        press(&mut app, KeyCode::Enter);
        assert!(app.live.as_ref().unwrap().marked().contains(&12));
        assert_eq!(app.notice.as_deref(), Some("Roll 12 marked present"));

        type_str(&mut app, "99");
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.notice.as_deref(),
            Some("roll number 99 is not on this roster")
        );
    }

    #[test]
    fn test_student_scan_against_live_code() {
        let (mut app, _dir) = app();
        start_live(&mut app, 40);
        let code = app.live.as_ref().unwrap().code().to_string();

        press(&mut app, KeyCode::Char('v'));
        assert_eq!(app.route, Route::StudentEntry);
        type_str(&mut app, "39");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::StudentScan { roll: 39 });

        type_str(&mut app, "WRONG1");
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.student.attempt.as_ref().unwrap().phase(),
            ScanPhase::Loading
        );
        app.on_tick(Duration::from_millis(100));
        assert_eq!(
            app.student.attempt.as_ref().unwrap().phase(),
            ScanPhase::Done(ScanOutcome::InvalidCode)
        );

        press(&mut app, KeyCode::Char('r'));
        type_str(&mut app, &code);
        press(&mut app, KeyCode::Enter);
        app.on_tick(Duration::from_millis(100));
        let attempt = app.student.attempt.as_ref().unwrap();
        let outcome = match attempt.phase() {
            ScanPhase::Done(outcome) => outcome,
            other => panic!("unexpected phase {other:?}"),
        };
        // the simulated feed may have picked roll 39 already
        assert!(matches!(
            outcome,
            ScanOutcome::Marked | ScanOutcome::AlreadyMarked
        ));
        assert!(app.live.as_ref().unwrap().marked().contains(&39));
    }

    #[test]
    fn test_student_scan_without_session_reports_ended() {
        let (mut app, _dir) = app();
        app.navigate(Route::StudentEntry);
        type_str(&mut app, "7");
        press(&mut app, KeyCode::Enter);
        type_str(&mut app, "abc");
        press(&mut app, KeyCode::Enter);
        app.on_tick(Duration::ZERO);
        let attempt = app.student.attempt.as_ref().unwrap();
        assert_eq!(attempt.phase(), ScanPhase::Done(ScanOutcome::SessionEnded));
        assert!(!attempt.can_scan());
    }

    #[test]
    fn test_invalid_roll_entry() {
        let (mut app, _dir) = app();
        app.navigate(Route::StudentEntry);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::StudentEntry);
        assert!(app.student.error.is_some());
    }

    #[test]
    fn test_timer_expiry_sets_notice() {
        let (mut app, _dir) = app();
        start_live(&mut app, 10);
        app.on_tick(Duration::from_secs(5 * 60));
        assert!(!app.live.as_ref().unwrap().is_active());
        assert!(app.notice.as_deref().unwrap().contains("Time is up"));
    }

    #[test]
    fn test_admin_override_on_archive() {
        let (mut app, _dir) = app();
        start_live(&mut app, 3);
        app.live.as_mut().unwrap().end_now();
        app.finish_live();

        sign_in_admin(&mut app);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::AdminSessions { selected: None });

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::AdminSessions { selected: Some(0) });
        type_str(&mut app, "3");
        press(&mut app, KeyCode::Enter);
        assert!(app.archive.get(0).unwrap().marked.contains(&3));
    }

    #[test]
    fn test_quit_closes_live_session() {
        let (mut app, _dir) = app();
        start_live(&mut app, 3);
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert!(app.live.is_none());
        assert_eq!(app.archive.get(0).unwrap().end_reason, EndReason::Closed);
    }

    #[test]
    fn test_each_session_gets_its_own_export() {
        let (mut app, dir) = app();
        sign_in_teacher(&mut app);
        for _ in 0..2 {
            app.start_session(SessionConfig::quick("CS 101", 5, 5));
            app.finish_live();
        }
        assert_eq!(app.archive.len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_zero_minute_session_sets_notice() {
        let (mut app, _dir) = app();
        sign_in_teacher(&mut app);
        app.start_session(SessionConfig::quick("CS 101", 0, 5));
        assert!(app.notice.is_none());
        app.on_tick(Duration::ZERO);
        assert!(app.notice.as_deref().unwrap().contains("Time is up"));
    }

    #[test]
    fn test_sessions_record_their_teacher() {
        let (mut app, _dir) = app();
        start_live(&mut app, 4);
        assert_eq!(
            app.live.as_ref().unwrap().config().teacher.as_deref(),
            Some("t@school.edu")
        );
        app.on_tick(Duration::from_secs(4));
        app.finish_live();

        assert_eq!(
            app.dashboard_stats(),
            DashboardStats {
                sessions: 1,
                students_marked: 2,
                teachers: 1,
            }
        );
        // the default settings list one teacher account
        let rows = app.teacher_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].login, "teacher@school.edu");
        assert_eq!(rows[0].sessions, 0);
    }

    #[test]
    fn test_teacher_rows_count_sessions() {
        let (mut app, _dir) = app();
        app.settings.teachers.push(Account::new("t@school.edu", "pw"));
        start_live(&mut app, 4);
        app.finish_live();
        app.start_session(SessionConfig::quick("CS 102", 5, 4));

        let row = app
            .teacher_rows()
            .into_iter()
            .find(|r| r.login == "t@school.edu")
            .unwrap();
        assert_eq!(row.sessions, 1);
        assert!(row.live);
    }

    #[test]
    fn test_admin_dashboard_menu() {
        let (mut app, _dir) = app();
        sign_in_admin(&mut app);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::AdminTeachers);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.route, Route::AdminDashboard);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::AdminSettings);
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.route, Route::AdminSessions { selected: None });
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.route, Route::AdminDashboard);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.route, Route::Home);
    }

    #[test]
    fn test_admin_settings_save_persists() {
        let (app, dir) = app();
        let path = dir.path().join("settings.json");
        let mut app = app.with_settings_store(Box::new(FileSettingsStore::with_path(&path)));
        sign_in_admin(&mut app);
        app.navigate(Route::AdminSettings);

        assert_eq!(app.settings_editor.focused(), SettingsField::DefaultDuration);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.settings_editor.focused(), SettingsField::ManualMarking);
        press(&mut app, KeyCode::Char(' '));
        assert!(app.settings_editor.is_dirty());
        // nothing applies before saving
        assert_eq!(app.settings.default_timer_minutes, 5);

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.notice.as_deref(), Some("Settings saved"));
        assert_eq!(app.settings.default_timer_minutes, 7);
        assert!(!app.settings.allow_manual_marking);
        assert_eq!(app.form.timer_minutes(), 7);
        assert!(!app.settings_editor.is_dirty());

        let saved = FileSettingsStore::with_path(&path).load();
        assert_eq!(saved.default_timer_minutes, 7);
        assert!(!saved.allow_manual_marking);
    }

    #[test]
    fn test_admin_settings_without_store_apply_for_run() {
        let (mut app, _dir) = app();
        sign_in_admin(&mut app);
        app.navigate(Route::AdminSettings);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.notice.as_deref(), Some("Settings applied for this run"));
        assert_eq!(app.settings.default_timer_minutes, 4);
    }

    #[test]
    fn test_leaving_settings_discards_draft() {
        let (mut app, _dir) = app();
        sign_in_admin(&mut app);
        app.navigate(Route::AdminSettings);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Esc);
        app.navigate(Route::AdminSettings);
        assert!(!app.settings_editor.is_dirty());
        assert_eq!(app.settings_editor.draft().default_timer_minutes, 5);
    }
}
