use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use env_logger::{Env, Target};
use log::{info, LevelFilter};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use rollcall::{
    app::{App, SourceFactory},
    app_dirs::AppDirs,
    auth::CredentialTable,
    config::{FileSettingsStore, Settings, SettingsStore},
    event_source::{AttendanceEventSource, SimulatedScans},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    sink::CsvFileSink,
    ui,
};

const TICK_RATE_MS: u64 = 100;

/// terminal attendance console with live qr sessions
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Run timed attendance sessions from the terminal: a rotating session code for students to scan, a live roll grid, and a CSV export when the session ends."
)]
pub struct Cli {
    /// default session length in minutes
    #[clap(short = 'm', long, value_parser = clap::value_parser!(u32).range(1..))]
    minutes: Option<u32>,

    /// default number of expected students
    #[clap(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    students: Option<u32>,

    /// seconds left at which the countdown turns red
    #[clap(long)]
    warning_secs: Option<u32>,

    /// milliseconds between simulated scans
    #[clap(long, value_parser = clap::value_parser!(u64).range(1..))]
    mark_interval_ms: Option<u64>,

    /// settings file to use instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// directory for exported attendance sheets
    #[clap(short = 'o', long)]
    export_dir: Option<PathBuf>,

    /// seed for the simulated scan feed, for reproducible demos
    #[clap(long)]
    seed: Option<u64>,

    /// disable manual roll overrides
    #[clap(long)]
    no_manual_marking: bool,

    /// log file (defaults to the app state directory)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Command line flags take precedence over the settings file.
    fn apply(&self, settings: &mut Settings) {
        if let Some(minutes) = self.minutes {
            settings.default_timer_minutes = minutes;
            settings.max_timer_minutes = settings.max_timer_minutes.max(minutes);
        }
        if let Some(students) = self.students {
            settings.default_expected_students = students;
        }
        if let Some(secs) = self.warning_secs {
            settings.warning_threshold_secs = secs;
        }
        if let Some(ms) = self.mark_interval_ms {
            settings.mark_interval_ms = ms;
        }
        if let Some(dir) = &self.export_dir {
            settings.export_dir = Some(dir.clone());
        }
        if self.no_manual_marking {
            settings.allow_manual_marking = false;
        }
    }

    fn settings_store(&self) -> FileSettingsStore {
        match &self.config {
            Some(path) => FileSettingsStore::with_path(path),
            None => FileSettingsStore::new(),
        }
    }

    fn source_factory(&self) -> SourceFactory {
        let mut seed = self.seed;
        Box::new(move || -> Box<dyn AttendanceEventSource> {
            match seed.as_mut() {
                Some(s) => {
                    *s = s.wrapping_add(1);
                    Box::new(SimulatedScans::seeded(*s))
                }
                None => Box::new(SimulatedScans::new()),
            }
        })
    }
}

/// The terminal belongs to the UI, so logs go to a file. Logging is skipped when the file
/// cannot be opened.
fn init_logging(path: PathBuf) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("mio", LevelFilter::Warn)
        .target(Target::Pipe(Box::new(file)))
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging(cli.log_file.clone().unwrap_or_else(AppDirs::log_path));

    let store = cli.settings_store();
    let mut settings = store.load();
    cli.apply(&mut settings);
    info!("settings loaded from {}", store.path().display());

    let auth = CredentialTable::new(settings.teachers.clone(), settings.admins.clone());
    let exporter = CsvFileSink::new(settings.export_dir());
    let mut app = App::new(settings, Box::new(auth), cli.source_factory(), exporter)
        .with_settings_store(Box::new(store));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    // release the live session even if drawing failed
    app.finish_live();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| ui::draw(app, f))?;
    while !app.should_quit {
        let step = runner.step();

        // wall-clock time drives the session whichever event woke us
        app.on_tick(step.elapsed);
        match step.event {
            AppEvent::Key(key) => app.on_key(key),
            AppEvent::Resize | AppEvent::Tick => {}
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }
    info!("exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["rollcall"]);
        assert_eq!(cli.minutes, None);
        assert_eq!(cli.students, None);
        assert_eq!(cli.seed, None);
        assert!(!cli.no_manual_marking);

        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "rollcall",
            "-m",
            "90",
            "-n",
            "30",
            "--warning-secs",
            "15",
            "--mark-interval-ms",
            "500",
            "-o",
            "/tmp/sheets",
            "--no-manual-marking",
        ]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.default_timer_minutes, 90);
        assert_eq!(settings.max_timer_minutes, 90);
        assert_eq!(settings.default_expected_students, 30);
        assert_eq!(settings.warning_threshold_secs, 15);
        assert_eq!(settings.mark_interval(), Duration::from_millis(500));
        assert_eq!(settings.export_dir(), PathBuf::from("/tmp/sheets"));
        assert!(!settings.allow_manual_marking);
    }

    #[test]
    fn test_cli_rejects_zero_minutes() {
        assert!(Cli::try_parse_from(["rollcall", "--minutes", "0"]).is_err());
        assert!(Cli::try_parse_from(["rollcall", "--students", "0"]).is_err());
        assert!(Cli::try_parse_from(["rollcall", "--mark-interval-ms", "0"]).is_err());
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["rollcall", "--config", "/tmp/rollcall.json"]);
        assert_eq!(
            cli.settings_store().path(),
            PathBuf::from("/tmp/rollcall.json").as_path()
        );
    }

    #[test]
    fn test_seeded_factory_varies_per_session() {
        use rollcall::event_source::RosterView;
        use std::collections::BTreeSet;

        let cli = Cli::parse_from(["rollcall", "--seed", "7"]);
        let mut factory = cli.source_factory();
        let marked = BTreeSet::new();
        let roster = RosterView {
            expected: 500,
            marked: &marked,
        };
        let picks = |source: &mut Box<dyn AttendanceEventSource>| {
            (0..5)
                .filter_map(|_| source.next_event(roster).map(|e| e.roll))
                .collect::<Vec<_>>()
        };
        let first = picks(&mut factory());
        let second = picks(&mut factory());
        assert_eq!(first.len(), 5);
        assert_ne!(first, second);

        let mut again = Cli::parse_from(["rollcall", "--seed", "7"]).source_factory();
        assert_eq!(picks(&mut again()), first);
    }
}
