use std::cell::Cell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait TerminalEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                // Windows reports both press and release
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    if tx.send(AppEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(AppEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl TerminalEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// One wake-up of the event loop.
#[derive(Clone, Debug)]
pub struct Step {
    pub event: AppEvent,
    /// Wall-clock time since the previous step.
    pub elapsed: Duration,
}

/// Pulls terminal events, falling back to `Tick` when the ticker interval passes quietly.
pub struct Runner<E: TerminalEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    last: Cell<Instant>,
}

impl<E: TerminalEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            last: Cell::new(Instant::now()),
        }
    }

    /// Blocks up to the tick interval. A disconnected source degrades to ticking.
    pub fn step(&self) -> Step {
        let event = match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        };
        let now = Instant::now();
        let elapsed = now.duration_since(self.last.replace(now));
        Step { event, elapsed }
    }
}

/// Turns arbitrary slices of elapsed time into whole periods.
///
/// Leftover time is carried to the next call, so feeding `300ms` ten times yields exactly
/// three one-second periods.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period: Duration,
    carry: Duration,
}

impl Cadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            carry: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time until the next period completes.
    pub fn until_next(&self) -> Duration {
        self.period - self.carry
    }

    /// Feed elapsed time; returns how many periods completed.
    pub fn feed(&mut self, elapsed: Duration) -> u32 {
        let total = self.carry + elapsed;
        let periods = (total.as_nanos() / self.period.as_nanos()) as u32;
        self.carry = total - self.period * periods;
        periods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        // With no events available, step should yield Tick after the interval
        let step = runner.step();
        match step.event {
            AppEvent::Tick => {}
            _ => panic!("expected Tick on timeout"),
        }
        assert!(step.elapsed >= Duration::from_millis(1));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::Resize).unwrap();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step().event {
            AppEvent::Resize => {}
            _ => panic!("expected Resize event"),
        }
    }

    #[test]
    fn cadence_carries_remainder() {
        let mut cadence = Cadence::new(Duration::from_secs(1));
        let fired: u32 = (0..10)
            .map(|_| cadence.feed(Duration::from_millis(300)))
            .sum();
        assert_eq!(fired, 3);
        assert_eq!(cadence.until_next(), Duration::from_millis(1000));
    }

    #[test]
    fn cadence_counts_multiple_periods() {
        let mut cadence = Cadence::new(Duration::from_secs(2));
        assert_eq!(cadence.feed(Duration::from_millis(6500)), 3);
        assert_eq!(cadence.until_next(), Duration::from_millis(1500));
    }
}
