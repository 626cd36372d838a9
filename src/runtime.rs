use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Upper bound on how long a countdown or typing deadline can go unnoticed.
/// The phase that follows an expiry starts at the tick that observes it.
pub const TICK_RATE_MS: u64 = 100;

/// Input to the session loop. `Tick` carries no data: the app answers it
/// with `Exercise::tick`, which reads the clock itself.
#[derive(Clone, Debug)]
pub enum GincanaEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Anything that can feed `GincanaEvent`s to the runner
pub trait GincanaEventSource: Send + 'static {
    /// Wait at most `timeout` for the next event
    fn recv_timeout(&self, timeout: Duration) -> Result<GincanaEvent, RecvTimeoutError>;
}

/// Reads the real terminal on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<GincanaEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Windows reports releases too; only presses drive the session
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(GincanaEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(GincanaEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
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

impl GincanaEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GincanaEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Interval at which session timers are re-evaluated when no key arrives
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_RATE_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Feeds scripted key presses to a session, e.g. a headless agent run
pub struct ChannelEventSource {
    rx: Receiver<GincanaEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<GincanaEvent>) -> Self {
        Self { rx }
    }
}

impl GincanaEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GincanaEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Pulls one event per call for the session loop. Keys are returned as soon
/// as they arrive; otherwise a `Tick` comes back after one ticker interval.
pub struct Runner<E: GincanaEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GincanaEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// A closed source keeps ticking so running timers still expire
    pub fn step(&self) -> GincanaEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                GincanaEvent::Tick
            }
        }
    }
}
