mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use gincana::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    exercise::{Exercise, SaveOutcome},
    passages::{Passage, PassageSet, DEFAULT_SET},
    ranking,
    runtime::{CrosstermEventSource, FixedTicker, GincanaEvent, Runner},
    store::{open_store, ResultStore, StoreKind},
    GincanaError, ResultRecord, SessionPhase,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::OpenOptions,
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

const READING_SET: &str = "lectura";

/// typing-speed gincana for contact-center agents
#[derive(Parser, Debug, Clone, Default)]
#[clap(
    version,
    about,
    long_about = "A typing-speed gincana for contact-center agents: type a reference text against the clock, optionally read it first and answer comprehension questions, and keep every result for the rankings."
)]
pub struct Cli {
    /// agent identifier; skips the id prompt when given
    #[clap(short = 'a', long)]
    agent: Option<String>,

    /// number of seconds allowed for typing
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// custom reference text to type
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// built-in passage set to draw the reference text from
    #[clap(long)]
    passage_set: Option<String>,

    /// title of the passage to use from the set instead of a random one
    #[clap(long)]
    passage: Option<String>,

    /// seconds of countdown before the exercise starts (0 disables it)
    #[clap(short = 'c', long)]
    countdown: Option<u64>,

    /// add a reading phase before typing and measure reading speed
    #[clap(long)]
    reading: bool,

    /// add the comprehension quiz after typing (implies --reading)
    #[clap(long)]
    quiz: bool,

    /// where results are kept
    #[clap(long, value_enum)]
    store: Option<StoreKind>,

    /// results file (csv or sqlite) to use instead of the default location
    #[clap(long)]
    results: Option<PathBuf>,

    /// only save when asked to on the results screen
    #[clap(long)]
    no_auto_save: bool,

    /// print the typing leaderboard and exit
    #[clap(long)]
    ranking: bool,

    /// print the consolidated FCR leaderboard of these weekly CSV sheets and exit
    #[clap(long, num_args = 1..)]
    fcr: Vec<PathBuf>,

    /// list the built-in passage sets and exit
    #[clap(long)]
    list_sets: bool,

    /// open the configured result store, read it once and exit
    #[clap(long)]
    check_store: bool,

    /// configuration file to read instead of the default one
    #[clap(long)]
    config: Option<PathBuf>,

    /// write the effective settings (file plus flags) back to the configuration file and exit
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags win over the configuration file
    fn apply_to(&self, cfg: &mut Config) {
        if let Some(secs) = self.secs {
            cfg.typing_secs = secs;
        }
        if let Some(ref prompt) = self.prompt {
            cfg.reference_text = Some(prompt.clone());
        }
        if let Some(ref set) = self.passage_set {
            cfg.passage_set = set.clone();
        }
        if let Some(ref title) = self.passage {
            cfg.passage_title = Some(title.clone());
        }
        if let Some(countdown) = self.countdown {
            cfg.countdown_secs = Some(countdown);
        }
        if self.reading {
            cfg.reading = true;
        }
        if self.quiz {
            cfg.reading = true;
            cfg.comprehension = true;
            if self.passage_set.is_none() && cfg.passage_set == DEFAULT_SET {
                cfg.passage_set = READING_SET.to_string();
            }
        }
        if let Some(store) = self.store {
            cfg.store = store;
        }
        if let Some(ref results) = self.results {
            cfg.results_path = Some(results.clone());
        }
        if self.no_auto_save {
            cfg.auto_save = false;
        }
    }

    fn config_store(&self) -> FileConfigStore {
        match self.config {
            Some(ref path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn load_config(&self) -> Config {
        let mut cfg = self.config_store().load();
        self.apply_to(&mut cfg);
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Draw a passage and build the exercise around it
fn fresh_round(config: &Config) -> Result<(Passage, Exercise), GincanaError> {
    let passage = config.passage()?;
    let exercise = Exercise::new(config.session_config(&passage)?)?;
    Ok((passage, exercise))
}

pub struct App {
    pub config: Config,
    pub passage: Passage,
    pub exercise: Exercise,
    pub store: Box<dyn ResultStore>,
    pub id_input: String,
    pub selected_question: usize,
    pub status: Option<String>,
    /// Results of every round finished in this run, oldest first
    pub history: Vec<ResultRecord>,
}

impl App {
    pub fn new(config: Config, store: Box<dyn ResultStore>) -> Result<Self, GincanaError> {
        let (passage, exercise) = fresh_round(&config)?;

        Ok(Self {
            config,
            passage,
            exercise,
            store,
            id_input: String::new(),
            selected_question: 0,
            status: None,
            history: Vec::new(),
        })
    }

    /// Accept the agent id and leave the id prompt
    pub fn submit_agent_id(&mut self) {
        let result = self
            .exercise
            .set_agent_id(&self.id_input)
            .and_then(|_| self.exercise.start());
        match result {
            Ok(_) => self.status = None,
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    /// Global reset: discard the attempt and draw a fresh text
    pub fn reset(&mut self) {
        self.exercise.reset();
        match fresh_round(&self.config) {
            Ok((passage, exercise)) => {
                self.exercise = exercise;
                self.passage = passage;
                self.status = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "keeping previous text after failed reload");
                self.status = Some(e.to_string());
            }
        }
        self.id_input.clear();
        self.selected_question = 0;
    }

    pub fn save(&mut self) {
        self.status = Some(match self.exercise.save(self.store.as_mut()) {
            Ok(SaveOutcome::Saved) => "Result saved".to_string(),
            Ok(SaveOutcome::AlreadySaved) => "Result was already saved".to_string(),
            Err(e) => format!("{e}. Press (s) to retry"),
        });
    }

    fn on_phase_change(&mut self, phase: SessionPhase) {
        match phase {
            SessionPhase::Comprehension => self.selected_question = 0,
            SessionPhase::Results => {
                if let Some(record) = self.exercise.record() {
                    self.history.push(record.clone());
                }
                if self.config.auto_save {
                    self.save();
                }
            }
            _ => {}
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(phase) = self.exercise.tick() {
            self.on_phase_change(phase);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Flow {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => return Flow::Quit,
                KeyCode::Char('r') => {
                    self.reset();
                    return Flow::Continue;
                }
                _ => return Flow::Continue,
            }
        }
        if key.code == KeyCode::Esc {
            return Flow::Quit;
        }

        let before = self.exercise.phase();
        let outcome = match before {
            SessionPhase::IdInput => {
                match key.code {
                    KeyCode::Char(c) => self.id_input.push(c),
                    KeyCode::Backspace => {
                        self.id_input.pop();
                    }
                    KeyCode::Enter => self.submit_agent_id(),
                    _ => {}
                }
                Ok(())
            }
            SessionPhase::Countdown => Ok(()),
            SessionPhase::Reading => match key.code {
                KeyCode::Enter => self.exercise.finish_reading().map(|_| ()),
                _ => Ok(()),
            },
            SessionPhase::Typing => match key.code {
                KeyCode::Char(c) => self.exercise.type_char(c),
                KeyCode::Backspace => self.exercise.backspace(),
                KeyCode::Enter => self.exercise.finish_typing().map(|_| ()),
                _ => Ok(()),
            },
            SessionPhase::Comprehension => self.on_quiz_key(key),
            SessionPhase::Results => match key.code {
                KeyCode::Char('s') => {
                    self.save();
                    Ok(())
                }
                KeyCode::Char('n') => {
                    self.reset();
                    Ok(())
                }
                KeyCode::Char('q') => return Flow::Quit,
                _ => Ok(()),
            },
        };

        // Keys that arrive after the typing deadline are expected to bounce
        if let Err(e) = outcome {
            if !matches!(e, GincanaError::WrongPhase { .. }) {
                self.status = Some(e.to_string());
            }
        }

        let after = self.exercise.phase();
        if after != before {
            self.on_phase_change(after);
        }
        Flow::Continue
    }

    fn on_quiz_key(&mut self, key: KeyEvent) -> Result<(), GincanaError> {
        let questions = self.exercise.quiz().map(|q| q.len()).unwrap_or(0);
        match key.code {
            KeyCode::Up => {
                self.selected_question = self.selected_question.saturating_sub(1);
                Ok(())
            }
            KeyCode::Down | KeyCode::Tab => {
                if self.selected_question + 1 < questions {
                    self.selected_question += 1;
                }
                Ok(())
            }
            KeyCode::Char(c) => match c.to_digit(10) {
                Some(n) if n > 0 => {
                    self.exercise
                        .select_answer(self.selected_question, n as usize - 1)?;
                    if self.selected_question + 1 < questions {
                        self.selected_question += 1;
                    }
                    Ok(())
                }
                _ => Ok(()),
            },
            KeyCode::Enter => self.exercise.submit_answers().map(|_| ()),
            _ => Ok(()),
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("GINCANA_LOG").unwrap_or_else(|_| "gincana=info".into());
    let log_path = AppDirs::log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // The TUI owns the terminal, so events go to a file
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .init(),
    }
}

fn print_ranking(cfg: &Config) -> Result<(), GincanaError> {
    let store = open_store(cfg.store, cfg.results_path.as_deref())?;
    let board = ranking::leaderboard(&store.read_all()?);

    if board.is_empty() {
        println!("No results yet.");
        return Ok(());
    }

    println!(
        "{:>3}  {:<24} {:>8} {:>8} {:>8} {:>8}  {}",
        "#", "agent", "best", "acc", "avg", "attempts", "last"
    );
    for (idx, entry) in board.iter().enumerate() {
        println!(
            "{:>3}  {:<24} {:>8.2} {:>7.2}% {:>8.2} {:>8}  {}",
            idx + 1,
            entry.agent_id,
            entry.best_wpm,
            entry.accuracy,
            entry.average_wpm,
            entry.attempts,
            entry.last_attempt.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

/// Reach the result store the way a session would, without writing to it
fn check_store(cfg: &Config) -> Result<usize, GincanaError> {
    let store = open_store(cfg.store, cfg.results_path.as_deref())?;
    let records = store.read_all()?;

    println!("{} store ok: {} result(s)", cfg.store, records.len());
    if let Some(last) = records.last() {
        println!(
            "last: {} {} {:.2} wpm",
            last.timestamp.format("%Y-%m-%d %H:%M:%S"),
            last.agent_id,
            last.wpm
        );
    }
    tracing::info!(kind = %cfg.store, results = records.len(), "store check passed");
    Ok(records.len())
}

fn print_fcr(paths: &[PathBuf]) -> Result<(), GincanaError> {
    let sheets = paths
        .iter()
        .map(ranking::read_fcr_sheet)
        .collect::<Result<Vec<_>, _>>()?;
    let board = ranking::consolidate_fcr(&sheets);

    println!(
        "{:>3}  {:<28} {:>10} {:>10} {:>7}",
        "#", "employee", "positives", "% FCR", "weeks"
    );
    for (idx, entry) in board.iter().enumerate() {
        println!(
            "{:>3}  {:<28} {:>10} {:>9.2}% {:>7}",
            idx + 1,
            entry.employee,
            entry.positives,
            entry.positive_pct,
            entry.weeks
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let cfg = cli.load_config();

    if cli.save_config {
        let store = cli.config_store();
        store.save(&cfg)?;
        println!("{}", store.path().display());
        return Ok(());
    }
    if cli.list_sets {
        for name in PassageSet::available() {
            println!("{name}");
        }
        return Ok(());
    }
    if cli.check_store {
        check_store(&cfg)?;
        return Ok(());
    }
    if !cli.fcr.is_empty() {
        print_fcr(&cli.fcr)?;
        return Ok(());
    }
    if cli.ranking {
        print_ranking(&cfg)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    // Refuse to start before touching the terminal if the text is unavailable
    let store = open_store(cfg.store, cfg.results_path.as_deref())?;
    let mut app = match App::new(cfg, store) {
        Ok(app) => app,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };
    if let Some(ref agent) = cli.agent {
        app.id_input = agent.clone();
        app.submit_agent_id();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    terminal.draw(|f| ui::draw(app, f))?;
    loop {
        let flow = match runner.step() {
            GincanaEvent::Tick => {
                app.on_tick();
                Flow::Continue
            }
            GincanaEvent::Resize => Flow::Continue,
            GincanaEvent::Key(key) => app.on_key(key),
        };

        if flow == Flow::Quit {
            break;
        }
        terminal.draw(|f| ui::draw(app, f))?;
    }

    Ok(())
}
