pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod currency;
pub mod payout;
pub mod runtime;
pub mod timer;
pub mod ui;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    currency::{CurrencyService, RATE_CURRENCY},
    payout::{next_payout_id, FilePayoutStore, PayoutRecord, PayoutStore},
    runtime::AppEvent,
    timer::{Currency, EarningsTimer},
    ui::ui,
};
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

const TICK_RATE_MS: u64 = 16;

// UI redraws while running are throttled well below the tick rate
const UI_REFRESH_MS: u64 = 66;

/// earnings stopwatch tui with live currency conversion and payout history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "An earnings stopwatch for the terminal: run the clock against an hourly rate, watch the money accrue in USD or CAD, and bank finished sessions as payout records."
)]
pub struct Cli {
    /// hourly pay rate in USD
    #[clap(short = 'r', long)]
    rate: Option<f64>,

    /// display currency at startup
    #[clap(short = 'c', long, value_enum)]
    currency: Option<DisplayCurrency>,

    /// override the payout history file location
    #[clap(long)]
    payouts_file: Option<PathBuf>,

    /// override the config file location
    #[clap(long)]
    config_file: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum DisplayCurrency {
    Usd,
    Cad,
}

impl DisplayCurrency {
    fn as_currency(&self) -> Currency {
        match self {
            DisplayCurrency::Usd => Currency::Usd,
            DisplayCurrency::Cad => Currency::Cad,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Stopwatch,
    RateInput,
}

#[derive(Debug)]
pub struct App {
    pub timer: EarningsTimer,
    pub service: CurrencyService,
    pub payouts: Vec<PayoutRecord>,
    pub payout_store: FilePayoutStore,
    pub config_store: FileConfigStore,
    pub state: AppState,
    pub show_history: bool,
    pub selected_payout: usize,
    pub rate_input: String,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let config_store = match &cli.config_file {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let config = config_store.load();

        let rate = cli
            .rate
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(config.hourly_rate);
        let mut timer = EarningsTimer::new(rate);

        let currency = cli.currency.map(|c| c.as_currency()).unwrap_or_else(|| {
            if config.currency.eq_ignore_ascii_case("cad") {
                Currency::Cad
            } else {
                Currency::Usd
            }
        });
        if currency == Currency::Cad {
            timer.toggle_currency();
        }

        let payout_store = match &cli.payouts_file {
            Some(path) => FilePayoutStore::with_path(path),
            None => FilePayoutStore::new(),
        };
        let payouts = payout_store.load();

        Self {
            timer,
            service: CurrencyService::new(),
            payouts,
            payout_store,
            config_store,
            state: AppState::Stopwatch,
            show_history: false,
            selected_payout: 0,
            rate_input: String::new(),
        }
    }

    pub fn toggle_timer(&mut self) {
        if self.timer.is_running() {
            self.timer.stop();
        } else {
            self.timer.start();
        }
    }

    /// Flip the display currency. Switching to CAD refreshes the exchange
    /// rate in the background when the cache is outside its window; the
    /// display keeps using the cached rate until the fetch lands.
    pub fn toggle_currency(&mut self, tx: &mpsc::Sender<AppEvent>) {
        let currency = self.timer.toggle_currency();
        if currency == Currency::Cad {
            self.timer.set_exchange_rate(self.service.current_rate());
            if !self.service.is_fresh() {
                spawn_rate_fetch(self.service.endpoint().to_string(), tx.clone());
            }
        }
    }

    /// Bank the current total as a payout record (always USD) and reset
    /// the clock. No-op while there is nothing earned.
    pub fn commit_payout(&mut self) {
        let amount = self.timer.total_earnings();
        if amount <= 0.0 {
            return;
        }

        let record = PayoutRecord::new(next_payout_id(&self.payouts), amount, Local::now());
        self.payouts.insert(0, record);
        let _ = self.payout_store.save(&self.payouts);

        self.timer.reset();
        self.selected_payout = 0;
        self.show_history = true;
    }

    pub fn delete_selected_payout(&mut self) {
        if !self.show_history || self.payouts.is_empty() {
            return;
        }

        let idx = self.selected_payout.min(self.payouts.len() - 1);
        self.payouts.remove(idx);
        if self.selected_payout > 0 && self.selected_payout >= self.payouts.len() {
            self.selected_payout -= 1;
        }
        let _ = self.payout_store.save(&self.payouts);
    }

    pub fn select_previous(&mut self) {
        if self.show_history {
            self.selected_payout = self.selected_payout.saturating_sub(1);
        }
    }

    pub fn select_next(&mut self) {
        if self.show_history
            && !self.payouts.is_empty()
            && self.selected_payout < self.payouts.len() - 1
        {
            self.selected_payout += 1;
        }
    }

    pub fn open_rate_input(&mut self) {
        self.rate_input = format!("{:.2}", self.timer.hourly_rate());
        self.state = AppState::RateInput;
    }

    pub fn apply_rate_input(&mut self) {
        if let Ok(rate) = self.rate_input.trim().parse::<f64>() {
            if self.timer.set_hourly_rate(rate) {
                let _ = self.config_store.save(&Config {
                    hourly_rate: rate,
                    currency: self.timer.currency().to_string().to_lowercase(),
                });
            }
        }
        // Anything unparsable or non-positive refuses the change
        self.rate_input.clear();
        self.state = AppState::Stopwatch;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    res
}

#[derive(Debug, PartialEq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let (tx, rx) = get_app_events();
    let mut last_redraw = Instant::now();

    terminal.draw(|f| ui(app, f))?;

    loop {
        match rx.recv()? {
            AppEvent::Tick => {
                if app.timer.is_running() {
                    app.timer.on_tick();

                    if last_redraw.elapsed() >= Duration::from_millis(UI_REFRESH_MS) {
                        terminal.draw(|f| ui(app, f))?;
                        last_redraw = Instant::now();
                    }
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Rate(result) => {
                // Failures keep the last-known rate on screen
                if let Ok(rate) = result {
                    app.service.apply_rate(rate);
                    app.timer.set_exchange_rate(app.service.current_rate());
                }
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Key(key) => {
                if handle_key(app, key, &tx) == KeyOutcome::Quit {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
                last_redraw = Instant::now();
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, tx: &mpsc::Sender<AppEvent>) -> KeyOutcome {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }

    match app.state {
        AppState::RateInput => match key.code {
            KeyCode::Esc => {
                app.rate_input.clear();
                app.state = AppState::Stopwatch;
            }
            KeyCode::Enter => {
                app.apply_rate_input();
            }
            KeyCode::Backspace => {
                app.rate_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                app.rate_input.push(c);
            }
            _ => {}
        },
        AppState::Stopwatch => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return KeyOutcome::Quit,
            KeyCode::Char(' ') => app.toggle_timer(),
            KeyCode::Char('r') => app.timer.reset(),
            KeyCode::Char('p') => app.commit_payout(),
            KeyCode::Char('h') => app.show_history = !app.show_history,
            KeyCode::Char('c') => app.toggle_currency(tx),
            KeyCode::Char('$') => {
                // The rate editor is only reachable while paused
                if !app.timer.is_running() {
                    app.open_rate_input();
                }
            }
            KeyCode::Up => app.select_previous(),
            KeyCode::Down => app.select_next(),
            KeyCode::Char('d') | KeyCode::Delete => app.delete_selected_payout(),
            _ => {}
        },
    }

    KeyOutcome::Continue
}

fn get_app_events() -> (mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
    let (tx, rx) = mpsc::channel();

    let tick_tx = tx.clone();
    thread::spawn(move || loop {
        if tick_tx.send(AppEvent::Tick).is_err() {
            break;
        }

        thread::sleep(Duration::from_millis(TICK_RATE_MS))
    });

    let key_tx = tx.clone();
    thread::spawn(move || loop {
        let evt = match event::read() {
            Ok(Event::Key(key)) => Some(AppEvent::Key(key)),
            Ok(Event::Resize(_, _)) => Some(AppEvent::Resize),
            Ok(_) => None,
            Err(_) => break,
        };

        if let Some(evt) = evt {
            if key_tx.send(evt).is_err() {
                break;
            }
        }
    });

    (tx, rx)
}

fn spawn_rate_fetch(endpoint: String, tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        let result = currency::fetch_rate(&endpoint, RATE_CURRENCY);
        let _ = tx.send(AppEvent::Rate(result));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_cli(dir: &tempfile::TempDir) -> Cli {
        Cli {
            rate: Some(36.0),
            currency: None,
            payouts_file: Some(dir.path().join("payouts.json")),
            config_file: Some(dir.path().join("config.json")),
        }
    }

    fn test_app() -> (App, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let cli = test_cli(&dir);
        (App::new(cli), dir)
    }

    #[test]
    fn cli_rate_overrides_config() {
        let (app, _dir) = test_app();
        assert!((app.timer.hourly_rate() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_cli_rate_is_ignored() {
        let dir = tempdir().unwrap();
        let cli = Cli {
            rate: Some(-1.0),
            ..test_cli(&dir)
        };
        let app = App::new(cli);
        assert!((app.timer.hourly_rate() - timer::DEFAULT_HOURLY_RATE).abs() < 1e-9);
    }

    #[test]
    fn cli_currency_selects_cad_display() {
        let dir = tempdir().unwrap();
        let cli = Cli {
            currency: Some(DisplayCurrency::Cad),
            ..test_cli(&dir)
        };
        let app = App::new(cli);
        assert_eq!(app.timer.currency(), Currency::Cad);
    }

    #[test]
    fn saved_rate_survives_restart() {
        let dir = tempdir().unwrap();
        let mut app = App::new(test_cli(&dir));
        app.open_rate_input();
        app.rate_input = "52.5".to_string();
        app.apply_rate_input();

        let cli = Cli {
            rate: None,
            ..test_cli(&dir)
        };
        let reopened = App::new(cli);
        assert!((reopened.timer.hourly_rate() - 52.5).abs() < 1e-9);
    }

    #[test]
    fn commit_payout_with_no_earnings_is_a_noop() {
        let (mut app, _dir) = test_app();
        app.commit_payout();
        assert!(app.payouts.is_empty());
        assert!(!app.show_history);
    }

    #[test]
    fn delete_ignores_hidden_history() {
        let (mut app, _dir) = test_app();
        app.payouts.push(PayoutRecord::new(1, 1.0, Local::now()));
        app.delete_selected_payout();
        assert_eq!(app.payouts.len(), 1);

        app.show_history = true;
        app.delete_selected_payout();
        assert!(app.payouts.is_empty());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let (mut app, _dir) = test_app();
        app.show_history = true;
        app.payouts = vec![
            PayoutRecord::new(2, 2.0, Local::now()),
            PayoutRecord::new(1, 1.0, Local::now()),
        ];

        app.select_next();
        assert_eq!(app.selected_payout, 1);
        app.select_next();
        assert_eq!(app.selected_payout, 1);

        app.delete_selected_payout();
        assert_eq!(app.selected_payout, 0);

        app.select_previous();
        assert_eq!(app.selected_payout, 0);
    }

    #[test]
    fn rate_input_applies_and_persists_valid_rates() {
        let (mut app, _dir) = test_app();
        app.open_rate_input();
        assert_eq!(app.state, AppState::RateInput);
        assert_eq!(app.rate_input, "36.00");

        app.rate_input = "52.5".to_string();
        app.apply_rate_input();
        assert_eq!(app.state, AppState::Stopwatch);
        assert!((app.timer.hourly_rate() - 52.5).abs() < 1e-9);
    }

    #[test]
    fn rate_input_refuses_garbage() {
        let (mut app, _dir) = test_app();
        app.open_rate_input();

        app.rate_input = "0".to_string();
        app.apply_rate_input();
        assert!((app.timer.hourly_rate() - 36.0).abs() < 1e-9);

        app.open_rate_input();
        app.rate_input = "12.3.4".to_string();
        app.apply_rate_input();
        assert!((app.timer.hourly_rate() - 36.0).abs() < 1e-9);
    }
}
