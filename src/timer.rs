use std::fmt;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_HOURLY_RATE: f64 = 40.0;

const SECS_PER_HOUR: f64 = 3600.0;

/// Display currency. Amounts are always tracked and persisted in USD;
/// CAD is a display-time conversion through the cached exchange rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Cad,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "USD$",
            Currency::Cad => "CAD$",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Currency::Usd => Currency::Cad,
            Currency::Cad => Currency::Usd,
        }
    }
}

/// Stopwatch that converts running time into earnings at an hourly rate.
///
/// Earnings accrue in rate periods: a maximal stretch of elapsed time over
/// which the hourly rate is constant. Stopping or changing the rate settles
/// the open period into `accumulated`, so the total is continuous across
/// pauses and rate changes. All amounts are USD.
pub struct EarningsTimer {
    elapsed: f64,
    running: bool,
    started_at: Option<Instant>,
    hourly_rate: f64,
    accumulated: f64,
    last_rate_change: f64,
    currency: Currency,
    exchange_rate: f64,
    clock: Box<dyn Clock>,
}

impl EarningsTimer {
    pub fn new(hourly_rate: f64) -> Self {
        Self::with_clock(hourly_rate, Box::new(SystemClock))
    }

    pub fn with_clock(hourly_rate: f64, clock: Box<dyn Clock>) -> Self {
        let hourly_rate = if hourly_rate.is_finite() && hourly_rate > 0.0 {
            hourly_rate
        } else {
            DEFAULT_HOURLY_RATE
        };

        Self {
            elapsed: 0.0,
            running: false,
            started_at: None,
            hourly_rate,
            accumulated: 0.0,
            last_rate_change: 0.0,
            currency: Currency::Usd,
            exchange_rate: crate::currency::DEFAULT_CAD_RATE,
            clock,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn hourly_rate(&self) -> f64 {
        self.hourly_rate
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }

        // A fresh rate period opens where the last one closed
        self.last_rate_change = self.elapsed;
        self.started_at = Some(self.clock.now());
        self.running = true;
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        self.sync();
        self.settle();
        self.started_at = None;
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.stop();
        self.elapsed = 0.0;
        self.accumulated = 0.0;
        self.last_rate_change = 0.0;
    }

    /// Change the hourly rate, settling the open period at the old rate
    /// first so the total stays continuous. Callable whether running or
    /// stopped. Non-positive or non-finite rates are rejected with no
    /// state change.
    pub fn set_hourly_rate(&mut self, rate: f64) -> bool {
        if !rate.is_finite() || rate <= 0.0 {
            return false;
        }

        if self.running {
            self.sync();
        }
        self.settle();
        self.hourly_rate = rate;
        true
    }

    /// Total earnings in USD: settled periods plus the open one.
    pub fn total_earnings(&mut self) -> f64 {
        if self.running {
            self.sync();
            self.accumulated + self.period_earnings()
        } else {
            self.accumulated
        }
    }

    pub fn toggle_currency(&mut self) -> Currency {
        self.currency = self.currency.other();
        self.currency
    }

    pub fn set_exchange_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.exchange_rate = rate;
        }
    }

    /// Tick handler: folds real time into `elapsed` while running.
    pub fn on_tick(&mut self) {
        if self.running {
            self.sync();
        }
    }

    pub fn elapsed_seconds(&mut self) -> f64 {
        if self.running {
            self.sync();
        }
        self.elapsed
    }

    pub fn display_time(&mut self) -> String {
        format_interval(self.elapsed_seconds())
    }

    pub fn display_earnings(&mut self) -> String {
        let total = self.total_earnings();
        let amount = match self.currency {
            Currency::Usd => total,
            Currency::Cad => total * self.exchange_rate,
        };
        format!("{}{:.2}", self.currency.symbol(), amount)
    }

    fn sync(&mut self) {
        if let Some(started_at) = self.started_at {
            let now = self.clock.now();
            self.elapsed += now.duration_since(started_at).as_secs_f64();
            self.started_at = Some(now);
        }
    }

    fn settle(&mut self) {
        self.accumulated += self.period_earnings();
        self.last_rate_change = self.elapsed;
    }

    fn period_earnings(&self) -> f64 {
        self.hourly_rate * (self.elapsed - self.last_rate_change) / SECS_PER_HOUR
    }
}

impl Default for EarningsTimer {
    fn default() -> Self {
        Self::new(DEFAULT_HOURLY_RATE)
    }
}

impl fmt::Debug for EarningsTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EarningsTimer")
            .field("elapsed", &self.elapsed)
            .field("running", &self.running)
            .field("hourly_rate", &self.hourly_rate)
            .field("accumulated", &self.accumulated)
            .field("last_rate_change", &self.last_rate_change)
            .field("currency", &self.currency)
            .field("exchange_rate", &self.exchange_rate)
            .finish()
    }
}

/// Stopwatch display: hours unpadded, minutes/seconds/hundredths zero-padded,
/// sub-hundredth remainder truncated.
pub fn format_interval(interval: f64) -> String {
    let total_seconds = interval as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let hundredths = ((interval - interval.floor()) * 100.0) as u64;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, hundredths)
}
