use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// Fallback CAD-per-USD rate used until a fetch succeeds.
pub const DEFAULT_CAD_RATE: f64 = 1.4;

/// Currency code extracted from the rate document.
pub const RATE_CURRENCY: &str = "CAD";

/// Endpoint serving `{"rates": {"CAD": <number>, ...}}` for a USD base.
pub const RATE_API_URL: &str = "https://open.er-api.com/v6/latest/USD";

/// At most one network fetch per this window; calls inside it reuse the
/// cached success.
const UPDATE_INTERVAL: Duration = Duration::from_secs(600);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, thiserror::Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Http(String),
    #[error("rate response was not valid json")]
    Json,
    #[error("rate document has no usable {0} entry")]
    MissingCurrency(String),
}

/// Extract one currency multiplier from a rate document.
pub fn parse_rate_document(body: &str, code: &str) -> Result<f64, RateError> {
    let doc: serde_json::Value = serde_json::from_str(body).map_err(|_| RateError::Json)?;
    doc.get("rates")
        .and_then(|rates| rates.get(code))
        .and_then(|value| value.as_f64())
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .ok_or_else(|| RateError::MissingCurrency(code.to_string()))
}

/// One blocking GET against the rate endpoint. Non-200 statuses surface as
/// transport errors. Runs on a worker thread in the app; see `main.rs`.
pub fn fetch_rate(endpoint: &str, code: &str) -> Result<f64, RateError> {
    let body = ureq::get(endpoint)
        .timeout(FETCH_TIMEOUT)
        .call()
        .map_err(|err| RateError::Http(err.to_string()))?
        .into_string()
        .map_err(|err| RateError::Http(err.to_string()))?;

    parse_rate_document(&body, code)
}

/// Cached exchange rate with a refresh throttle. A failed fetch never
/// mutates the cache; callers keep displaying the last-known rate.
pub struct CurrencyService {
    cached_rate: f64,
    last_success: Option<Instant>,
    endpoint: String,
    clock: Box<dyn Clock>,
}

impl CurrencyService {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            cached_rate: DEFAULT_CAD_RATE,
            last_success: None,
            endpoint: RATE_API_URL.to_string(),
            clock,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Last cached rate, or the default if nothing was ever fetched.
    pub fn current_rate(&self) -> f64 {
        self.cached_rate
    }

    /// Whether the cache is inside the refresh window.
    pub fn is_fresh(&self) -> bool {
        match self.last_success {
            Some(at) => self.clock.now().duration_since(at) < UPDATE_INTERVAL,
            None => false,
        }
    }

    /// Record a successful fetch. Non-positive rates are discarded.
    pub fn apply_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.cached_rate = rate;
            self.last_success = Some(self.clock.now());
        }
    }

    /// Blocking refresh with the throttle applied: inside the window the
    /// cached success is returned without touching the network.
    pub fn fetch_latest(&mut self) -> Result<f64, RateError> {
        if self.is_fresh() {
            return Ok(self.cached_rate);
        }

        let rate = fetch_rate(&self.endpoint, RATE_CURRENCY)?;
        self.apply_rate(rate);
        Ok(rate)
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CurrencyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyService")
            .field("cached_rate", &self.cached_rate)
            .field("last_success", &self.last_success)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
