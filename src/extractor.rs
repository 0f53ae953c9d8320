use crate::price::PricePoint;
use crate::security::CapTier;
use crate::statement::StatementPeriod;
use chrono::{Datelike, Duration, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

/// Scale factor for normalizing raw currency amounts to millions.
const MILLION: f64 = 1_000_000.0;

/// Configuration for the market data client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the upstream data source
    pub base_url: String,
    /// Maximum number of retry attempts after a failed request (default: 3)
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (default: 500ms)
    pub retry_base_delay_ms: u64,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "https://query1.finance.yahoo.com/v8/finance".to_string(),
            max_retries: 3,
            retry_base_delay_ms: 500,
            timeout_seconds: 30,
        }
    }
}

/// Raw company metadata as returned by the upstream source.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProfile {
    #[serde(rename = "longName")]
    pub long_name: Option<String>,
    #[serde(rename = "shortName")]
    pub short_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<i64>,
}

impl RawProfile {
    /// Best available display name, or `None` if the source knows neither.
    pub fn company_name(&self) -> Option<&str> {
        self.long_name
            .as_deref()
            .or(self.short_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    /// Market cap tier from the raw capitalization, defaulting unknown caps
    /// to small.
    pub fn cap_tier(&self) -> CapTier {
        CapTier::from_market_cap(self.market_cap.unwrap_or(0))
    }
}

/// One fiscal year of raw statement line items, in currency units.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFiscalYear {
    #[serde(rename = "periodEnd")]
    pub period_end: NaiveDate,
    #[serde(rename = "totalRevenue")]
    pub total_revenue: Option<f64>,
    #[serde(rename = "grossProfit")]
    pub gross_profit: Option<f64>,
    #[serde(rename = "operatingIncome")]
    pub operating_income: Option<f64>,
    pub ebitda: Option<f64>,
    #[serde(rename = "netIncome")]
    pub net_income: Option<f64>,
    #[serde(rename = "totalAssets")]
    pub total_assets: Option<f64>,
    #[serde(rename = "totalDebt")]
    pub total_debt: Option<f64>,
    #[serde(rename = "cashAndEquivalents")]
    pub cash_and_equivalents: Option<f64>,
    #[serde(rename = "totalEquity")]
    pub total_equity: Option<f64>,
    #[serde(rename = "operatingCashFlow")]
    pub operating_cash_flow: Option<f64>,
    #[serde(rename = "capitalExpenditure")]
    pub capital_expenditure: Option<f64>,
    #[serde(rename = "sharesOutstanding")]
    pub shares_outstanding: Option<f64>,
}

/// HTTP client for the upstream market data source.
///
/// The source is a black box returning company metadata and statement line
/// items as JSON and daily price bars as CSV; this client's job is solely to
/// fetch them and normalize field names and units into the canonical shapes.
/// Transient failures (network errors, rate limiting, server errors) are
/// retried with exponential backoff; exhausting the retries surfaces a
/// `FetchError` that the ingest layer reports as a skipped symbol.
#[derive(Debug)]
pub struct MarketDataClient {
    client: Client,
    config: ClientConfig,
}

impl MarketDataClient {
    /// Creates a client with default configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration.
    pub fn with_config(config: ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| FetchError::ClientCreation(e.to_string()))?;
        Ok(MarketDataClient { client, config })
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches raw company metadata for a symbol.
    pub async fn fetch_profile(&self, symbol: &str) -> Result<RawProfile, FetchError> {
        let url = format!("{}/profile/{}", self.config.base_url, symbol);
        let response = self.get_with_retry(&url).await?;
        response
            .json::<RawProfile>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Fetches daily price bars for a symbol as normalized price points.
    ///
    /// The upstream returns CSV with `Date,Close,Volume` columns where the
    /// close is already split- and dividend-adjusted.
    pub async fn fetch_price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let url = format!(
            "{}/history/{}?start={}&end={}&interval=1d",
            self.config.base_url,
            symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );
        let response = self.get_with_retry(&url).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        parse_price_csv(&body)
    }

    /// Fetches annual statement line items and normalizes them.
    ///
    /// Rows without revenue are dropped; each kept row is stamped with its
    /// availability date (period end + `filing_lag_days`).
    pub async fn fetch_statements(
        &self,
        symbol: &str,
        filing_lag_days: i64,
    ) -> Result<Vec<StatementPeriod>, FetchError> {
        let url = format!("{}/financials/{}?freq=annual", self.config.base_url, symbol);
        let response = self.get_with_retry(&url).await?;
        let raw: Vec<RawFiscalYear> = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(normalize_statements(&raw, filing_lag_days))
    }

    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let mut attempt = 0;
        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    // Rate limiting and server faults are worth retrying;
                    // anything else is a hard failure for this symbol.
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable || attempt >= self.config.max_retries {
                        return Err(FetchError::Status(status.as_u16()));
                    }
                }
                Err(e) => {
                    if attempt >= self.config.max_retries {
                        return Err(FetchError::Network(e.to_string()));
                    }
                }
            }

            let delay = self.config.retry_base_delay_ms * (1 << attempt);
            tracing::warn!(url, attempt, delay_ms = delay, "retrying upstream fetch");
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            attempt += 1;
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceCsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: Option<i64>,
}

/// Parses the upstream price CSV into sorted price points.
///
/// Unparsable rows are skipped with a warning rather than failing the whole
/// series; a single corrupt bar should not discard a decade of history.
pub fn parse_price_csv(body: &str) -> Result<Vec<PricePoint>, FetchError> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut points = Vec::new();
    for record in reader.deserialize::<PriceCsvRow>() {
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparsable price row");
                continue;
            }
        };
        match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(date) => points.push(PricePoint::new(date, row.close, row.volume)),
            Err(e) => {
                tracing::warn!(date = %row.date, error = %e, "skipping price row with bad date");
            }
        }
    }
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Normalizes raw fiscal-year rows into canonical statement periods.
///
/// Monetary amounts are scaled to millions, margins and free cash flow are
/// derived, and each row is stamped with its public availability date. Rows
/// without revenue are dropped. Output is ascending by period end.
pub fn normalize_statements(raw: &[RawFiscalYear], filing_lag_days: i64) -> Vec<StatementPeriod> {
    let mut statements: Vec<StatementPeriod> = raw
        .iter()
        .filter_map(|row| normalize_fiscal_year(row, filing_lag_days))
        .collect();
    statements.sort_by_key(|s| s.period_end);
    statements
}

fn normalize_fiscal_year(raw: &RawFiscalYear, filing_lag_days: i64) -> Option<StatementPeriod> {
    let revenue = raw.total_revenue.filter(|r| *r != 0.0)?;

    let to_millions = |v: Option<f64>| v.map(|x| x / MILLION);
    let margin = |v: Option<f64>| v.map(|x| x / revenue);

    let operating_cash_flow = raw.operating_cash_flow;
    let capital_expenditure = raw.capital_expenditure.map(f64::abs);
    let free_cash_flow = match (operating_cash_flow, capital_expenditure) {
        (Some(ocf), Some(capex)) => Some(ocf - capex),
        _ => None,
    };

    let mut statement = StatementPeriod::new(
        raw.period_end.year(),
        raw.period_end,
        raw.period_end + Duration::days(filing_lag_days),
        revenue / MILLION,
    );
    statement.gross_profit = to_millions(raw.gross_profit);
    statement.operating_income = to_millions(raw.operating_income);
    statement.ebitda = to_millions(raw.ebitda);
    statement.net_income = to_millions(raw.net_income);
    statement.gross_margin = margin(raw.gross_profit);
    statement.operating_margin = margin(raw.operating_income);
    statement.net_margin = margin(raw.net_income);
    statement.total_assets = to_millions(raw.total_assets);
    statement.total_debt = to_millions(raw.total_debt);
    statement.cash_and_equivalents = to_millions(raw.cash_and_equivalents);
    statement.total_equity = to_millions(raw.total_equity);
    statement.operating_cash_flow = to_millions(operating_cash_flow);
    statement.capital_expenditures = to_millions(capital_expenditure);
    statement.free_cash_flow = to_millions(free_cash_flow);
    statement.shares_outstanding = to_millions(raw.shares_outstanding);
    Some(statement)
}

/// Errors produced when fetching or decoding upstream data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// HTTP client creation failed
    ClientCreation(String),
    /// Transport-level failure after exhausting retries
    Network(String),
    /// Upstream returned a non-success status after exhausting retries
    Status(u16),
    /// Response body could not be decoded
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::ClientCreation(msg) => write!(f, "Client creation error: {}", msg),
            FetchError::Network(msg) => write!(f, "Network error: {}", msg),
            FetchError::Status(code) => write!(f, "Upstream returned HTTP {}", code),
            FetchError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}
