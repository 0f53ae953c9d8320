use crate::config::PipelineConfig;
use crate::extractor::MarketDataClient;
use crate::generator::{generate_all, generate_scenarios};
use crate::masking::masked_name;
use crate::security::Security;
use crate::store::{ScenarioStore, StoreError};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use std::fmt;
use tokio::sync::Mutex;

/// How seeding one symbol ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    /// Data ingested and scenarios generated
    Seeded { scenarios: usize, playable: usize },
    /// Symbol already present and `force` was not set
    AlreadyPresent,
    /// Symbol skipped; other symbols continue
    Skipped(String),
}

/// Per-symbol seeding report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub symbol: String,
    pub status: SeedStatus,
}

impl fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            SeedStatus::Seeded {
                scenarios,
                playable,
            } => write!(
                f,
                "{}: seeded {} scenarios ({} playable)",
                self.symbol, scenarios, playable
            ),
            SeedStatus::AlreadyPresent => write!(f, "{}: already present", self.symbol),
            SeedStatus::Skipped(reason) => write!(f, "{}: skipped ({})", self.symbol, reason),
        }
    }
}

/// Years of price history requested from the upstream source.
const PRICE_HISTORY_YEARS: i32 = 10;

/// Ingests one symbol end to end: profile, prices, statements, scenarios.
///
/// Upstream failures and thin data skip the symbol with a reason instead of
/// failing the batch; only store-level failures propagate as errors. The
/// whole flow is idempotent: securities upsert on symbol, prices append on
/// (security, date), statements upsert per (security, fiscal_year), and
/// scenarios insert-or-ignore on (security, as-of).
///
/// The store mutex is taken per database step and released before every
/// upstream fetch, so request handlers on the same store keep serving while
/// a long seeding batch waits on the network.
pub async fn seed_symbol<R: Rng>(
    store: &Mutex<ScenarioStore>,
    client: &MarketDataClient,
    config: &PipelineConfig,
    rng: &mut R,
    symbol: &str,
    force: bool,
) -> Result<SeedOutcome, StoreError> {
    let symbol = symbol.to_uppercase();

    if !force && store.lock().await.security_by_symbol(&symbol)?.is_some() {
        return Ok(SeedOutcome {
            symbol,
            status: SeedStatus::AlreadyPresent,
        });
    }

    let profile = match client.fetch_profile(&symbol).await {
        Ok(profile) => profile,
        Err(e) => return Ok(skipped(symbol, format!("profile fetch failed: {}", e))),
    };
    let company_name = match profile.company_name() {
        Some(name) => name.to_string(),
        None => return Ok(skipped(symbol, "company not found upstream".to_string())),
    };

    let security_id = {
        let store = store.lock().await;
        let used_names = store.masked_names()?;
        let masked = masked_name(rng, profile.sector.as_deref(), &used_names);
        let security = Security::new(
            symbol.clone(),
            company_name,
            masked,
            profile.sector.clone(),
            profile.industry.clone(),
            profile.cap_tier(),
        );
        store.upsert_security(&security)?
    };

    let today = Utc::now().date_naive();
    let start = NaiveDate::from_ymd_opt(today.year() - PRICE_HISTORY_YEARS, 1, 1)
        .unwrap_or(today - Duration::days(365 * PRICE_HISTORY_YEARS as i64));
    let prices = match client.fetch_price_history(&symbol, start, today).await {
        Ok(prices) => prices,
        Err(e) => return Ok(skipped(symbol, format!("price fetch failed: {}", e))),
    };
    if prices.is_empty() {
        return Ok(skipped(symbol, "no price history".to_string()));
    }
    store.lock().await.append_price_points(security_id, &prices)?;

    match client.fetch_statements(&symbol, config.filing_lag_days).await {
        Ok(statements) => store
            .lock()
            .await
            .replace_statements(security_id, &statements)?,
        Err(e) => return Ok(skipped(symbol, format!("statement fetch failed: {}", e))),
    }

    let scenarios = generate_scenarios(security_id, &prices, config);
    let playable = scenarios.iter().filter(|s| s.label.is_playable()).count();
    store.lock().await.upsert_scenarios(&scenarios)?;

    tracing::info!(
        symbol = %symbol,
        scenarios = scenarios.len(),
        playable,
        "seeded symbol"
    );
    Ok(SeedOutcome {
        symbol,
        status: SeedStatus::Seeded {
            scenarios: scenarios.len(),
            playable,
        },
    })
}

fn skipped(symbol: String, reason: String) -> SeedOutcome {
    tracing::warn!(symbol = %symbol, reason = %reason, "skipping symbol");
    SeedOutcome {
        symbol,
        status: SeedStatus::Skipped(reason),
    }
}

/// Seeds a list of symbols, continuing past per-symbol skips.
pub async fn seed_many<R: Rng>(
    store: &Mutex<ScenarioStore>,
    client: &MarketDataClient,
    config: &PipelineConfig,
    rng: &mut R,
    symbols: &[String],
    force: bool,
) -> Result<Vec<SeedOutcome>, StoreError> {
    let mut outcomes = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let outcome = seed_symbol(store, client, config, rng, symbol, force).await?;
        tracing::info!("{}", outcome);
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Regenerates scenarios for every security with price history.
///
/// Generation fans out across the rayon pool; the store dedupes on
/// (security, as-of), so this is safe to re-run after every price refresh.
///
/// # Returns
/// The number of newly inserted scenarios.
pub fn regenerate_scenarios(
    store: &mut ScenarioStore,
    config: &PipelineConfig,
) -> Result<usize, StoreError> {
    let ids = store.security_ids_with_prices()?;
    let mut batches = Vec::with_capacity(ids.len());
    for id in ids {
        batches.push((id, store.price_history(id)?));
    }

    let scenarios = generate_all(&batches, config);
    let inserted = store.upsert_scenarios(&scenarios)?;
    tracing::info!(
        securities = batches.len(),
        generated = scenarios.len(),
        inserted,
        "regenerated scenarios"
    );
    Ok(inserted)
}
