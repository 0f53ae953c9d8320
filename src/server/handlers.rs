//! HTTP request handlers for API endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::state::AppState;
use crate::ingest::seed_many;
use crate::outcome::Difficulty;
use crate::point_in_time::PointInTimeView;
use crate::scenario::{PlayRecord, PlayerChoice};
use crate::store::{ScenarioFilter, StoreError};
use crate::universe::DEFAULT_UNIVERSE;

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}

// -- game ------------------------------------------------------------------

/// Query parameters for the next-scenario endpoint
#[derive(Debug, Deserialize)]
pub struct NextScenarioParams {
    pub difficulty: Option<String>,
    pub sector: Option<String>,
    /// Comma-separated scenario ids the player has already seen
    pub exclude_ids: Option<String>,
}

/// One statement row as shown during the guessing phase
#[derive(Debug, Serialize)]
pub struct StatementSummary {
    pub fiscal_year: i32,
    pub revenue: f64,
    pub gross_margin: Option<f64>,
    pub operating_income: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash_and_equivalents: Option<f64>,
}

impl StatementSummary {
    fn from_view(view: &PointInTimeView) -> Vec<StatementSummary> {
        view.iter()
            .map(|s| StatementSummary {
                fiscal_year: s.fiscal_year,
                revenue: s.revenue,
                gross_margin: s.gross_margin,
                operating_income: s.operating_income,
                ebitda: s.ebitda,
                net_income: s.net_income,
                free_cash_flow: s.free_cash_flow,
                total_debt: s.total_debt,
                cash_and_equivalents: s.cash_and_equivalents,
            })
            .collect()
    }
}

/// Response for the next-scenario endpoint: masked identity and the
/// point-in-time statement window only. Nothing here may derive from data
/// dated after the as-of date.
#[derive(Debug, Serialize)]
pub struct NextScenarioResponse {
    pub scenario_id: i64,
    pub masked_name: String,
    pub sector: String,
    pub industry: Option<String>,
    pub as_of: NaiveDate,
    pub as_of_year: i32,
    pub statements: Vec<StatementSummary>,
    pub narrative: Option<String>,
}

/// GET /game/next - Draw a random playable scenario
pub async fn next_scenario(
    State(state): State<AppState>,
    Query(params): Query<NextScenarioParams>,
) -> Result<Json<NextScenarioResponse>, ApiError> {
    let difficulty = match &params.difficulty {
        Some(s) => Some(Difficulty::parse(s).ok_or_else(|| {
            ApiError::InvalidParameter(format!("Unknown difficulty: {}", s))
        })?),
        None => None,
    };
    let mut exclude_ids = match &params.exclude_ids {
        Some(s) => parse_id_list(s)?,
        None => Vec::new(),
    };

    let store = state.store.lock().await;
    loop {
        let filter = ScenarioFilter {
            difficulty,
            sector: params.sector.clone(),
            exclude_ids: exclude_ids.clone(),
        };
        let playable = store.select_random_playable(&filter)?;
        let scenario = playable.scenario;
        let scenario_id = scenario.id.unwrap_or_default();

        // A scenario whose statement window is too thin at its as-of date is
        // not servable; exclude it and draw again rather than showing a
        // partial window.
        match store.statement_view(scenario.security_id, scenario.as_of, &state.config) {
            Ok(view) => {
                return Ok(Json(NextScenarioResponse {
                    scenario_id,
                    masked_name: playable.masked_name,
                    sector: playable.sector.unwrap_or_else(|| "Unknown".to_string()),
                    industry: playable.industry,
                    as_of: scenario.as_of,
                    as_of_year: scenario.as_of.year(),
                    statements: StatementSummary::from_view(&view),
                    narrative: scenario.narrative,
                }));
            }
            Err(StoreError::InsufficientHistory(_)) => {
                tracing::debug!(scenario_id, "statement window too thin, redrawing");
                exclude_ids.push(scenario_id);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>, ApiError> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| ApiError::InvalidParameter(format!("Invalid scenario id: {}", s)))
        })
        .collect()
}

/// Request body for the reveal endpoint
#[derive(Debug, Deserialize)]
pub struct RevealRequest {
    pub choice: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// One chart point in the reveal response
#[derive(Debug, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Response for the reveal endpoint: the real identity and what the stock
/// actually did.
#[derive(Debug, Serialize)]
pub struct RevealResponse {
    pub symbol: String,
    pub company_name: String,
    pub as_of: NaiveDate,
    pub price_at_as_of: f64,
    pub price_at_24mo: f64,
    pub return_24mo: f64,
    pub outcome_label: String,
    pub player_choice: String,
    pub is_correct: bool,
    pub price_series: Vec<ChartPoint>,
}

/// POST /game/reveal/{scenario_id} - Commit a guess and reveal the outcome
pub async fn reveal(
    State(state): State<AppState>,
    Path(scenario_id): Path<i64>,
    Json(request): Json<RevealRequest>,
) -> Result<Json<RevealResponse>, ApiError> {
    let choice = PlayerChoice::parse(&request.choice)
        .ok_or_else(|| ApiError::InvalidChoice(request.choice.clone()))?;

    let store = state.store.lock().await;
    let record = store.reveal_lookup(scenario_id)?;
    let scenario = record.scenario;
    let is_correct = choice.matches(scenario.label);

    store.record_play(scenario_id, is_correct)?;
    store.log_play(&PlayRecord {
        session_id: request
            .session_id
            .unwrap_or_else(|| "anonymous".to_string()),
        scenario_id,
        choice,
        is_correct,
        played_at: Utc::now(),
    })?;

    let chart_end = scenario.as_of + Duration::days(state.config.horizons.primary);
    let price_series = store
        .price_series(scenario.security_id, scenario.as_of, chart_end)?
        .into_iter()
        .map(|p| ChartPoint {
            date: p.date,
            price: p.adj_close,
        })
        .collect();

    Ok(Json(RevealResponse {
        symbol: record.symbol,
        company_name: record.company_name,
        as_of: scenario.as_of,
        price_at_as_of: scenario.price_at_as_of,
        price_at_24mo: scenario.price_at_24mo,
        return_24mo: scenario.return_24mo,
        outcome_label: scenario.label.as_str().to_string(),
        player_choice: choice.as_str().to_string(),
        is_correct,
        price_series,
    }))
}

// -- admin -----------------------------------------------------------------

/// Request body for the seed endpoint
#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    /// Symbols to seed; empty means the default universe
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub force: bool,
}

/// POST /admin/seed - Seed symbols in the background
pub async fn seed(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> Json<Value> {
    let symbols = if request.symbols.is_empty() {
        DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect()
    } else {
        request.symbols
    };
    let accepted = symbols.len();
    let store = state.store.clone();
    let client = state.client.clone();
    let config = state.config.clone();

    // The seeding path locks the store per database step, so in-flight
    // game requests keep being served while fetches run.
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        match seed_many(&store, &client, &config, &mut rng, &symbols, request.force).await {
            Ok(outcomes) => {
                let seeded = outcomes
                    .iter()
                    .filter(|o| matches!(o.status, crate::ingest::SeedStatus::Seeded { .. }))
                    .count();
                tracing::info!(total = outcomes.len(), seeded, "background seeding finished");
            }
            Err(e) => tracing::error!(error = %e, "background seeding aborted"),
        }
    });

    Json(json!({
        "message": format!("Seeding {} symbols in background", accepted)
    }))
}

/// GET /admin/status - Store counts
pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let store = state.store.lock().await;
    let counts = store.counts()?;
    Ok(Json(json!({
        "securities": counts.securities,
        "scenarios": counts.scenarios,
        "playable_scenarios": counts.playable_scenarios,
    })))
}
