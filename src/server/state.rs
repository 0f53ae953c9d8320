//! Shared application state for the API server

use crate::config::PipelineConfig;
use crate::extractor::MarketDataClient;
use crate::store::ScenarioStore;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Scenario store. Wrapped in a Mutex because SQLite connections are
    /// not thread-safe.
    pub store: Arc<Mutex<ScenarioStore>>,
    /// Upstream market data client, used by background seeding
    pub client: Arc<MarketDataClient>,
    /// Pipeline policy shared by every handler
    pub config: PipelineConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(store: ScenarioStore, client: MarketDataClient, config: PipelineConfig) -> Self {
        AppState {
            store: Arc::new(Mutex::new(store)),
            client: Arc::new(client),
            config,
        }
    }
}
