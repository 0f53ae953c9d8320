//! REST API server for the game and admin surfaces

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use state::AppState;

use crate::config::PipelineConfig;
use crate::extractor::MarketDataClient;
use crate::store::ScenarioStore;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: "127.0.0.1")
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// Path to SQLite database
    pub database_path: String,
    /// Pipeline policy constants
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_path: "scenarios.db".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration
    pub fn new(host: impl Into<String>, port: u16, database_path: impl Into<String>) -> Self {
        ServerConfig {
            host: host.into(),
            port,
            database_path: database_path.into(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Runs the API server
///
/// # Arguments
/// * `config` - Server configuration
///
/// # Returns
/// Returns an error if the pipeline policy is invalid or the server fails
/// to start
///
/// # Example
/// ```rust,no_run
/// use traporvalue::server::{run_server, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     run_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    config.pipeline.validate()?;

    let store = ScenarioStore::open(&config.database_path)?;
    let client = MarketDataClient::new()?;
    let state = AppState::new(store, client, config.pipeline.clone());

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
