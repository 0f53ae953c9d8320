pub mod config;
pub mod security;
pub mod statement;
pub mod price;
pub mod outcome;
pub mod point_in_time;
pub mod scenario;
pub mod generator;
pub mod store;
pub mod extractor;
pub mod masking;
pub mod universe;
pub mod ingest;
pub mod server;


pub use config::{ConfigError, Horizons, PipelineConfig};
pub use security::{CapTier, Security};
pub use statement::StatementPeriod;
pub use price::{price_on_or_after, PricePoint};
pub use outcome::{
    classify_difficulty, classify_outcome, compute_outcome, Difficulty, Outcome, OutcomeLabel,
};
pub use point_in_time::{PointInTimeError, PointInTimeView};
pub use scenario::{PlayRecord, PlayerChoice, Scenario};
pub use generator::{generate_all, generate_scenarios};
pub use store::{
    PlayableScenario, RevealRecord, ScenarioFilter, ScenarioStore, StoreCounts, StoreError,
};
pub use extractor::{ClientConfig, FetchError, MarketDataClient};
pub use ingest::{regenerate_scenarios, seed_many, seed_symbol, SeedOutcome, SeedStatus};
pub use server::{run_server, ApiError, AppState, ServerConfig};
