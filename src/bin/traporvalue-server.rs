//! Trap-or-Value API Server Binary
//!
//! Run with: `cargo run --bin traporvalue-server`

use traporvalue::{run_server, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Note: Tracing is initialized in run_server()
    // Set RUST_LOG environment variable to control log level:
    //   RUST_LOG=debug cargo run --bin traporvalue-server

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .unwrap_or(3000);
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "scenarios.db".to_string());

    let config = ServerConfig::new(host, port, database_path);

    println!("Starting Trap-or-Value API Server...");
    println!("   Host: {}", config.host);
    println!("   Port: {}", config.port);
    println!("   Database: {}", config.database_path);
    println!();
    println!("Available endpoints:");
    println!("  GET  /health                    - Health check");
    println!("  GET  /game/next                 - Draw a playable scenario");
    println!("  POST /game/reveal/:id           - Commit a guess and reveal");
    println!("  POST /admin/seed                - Seed symbols in background");
    println!("  GET  /admin/status              - Store counts");
    println!();

    run_server(config).await?;

    Ok(())
}
