//! Serves live training streams.
//!
//! Creates one demo session per algorithm that fits the chosen environment,
//! prints their stream URLs and serves them until interrupted. Connect with
//! any WebSocket client and send `START` / `STOP`.
//!
//! ```text
//! cargo run --example live_server -- 127.0.0.1:8765 frozenlake
//! ```

use std::sync::Arc;

use tabula::env::create_environment;
use tabula::telemetry::init_tracing;
use tabula::transport::websocket::{PATH_PREFIX, serve};
use tabula::{AlgorithmKind, EnvironmentKind, ServiceConfig, SessionRegistry, TrainingConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = ServiceConfig::from_env()?;
    init_tracing(&service.log_level)?;

    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:8765".to_string());
    let environment: EnvironmentKind = match args.next() {
        Some(name) => serde_json::from_value(serde_json::Value::String(name))?,
        None => EnvironmentKind::GridWorld,
    };

    let registry = Arc::new(SessionRegistry::new(service));
    let model_based = create_environment(environment, &Default::default(), 0)?.is_model_based();
    for algorithm in AlgorithmKind::ALL {
        if algorithm.requires_model() && !model_based {
            continue;
        }
        let mut config = TrainingConfig::new(environment, algorithm);
        config.n_episodes = if algorithm.requires_model() { 200 } else { 500 };
        config.step_delay_ms = 50;
        let id = registry.create(config)?;
        info!(%algorithm, url = %format!("ws://{addr}{PATH_PREFIX}{id}"), "session ready");
    }

    let listener = TcpListener::bind(&addr).await?;
    tokio::select! {
        result = serve(listener, Arc::clone(&registry)) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    for id in registry.ids() {
        registry.delete(id).await?;
    }
    Ok(())
}
