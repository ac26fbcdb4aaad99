use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};

use trendline_server::{provider::DataApiClient, state::AppState};

/// `trendline health`: liveness probe for container health checks.
///
/// Calls `GET http://localhost:$TRENDLINE_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("TRENDLINE_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

/// `trendline check`: one-day request against the provider with the
/// configured credentials. Exits 0 on success, 1 otherwise.
async fn run_connection_check(state: &AppState) -> ! {
    match state.engine.test_connection().await {
        Ok(rows) => {
            info!(property_id = %state.config.property_id, rows, "connection test passed");
            std::process::exit(0)
        }
        Err(e) => {
            error!(property_id = %state.config.property_id, error = %e, "connection test failed");
            std::process::exit(1)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str());
    if command == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trendline=info".parse()?),
        )
        .json()
        .init();

    let cfg = trendline_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let provider = Arc::new(DataApiClient::from_config(&cfg)?);
    let state = Arc::new(AppState::new(cfg.clone(), provider));

    match command {
        None | Some("serve") => {}
        Some("check") => run_connection_check(&state).await,
        Some(other) => anyhow::bail!("unknown command: {other} (expected serve, health or check)"),
    }

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            state.run_cache_purge_loop(Duration::from_secs(300)).await;
        });
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = trendline_server::app::build_app(Arc::clone(&state));

    info!(
        port = cfg.port,
        property_id = %cfg.property_id,
        timezone = %cfg.timezone,
        "Trendline listening on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
