use anyhow::{Context, Result};
use forecaster_core::Config;
use forecaster_server::{build_resolver, cors_origin, routes, spawn_retention_sweeper};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    forecaster_core::init()?;

    // Optional first argument: path to a config file.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (config, _validation) = Config::load_validated(config_path.as_deref())?;

    let resolver = Arc::new(build_resolver(&config)?);
    let origin = cors_origin(&config.server.allowed_origin)?;

    let cancel = CancellationToken::new();
    let sweeper = match config.retention.sweep_interval_minutes {
        0 => {
            tracing::warn!("Retention sweep disabled");
            None
        }
        minutes => Some(spawn_retention_sweeper(
            resolver.clone(),
            Duration::from_secs(u64::from(minutes) * 60),
            cancel.clone(),
        )),
    };

    let ip: IpAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address))?;
    let addr = SocketAddr::new(ip, config.server.port);

    let shutdown = cancel.clone();
    let (bound, server) = warp::serve(routes(resolver, &origin))
        .try_bind_with_graceful_shutdown(addr, async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutdown requested"),
                () = shutdown.cancelled() => {}
            }
        })
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Forecaster listening on http://{}", bound);
    server.await;

    cancel.cancel();
    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            tracing::warn!("Retention sweeper ended abnormally: {}", e);
        }
    }

    tracing::info!("Forecaster stopped");
    Ok(())
}
