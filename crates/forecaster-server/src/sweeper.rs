//! Background retention sweep.

use chrono::Utc;
use forecaster_weather::{ForecastResolver, Geocoder, LocationStore, WeatherProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run `sweep_expired` every `period` until `cancel` fires.
///
/// The first sweep happens immediately. Failures are logged and the loop
/// keeps going.
pub fn spawn_retention_sweeper<S, P, G>(
    resolver: Arc<ForecastResolver<S, P, G>>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: LocationStore + 'static,
    P: WeatherProvider + 'static,
    G: Geocoder + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!("Retention sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = resolver.sweep_expired(Utc::now()).await {
                        tracing::error!("Retention sweep failed: {}", e);
                    }
                }
            }
        }
    })
}
