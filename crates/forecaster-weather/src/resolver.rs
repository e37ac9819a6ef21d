//! Forecast resolution: address in, forecast out.
//!
//! validate address -> extract ZIP -> find or create location -> reuse a fresh
//! stored forecast, or fetch, persist and return a new one. Every collaborator
//! failure leaves this module as a `ForecastError`.

use chrono::{DateTime, Utc};
use forecaster_core::ForecastError;
use tracing::instrument;

use crate::cache;
use crate::geocode::Geocoder;
use crate::provider::WeatherProvider;
use crate::retention;
use crate::store::LocationStore;
use crate::types::{Location, ResolvedForecast};
use crate::zip::ZipCode;

pub struct ForecastResolver<S, P, G> {
    store: S,
    provider: P,
    geocoder: G,
}

impl<S, P, G> ForecastResolver<S, P, G>
where
    S: LocationStore,
    P: WeatherProvider,
    G: Geocoder,
{
    pub fn new(store: S, provider: P, geocoder: G) -> Self {
        Self {
            store,
            provider,
            geocoder,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve an address against the wall clock.
    ///
    /// # Errors
    /// See [`ForecastResolver::resolve_at`].
    pub async fn resolve(&self, address: &str) -> Result<ResolvedForecast, ForecastError> {
        self.resolve_at(address, Utc::now()).await
    }

    /// Resolve an address as of `now`.
    ///
    /// # Errors
    /// `MissingAddress` / `InvalidZipCode` for bad input, `Persistence` for
    /// storage failures, and the provider kinds (`Unauthorized`, `RateLimited`,
    /// `NotFound`, `Unreachable`, `MalformedPayload`, `Unexpected`) when a fetch
    /// was needed and failed.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve_at(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedForecast, ForecastError> {
        let zip = ZipCode::from_address(address)?;
        let location = self.resolve_location(&zip, address.trim()).await?;

        let history = self
            .store
            .forecasts_since(location.id, cache::stale_cutoff(now))
            .await?;

        if let Some(record) = cache::current_forecast(&history, now) {
            tracing::info!(zip = %zip, cached_at = %record.cached_at, "Serving cached forecast");
            return Ok(ResolvedForecast::new(record, &location, true));
        }

        tracing::info!(zip = %zip, "No fresh forecast, querying provider");

        let payload = self
            .provider
            .fetch_forecast(&location.address)
            .await
            .map_err(|e| {
                tracing::warn!(zip = %zip, "Provider request failed: {}", e);
                ForecastError::from(e)
            })?;

        let forecast = payload.extract().map_err(|e| {
            tracing::warn!(zip = %zip, "Provider payload rejected: {}", e);
            ForecastError::from(e)
        })?;

        let record = self
            .store
            .insert_forecast(location.id, &forecast, now)
            .await?;
        Ok(ResolvedForecast::new(&record, &location, false))
    }

    /// Run the retention sweep as of `now`.
    ///
    /// # Errors
    /// `ForecastError::Persistence` if the delete fails.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, ForecastError> {
        retention::sweep(&self.store, now).await
    }

    async fn resolve_location(
        &self,
        zip: &ZipCode,
        address: &str,
    ) -> Result<Location, ForecastError> {
        let (mut location, created) = self
            .store
            .find_or_create_by_zip(zip, address)
            .await?;
        if !created {
            return Ok(location);
        }

        tracing::info!(zip = %zip, "Created location");

        match self.geocoder.geocode(&location.address).await {
            Some(coordinates) => {
                match self.store.set_coordinates(location.id, coordinates).await {
                    Ok(()) => location.coordinates = Some(coordinates),
                    Err(e) => tracing::warn!(zip = %zip, "Failed to store coordinates: {}", e),
                }
            }
            None => tracing::debug!(zip = %zip, "No coordinates for location"),
        }

        Ok(location)
    }
}
