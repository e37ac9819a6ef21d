//! HTTP front end for forecaster.
//!
//! Wires configuration into a [`ForecastResolver`] and exposes it over warp.

pub mod routes;
pub mod sweeper;

use anyhow::{Context, Result};
use forecaster_core::Config;
use forecaster_weather::{
    ForecastResolver, NominatimGeocoder, SqliteLocationStore, WeatherApiClient,
};

pub use routes::routes;
pub use sweeper::spawn_retention_sweeper;

/// The resolver the binary runs with.
pub type AppResolver =
    ForecastResolver<SqliteLocationStore, WeatherApiClient, Option<NominatimGeocoder>>;

/// Open the store and build provider and geocoder clients from `config`.
///
/// # Errors
/// Fails if the database cannot be opened or an HTTP client cannot be built.
pub fn build_resolver(config: &Config) -> Result<AppResolver> {
    let store = SqliteLocationStore::new(&config.storage.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.storage.database_path.display()
        )
    })?;

    let provider =
        WeatherApiClient::new(&config.weather).context("Failed to build weather client")?;

    let geocoder = if config.geocoding.enabled {
        Some(NominatimGeocoder::new(&config.geocoding).context("Failed to build geocoder")?)
    } else {
        tracing::info!("Geocoding disabled");
        None
    };

    Ok(ForecastResolver::new(store, provider, geocoder))
}

/// Normalize a configured origin to `scheme://host[:port]`.
///
/// # Errors
/// Fails if `origin` is not an absolute URL with a host.
pub fn cors_origin(origin: &str) -> Result<String> {
    let url = url::Url::parse(origin).with_context(|| format!("Invalid origin {}", origin))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        anyhow::bail!("Origin {} has no host", url);
    }
    Ok(origin.ascii_serialization())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_cors_origin_strips_path() {
        assert_eq!(
            cors_origin("http://localhost:5173/app/").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            cors_origin("https://weather.example.com").unwrap(),
            "https://weather.example.com"
        );
    }

    #[test]
    fn test_cors_origin_rejects_garbage() {
        assert!(cors_origin("not a url").is_err());
        assert!(cors_origin("data:text/plain,hi").is_err());
    }

    #[test]
    fn test_build_resolver_with_geocoding_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path = dir.path().join("nested").join("forecaster.db");
        config.weather.api_key = "test-key".to_string();
        config.geocoding.enabled = false;

        let resolver = build_resolver(&config).unwrap();
        assert_eq!(resolver.store().location_count().unwrap(), 0);
        assert!(config.storage.database_path.exists());
    }
}
