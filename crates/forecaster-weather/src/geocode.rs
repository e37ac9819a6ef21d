//! Forward geocoding: convert an address to coordinates.
//! Uses Nominatim (OpenStreetMap) - free, no API key required.
//!
//! Geocoding is best effort. Every failure becomes `None`.

use forecaster_core::GeocodingConfig;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::types::Coordinates;

/// Something that can place an address on the map.
pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str) -> impl Future<Output = Option<Coordinates>> + Send;
}

/// A missing geocoder never finds anything.
impl<G: Geocoder> Geocoder for Option<G> {
    async fn geocode(&self, address: &str) -> Option<Coordinates> {
        match self {
            Some(geocoder) => geocoder.geocode(address).await,
            None => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Nominatim `/search` client.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// # Errors
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: &GeocodingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Option<Coordinates> {
        let url = format!("{}/search", self.base_url);

        let response = match self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("Geocode request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("Geocode returned status {}", response.status());
            return None;
        }

        let places: Vec<NominatimPlace> = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("Geocode parse error: {}", e);
                return None;
            }
        };

        let place = places.into_iter().next()?;
        let coordinates = Coordinates {
            latitude: place.lat.parse().ok()?,
            longitude: place.lon.parse().ok()?,
        };

        tracing::info!(
            "Geocoded to {}, {}",
            coordinates.latitude,
            coordinates.longitude
        );
        Some(coordinates)
    }
}
