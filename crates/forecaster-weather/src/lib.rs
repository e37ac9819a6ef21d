//! Forecast resolution for forecaster.
//!
//! Turns a free-text US address into current conditions, reusing forecasts
//! stored per ZIP code for 30 minutes before asking the provider again.

pub mod cache;
pub mod error_mapping;
pub mod geocode;
pub mod provider;
pub mod resolver;
pub mod retention;
pub mod store;
pub mod types;
pub mod zip;

pub use geocode::{Geocoder, NominatimGeocoder};
pub use provider::{ForecastPayload, ProviderError, WeatherApiClient, WeatherProvider};
pub use resolver::ForecastResolver;
pub use store::{LocationStore, SqliteLocationStore};
pub use types::*;
pub use zip::{extract_zip, is_valid_zip, ZipCode};
