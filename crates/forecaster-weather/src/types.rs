use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache;
use crate::zip::ZipCode;

/// Geographic coordinates from geocoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A place identified by its ZIP code.
///
/// The ZIP code is the only identity key: every address sharing it maps to
/// the same location, which keeps the address it was first created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub zip_code: ZipCode,
    pub address: String,
    pub coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
}

/// One stored provider answer for a location. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub id: i64,
    pub location_id: i64,
    /// Degrees Fahrenheit
    pub current_temp: f64,
    pub high_temp: f64,
    pub low_temp: f64,
    pub conditions: String,
    pub cached_at: DateTime<Utc>,
}

/// The fields pulled out of a provider payload, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderForecast {
    pub current_temp: f64,
    pub high_temp: f64,
    pub low_temp: f64,
    pub conditions: String,
}

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedForecast {
    pub current_temp: f64,
    pub high_temp: f64,
    pub low_temp: f64,
    pub conditions: String,
    pub location_address: String,
    pub from_cache: bool,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ResolvedForecast {
    pub fn new(record: &ForecastRecord, location: &Location, from_cache: bool) -> Self {
        Self {
            current_temp: record.current_temp,
            high_temp: record.high_temp,
            low_temp: record.low_temp,
            conditions: record.conditions.clone(),
            location_address: location.address.clone(),
            from_cache,
            cached_at: record.cached_at,
            expires_at: cache::expires_at(record),
        }
    }
}
