//! Location and forecast persistence.
//!
//! `LocationStore` is the seam the resolver talks to; `SqliteLocationStore` is
//! the SQLite implementation. The UNIQUE constraint on `zip_code` is the only
//! guard against two requests creating the same location.

use chrono::{DateTime, Utc};
use forecaster_core::{RusqliteErrorExt, StoreError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::types::{Coordinates, ForecastRecord, Location, ProviderForecast};
use crate::zip::ZipCode;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations needed to resolve forecasts.
pub trait LocationStore: Send + Sync {
    /// Return the location for `zip`, creating it with `address_hint` if unseen.
    ///
    /// The flag is true only when this call inserted the row.
    fn find_or_create_by_zip(
        &self,
        zip: &ZipCode,
        address_hint: &str,
    ) -> impl Future<Output = StoreResult<(Location, bool)>> + Send;

    /// Backfill coordinates on an existing location.
    fn set_coordinates(
        &self,
        location_id: i64,
        coordinates: Coordinates,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Forecasts for a location cached strictly after `since`, in no particular order.
    fn forecasts_since(
        &self,
        location_id: i64,
        since: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Vec<ForecastRecord>>> + Send;

    /// Append a forecast for a location.
    fn insert_forecast(
        &self,
        location_id: i64,
        forecast: &ProviderForecast,
        cached_at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<ForecastRecord>> + Send;

    /// Delete every location without a forecast cached after `cutoff`, along
    /// with its forecasts. Returns the number of locations removed.
    fn delete_locations_without_forecasts_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<usize>> + Send;
}

/// SQLite-backed location store.
///
/// Trait operations run on the blocking pool; the inherent lookup and count
/// helpers lock the connection on the calling thread.
pub struct SqliteLocationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLocationStore {
    /// Open (or create) the database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        let conn = Connection::open(path)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store. Data lives as long as the store.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Look up a location by ZIP code.
    pub fn find_by_zip(&self, zip: &ZipCode) -> StoreResult<Option<Location>> {
        let conn = self.conn.lock();
        find_by_zip(&conn, zip)
    }

    pub fn location_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_store_error)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn forecast_count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM weather_forecasts", [], |row| row.get(0))
            .map_err(RusqliteErrorExt::into_store_error)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Run `op` against the connection on the blocking thread pool.
    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::QueryFailed(format!("store task failed: {}", e)))?
    }
}

fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            zip_code TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL,
            latitude REAL,
            longitude REAL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS weather_forecasts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
            current_temp REAL NOT NULL,
            high_temp REAL NOT NULL,
            low_temp REAL NOT NULL,
            conditions TEXT NOT NULL,
            cached_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_forecasts_location_cached
            ON weather_forecasts(location_id, cached_at);
        "#,
    )
    .map_err(|e| StoreError::MigrationFailed(e.to_string()))
}

fn find_by_zip(conn: &Connection, zip: &ZipCode) -> StoreResult<Option<Location>> {
    conn.query_row(
        "SELECT id, zip_code, address, latitude, longitude, created_at FROM locations WHERE zip_code = ?1",
        params![zip.as_str()],
        row_to_location,
    )
    .optional()
    .map_err(RusqliteErrorExt::into_store_error)
}

fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
    let zip: String = row.get(1)?;
    let latitude: Option<f64> = row.get(3)?;
    let longitude: Option<f64> = row.get(4)?;
    let created_ms: i64 = row.get(5)?;

    let zip_code = ZipCode::parse(&zip).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Location {
        id: row.get(0)?,
        zip_code,
        address: row.get(2)?,
        coordinates: latitude
            .zip(longitude)
            .map(|(latitude, longitude)| Coordinates {
                latitude,
                longitude,
            }),
        created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or_default(),
    })
}

fn row_to_forecast(row: &rusqlite::Row) -> rusqlite::Result<ForecastRecord> {
    let cached_ms: i64 = row.get(6)?;
    Ok(ForecastRecord {
        id: row.get(0)?,
        location_id: row.get(1)?,
        current_temp: row.get(2)?,
        high_temp: row.get(3)?,
        low_temp: row.get(4)?,
        conditions: row.get(5)?,
        cached_at: DateTime::from_timestamp_millis(cached_ms).unwrap_or_default(),
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn find_or_create(
    conn: &Connection,
    zip: &ZipCode,
    address_hint: &str,
) -> StoreResult<(Location, bool)> {
    if let Some(location) = find_by_zip(conn, zip)? {
        return Ok((location, false));
    }
    create_location(conn, zip, address_hint)
}

/// Insert a location, falling back to the existing row when another writer
/// inserted the same ZIP first.
fn create_location(
    conn: &Connection,
    zip: &ZipCode,
    address_hint: &str,
) -> StoreResult<(Location, bool)> {
    let created_at = Utc::now();
    let inserted = conn.execute(
        "INSERT INTO locations (zip_code, address, created_at) VALUES (?1, ?2, ?3)",
        params![zip.as_str(), address_hint, created_at.timestamp_millis()],
    );

    match inserted {
        Ok(_) => {
            let location = Location {
                id: conn.last_insert_rowid(),
                zip_code: zip.clone(),
                address: address_hint.to_string(),
                coordinates: None,
                created_at: DateTime::from_timestamp_millis(created_at.timestamp_millis())
                    .unwrap_or(created_at),
            };
            Ok((location, true))
        }
        // Another writer on the same database file won the race
        Err(e) if is_unique_violation(&e) => {
            tracing::debug!(zip = %zip, "Location created concurrently, re-reading");
            find_by_zip(conn, zip)?
                .map(|location| (location, false))
                .ok_or_else(|| {
                    StoreError::QueryFailed(format!(
                        "location {} vanished after unique violation",
                        zip
                    ))
                })
        }
        Err(e) => Err(e.into_store_error()),
    }
}

fn set_coordinates(
    conn: &Connection,
    location_id: i64,
    coordinates: Coordinates,
) -> StoreResult<()> {
    let updated = conn
        .execute(
            "UPDATE locations SET latitude = ?1, longitude = ?2 WHERE id = ?3",
            params![coordinates.latitude, coordinates.longitude, location_id],
        )
        .map_err(RusqliteErrorExt::into_store_error)?;

    if updated == 0 {
        return Err(StoreError::QueryFailed(format!(
            "location {} not found",
            location_id
        )));
    }
    Ok(())
}

fn forecasts_since(
    conn: &Connection,
    location_id: i64,
    since: DateTime<Utc>,
) -> StoreResult<Vec<ForecastRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT id, location_id, current_temp, high_temp, low_temp, conditions, cached_at
            FROM weather_forecasts
            WHERE location_id = ?1 AND cached_at > ?2
            "#,
        )
        .map_err(RusqliteErrorExt::into_store_error)?;

    let rows = stmt
        .query_map(
            params![location_id, since.timestamp_millis()],
            row_to_forecast,
        )
        .map_err(RusqliteErrorExt::into_store_error)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(RusqliteErrorExt::into_store_error)
}

fn insert_forecast(
    conn: &Connection,
    location_id: i64,
    forecast: ProviderForecast,
    cached_at: DateTime<Utc>,
) -> StoreResult<ForecastRecord> {
    let cached_ms = cached_at.timestamp_millis();

    conn.execute(
        r#"
        INSERT INTO weather_forecasts
        (location_id, current_temp, high_temp, low_temp, conditions, cached_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            location_id,
            forecast.current_temp,
            forecast.high_temp,
            forecast.low_temp,
            forecast.conditions,
            cached_ms,
        ],
    )
    .map_err(RusqliteErrorExt::into_store_error)?;

    Ok(ForecastRecord {
        id: conn.last_insert_rowid(),
        location_id,
        current_temp: forecast.current_temp,
        high_temp: forecast.high_temp,
        low_temp: forecast.low_temp,
        conditions: forecast.conditions,
        cached_at: DateTime::from_timestamp_millis(cached_ms).unwrap_or(cached_at),
    })
}

fn delete_stale_locations(conn: &Connection, cutoff: DateTime<Utc>) -> StoreResult<usize> {
    conn.execute(
        r#"
        DELETE FROM locations
        WHERE id NOT IN (
            SELECT location_id FROM weather_forecasts WHERE cached_at > ?1
        )
        "#,
        params![cutoff.timestamp_millis()],
    )
    .map_err(RusqliteErrorExt::into_store_error)
}

impl LocationStore for SqliteLocationStore {
    async fn find_or_create_by_zip(
        &self,
        zip: &ZipCode,
        address_hint: &str,
    ) -> StoreResult<(Location, bool)> {
        let zip = zip.clone();
        let address_hint = address_hint.to_string();
        self.blocking(move |conn| find_or_create(conn, &zip, &address_hint))
            .await
    }

    async fn set_coordinates(&self, location_id: i64, coordinates: Coordinates) -> StoreResult<()> {
        self.blocking(move |conn| set_coordinates(conn, location_id, coordinates))
            .await
    }

    async fn forecasts_since(
        &self,
        location_id: i64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<ForecastRecord>> {
        self.blocking(move |conn| forecasts_since(conn, location_id, since))
            .await
    }

    async fn insert_forecast(
        &self,
        location_id: i64,
        forecast: &ProviderForecast,
        cached_at: DateTime<Utc>,
    ) -> StoreResult<ForecastRecord> {
        let forecast = forecast.clone();
        self.blocking(move |conn| insert_forecast(conn, location_id, forecast, cached_at))
            .await
    }

    async fn delete_locations_without_forecasts_since(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<usize> {
        self.blocking(move |conn| delete_stale_locations(conn, cutoff))
            .await
    }
}
