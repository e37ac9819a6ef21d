//! Retention sweep: drop locations nobody has asked about in a month.

use chrono::{DateTime, Duration, Utc};
use forecaster_core::ForecastError;

use crate::store::LocationStore;

pub const RETENTION_DAYS: i64 = 30;

/// Locations whose newest forecast is at or before this instant are swept.
pub fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(RETENTION_DAYS)
}

/// Delete locations (and their forecasts) with no forecast newer than the
/// retention window. Returns how many locations were removed.
///
/// # Errors
/// `ForecastError::Persistence` if the delete fails.
pub async fn sweep<S: LocationStore>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<usize, ForecastError> {
    let removed = store
        .delete_locations_without_forecasts_since(retention_cutoff(now))
        .await?;
    if removed > 0 {
        tracing::info!("Retention sweep removed {} locations", removed);
    } else {
        tracing::debug!("Retention sweep found nothing to remove");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::store::SqliteLocationStore;
    use crate::types::ProviderForecast;
    use crate::zip::ZipCode;

    fn forecast() -> ProviderForecast {
        ProviderForecast {
            current_temp: 50.0,
            high_temp: 55.0,
            low_temp: 40.0,
            conditions: "Overcast".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sweep_keeps_recently_queried() {
        let store = SqliteLocationStore::in_memory().unwrap();
        let now = Utc::now();

        let (recent, _) = store
            .find_or_create_by_zip(&ZipCode::parse("98101").unwrap(), "Seattle, WA 98101")
            .await
            .unwrap();
        store
            .insert_forecast(recent.id, &forecast(), now - Duration::days(29))
            .await
            .unwrap();

        let (stale, _) = store
            .find_or_create_by_zip(&ZipCode::parse("97201").unwrap(), "Portland, OR 97201")
            .await
            .unwrap();
        store
            .insert_forecast(stale.id, &forecast(), now - Duration::days(31))
            .await
            .unwrap();

        assert_eq!(sweep(&store, now).await.unwrap(), 1);
        assert_eq!(store.location_count().unwrap(), 1);
        assert_eq!(store.forecast_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_locations_without_forecasts() {
        let store = SqliteLocationStore::in_memory().unwrap();
        store
            .find_or_create_by_zip(&ZipCode::parse("98101").unwrap(), "Seattle, WA 98101")
            .await
            .unwrap();

        assert_eq!(sweep(&store, Utc::now()).await.unwrap(), 1);
        assert_eq!(store.location_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_empty_store() {
        let store = SqliteLocationStore::in_memory().unwrap();
        assert_eq!(sweep(&store, Utc::now()).await.unwrap(), 0);
    }

    #[test]
    fn test_cutoff() {
        let now = Utc::now();
        assert_eq!(retention_cutoff(now), now - Duration::days(30));
    }
}
