//! Forecast freshness policy.
//!
//! Caching is nothing more than the persisted forecast history of a location:
//! the newest record is reused while it is younger than [`FRESHNESS_MINUTES`].

use chrono::{DateTime, Duration, Utc};

use crate::types::ForecastRecord;

/// How long a stored forecast may be served without asking the provider again.
pub const FRESHNESS_MINUTES: i64 = 30;

pub fn freshness_window() -> Duration {
    Duration::minutes(FRESHNESS_MINUTES)
}

/// Records cached at or before this instant are stale.
pub fn stale_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - freshness_window()
}

pub fn expires_at(record: &ForecastRecord) -> DateTime<Utc> {
    record.cached_at + freshness_window()
}

/// The record with the greatest `cached_at`; ties resolve to any one of them.
pub fn most_recent(records: &[ForecastRecord]) -> Option<&ForecastRecord> {
    records.iter().max_by_key(|r| r.cached_at)
}

/// True iff a record exists and `now - cached_at` is strictly inside the window.
pub fn is_fresh(record: Option<&ForecastRecord>, now: DateTime<Utc>) -> bool {
    record.is_some_and(|r| now - r.cached_at < freshness_window())
}

/// The forecast that may be served for a location right now, if any.
pub fn current_forecast(history: &[ForecastRecord], now: DateTime<Utc>) -> Option<&ForecastRecord> {
    most_recent(history).filter(|r| is_fresh(Some(r), now))
}

pub fn needs_fetch(history: &[ForecastRecord], now: DateTime<Utc>) -> bool {
    !is_fresh(most_recent(history), now)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn record(id: i64, cached_at: DateTime<Utc>) -> ForecastRecord {
        ForecastRecord {
            id,
            location_id: 1,
            current_temp: 70.0,
            high_temp: 75.0,
            low_temp: 60.0,
            conditions: "Clear".to_string(),
            cached_at,
        }
    }

    #[test]
    fn test_missing_record_is_not_fresh() {
        assert!(!is_fresh(None, Utc::now()));
        assert!(needs_fetch(&[], Utc::now()));
    }

    #[test]
    fn test_recent_record_is_fresh() {
        let now = Utc::now();
        let r = record(1, now - Duration::minutes(10));
        assert!(is_fresh(Some(&r), now));
    }

    #[test]
    fn test_boundary_is_stale() {
        let now = Utc::now();
        let r = record(1, now - Duration::minutes(30));
        assert!(!is_fresh(Some(&r), now));

        let r = record(2, now - Duration::minutes(30) + Duration::milliseconds(1));
        assert!(is_fresh(Some(&r), now));
    }

    #[test]
    fn test_most_recent_ignores_input_order() {
        let now = Utc::now();
        let history = vec![
            record(1, now - Duration::minutes(5)),
            record(2, now - Duration::minutes(1)),
            record(3, now - Duration::minutes(20)),
        ];
        assert_eq!(most_recent(&history).unwrap().id, 2);
    }

    #[test]
    fn test_stale_newest_means_fetch() {
        let now = Utc::now();
        let history = vec![
            record(1, now - Duration::minutes(45)),
            record(2, now - Duration::minutes(31)),
        ];
        assert!(needs_fetch(&history, now));
        assert!(current_forecast(&history, now).is_none());
    }

    #[test]
    fn test_current_forecast_picks_newest_fresh() {
        let now = Utc::now();
        let history = vec![
            record(1, now - Duration::minutes(40)),
            record(2, now - Duration::minutes(12)),
            record(3, now - Duration::minutes(3)),
        ];
        assert!(!needs_fetch(&history, now));
        assert_eq!(current_forecast(&history, now).unwrap().id, 3);
    }

    #[test]
    fn test_expires_at() {
        let cached_at = Utc::now();
        let r = record(1, cached_at);
        assert_eq!(expires_at(&r), cached_at + Duration::minutes(30));
        assert_eq!(stale_cutoff(cached_at), cached_at - Duration::minutes(30));
    }
}
