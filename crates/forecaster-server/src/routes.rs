//! HTTP routes.
//!
//! `GET /api/v1/weather/forecast?address=...` and `GET /api/v1/health`.

use chrono::{DateTime, SecondsFormat, Utc};
use forecaster_core::ForecastError;
use forecaster_weather::{
    ForecastResolver, Geocoder, LocationStore, ResolvedForecast, WeatherProvider,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub data: ForecastData,
    pub meta: ForecastMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastData {
    pub current_temp: f64,
    pub high_temp: f64,
    pub low_temp: f64,
    pub conditions: String,
    pub location_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastMeta {
    pub cached: bool,
    pub cached_at: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl From<&ResolvedForecast> for ForecastResponse {
    fn from(f: &ResolvedForecast) -> Self {
        Self {
            data: ForecastData {
                current_temp: f.current_temp,
                high_temp: f.high_temp,
                low_temp: f.low_temp,
                conditions: f.conditions.clone(),
                location_address: f.location_address.clone(),
            },
            meta: ForecastMeta {
                cached: f.from_cache,
                cached_at: timestamp(f.cached_at),
                expires_at: timestamp(f.expires_at),
            },
        }
    }
}

fn json_error(message: &str, status: StatusCode) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: message.to_string(),
        }),
        status,
    )
    .into_response()
}

/// Render a resolution failure with the status from the error taxonomy.
pub fn error_response(err: &ForecastError) -> Response {
    let status = StatusCode::from_u16(err.status().code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        tracing::error!("Forecast request failed: {}", err);
    } else {
        tracing::warn!("Forecast request rejected: {}", err);
    }

    json_error(err.user_message(), status)
}

/// All API routes, sharing one resolver.
pub fn api<S, P, G>(
    resolver: Arc<ForecastResolver<S, P, G>>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    S: LocationStore + 'static,
    P: WeatherProvider + 'static,
    G: Geocoder + 'static,
{
    let forecast = warp::get()
        .and(warp::path!("api" / "v1" / "weather" / "forecast"))
        .and(warp::query::<ForecastQuery>())
        .and(warp::any().map(move || resolver.clone()))
        .and_then(forecast_handler::<S, P, G>);

    let health = warp::get()
        .and(warp::path!("api" / "v1" / "health"))
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    forecast.or(health)
}

/// API routes with CORS for `allowed_origin` and JSON rejections.
pub fn routes<S, P, G>(
    resolver: Arc<ForecastResolver<S, P, G>>,
    allowed_origin: &str,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone
where
    S: LocationStore + 'static,
    P: WeatherProvider + 'static,
    G: Geocoder + 'static,
{
    let cors = warp::cors()
        .allow_origin(allowed_origin)
        .allow_methods(vec!["GET", "OPTIONS", "HEAD"])
        .allow_any_header()
        .allow_credentials(true);

    api(resolver).with(cors).recover(handle_rejection)
}

async fn forecast_handler<S, P, G>(
    query: ForecastQuery,
    resolver: Arc<ForecastResolver<S, P, G>>,
) -> Result<Response, Infallible>
where
    S: LocationStore,
    P: WeatherProvider,
    G: Geocoder,
{
    let address = query.address.unwrap_or_default();

    let response = match resolver.resolve(&address).await {
        Ok(forecast) => warp::reply::json(&ForecastResponse::from(&forecast)).into_response(),
        Err(e) => error_response(&e),
    };

    Ok(response)
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(json_error("Not found", StatusCode::NOT_FOUND));
    }

    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(json_error("Method not allowed", StatusCode::METHOD_NOT_ALLOWED));
    }

    if err.find::<warp::reject::InvalidQuery>().is_some() {
        return Ok(json_error("Invalid query string", StatusCode::BAD_REQUEST));
    }

    if let Some(cors) = err.find::<warp::cors::CorsForbidden>() {
        return Ok(json_error(&cors.to_string(), StatusCode::FORBIDDEN));
    }

    tracing::error!("Unhandled rejection: {:?}", err);
    Ok(json_error(
        "An unexpected error occurred",
        StatusCode::INTERNAL_SERVER_ERROR,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecaster_core::StoreError;

    #[test]
    fn test_response_shape() {
        let cached_at = DateTime::parse_from_rfc3339("2026-06-12T19:44:07Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        let forecast = ResolvedForecast {
            current_temp: 72.5,
            high_temp: 75.0,
            low_temp: 65.0,
            conditions: "Sunny".to_string(),
            location_address: "123 Main St, Beverly Hills, CA 90210".to_string(),
            from_cache: false,
            cached_at,
            expires_at: cached_at + chrono::Duration::minutes(30),
        };

        let body = serde_json::to_value(ForecastResponse::from(&forecast)).unwrap_or_default();
        assert_eq!(body["data"]["current_temp"], 72.5);
        assert_eq!(body["data"]["conditions"], "Sunny");
        assert_eq!(body["meta"]["cached"], false);
        assert_eq!(body["meta"]["cached_at"], "2026-06-12T19:44:07Z");
        assert_eq!(body["meta"]["expires_at"], "2026-06-12T20:14:07Z");
    }

    #[test]
    fn test_error_response_status() {
        let response = error_response(&ForecastError::InvalidZipCode);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = error_response(&ForecastError::RateLimited);
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response =
            error_response(&ForecastError::Persistence(StoreError::QueryFailed("x".into())));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
