//! Weather provider client (weatherapi.com `forecast.json`).

use forecaster_core::WeatherApiConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use crate::types::ProviderForecast;

/// Failures reported by a weather provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider rejected the API key")]
    Unauthorized,

    #[error("Provider rate limit exceeded")]
    RateLimited,

    #[error("Provider could not find the location")]
    NotFound,

    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("Provider returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),
}

/// A source of raw forecast payloads.
pub trait WeatherProvider: Send + Sync {
    /// Fetch the forecast for a free-text query (address or ZIP code).
    fn fetch_forecast(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<ForecastPayload, ProviderError>> + Send;
}

/// Raw `forecast.json` body. Every field is optional so that absence is
/// reported by [`ForecastPayload::extract`] instead of failing the decode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastPayload {
    pub current: Option<CurrentPayload>,
    pub forecast: Option<OutlookPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CurrentPayload {
    pub temp_f: Option<f64>,
    pub condition: Option<ConditionPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConditionPayload {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutlookPayload {
    pub forecastday: Option<Vec<ForecastDayPayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastDayPayload {
    pub day: Option<DayPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayPayload {
    pub maxtemp_f: Option<f64>,
    pub mintemp_f: Option<f64>,
}

fn missing(field: &str) -> ProviderError {
    ProviderError::MalformedPayload(format!("missing {}", field))
}

impl ForecastPayload {
    /// Pull current, high, low and conditions out of the payload.
    ///
    /// High and low come from the first forecast day.
    ///
    /// # Errors
    /// `ProviderError::MalformedPayload` naming the first absent field.
    pub fn extract(&self) -> Result<ProviderForecast, ProviderError> {
        let current = self.current.as_ref().ok_or_else(|| missing("current"))?;
        let current_temp = current.temp_f.ok_or_else(|| missing("current.temp_f"))?;

        let today = self
            .forecast
            .as_ref()
            .and_then(|f| f.forecastday.as_ref())
            .and_then(|days| days.first())
            .and_then(|d| d.day.as_ref())
            .ok_or_else(|| missing("forecast.forecastday[0].day"))?;
        let high_temp = today
            .maxtemp_f
            .ok_or_else(|| missing("forecast.forecastday[0].day.maxtemp_f"))?;
        let low_temp = today
            .mintemp_f
            .ok_or_else(|| missing("forecast.forecastday[0].day.mintemp_f"))?;

        let conditions = current
            .condition
            .as_ref()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| missing("current.condition.text"))?;

        Ok(ProviderForecast {
            current_temp,
            high_temp,
            low_temp,
            conditions,
        })
    }
}

/// Convert transport errors into provider errors.
pub trait ReqwestErrorExt {
    fn into_provider_error(self) -> ProviderError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_provider_error(self) -> ProviderError {
        if self.is_timeout() || self.is_connect() {
            ProviderError::Unreachable(self.to_string())
        } else if let Some(status) = self.status() {
            ProviderError::UnexpectedStatus(status.as_u16())
        } else {
            ProviderError::Request(self.to_string())
        }
    }
}

/// HTTP client for weatherapi.com.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    days: u8,
}

impl WeatherApiClient {
    /// Build a client from explicit configuration.
    ///
    /// # Errors
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(config: &WeatherApiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            days: config.forecast_days,
        })
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<ForecastPayload, ProviderError> {
        let status = response.status();

        match status {
            StatusCode::OK => {
                let body = response
                    .bytes()
                    .await
                    .map_err(ReqwestErrorExt::into_provider_error)?;
                serde_json::from_slice(&body)
                    .map_err(|e| ProviderError::MalformedPayload(e.to_string()))
            }
            StatusCode::UNAUTHORIZED => Err(ProviderError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            StatusCode::NOT_FOUND => Err(ProviderError::NotFound),
            other => {
                let text = response.text().await.unwrap_or_default();
                tracing::debug!("Provider returned {}: {}", other, text);
                Err(ProviderError::UnexpectedStatus(other.as_u16()))
            }
        }
    }
}

impl WeatherProvider for WeatherApiClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch_forecast(&self, query: &str) -> Result<ForecastPayload, ProviderError> {
        let url = format!("{}/forecast.json", self.base_url);
        let days = self.days.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", query), ("days", days.as_str())])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_provider_error)?;

        self.handle_response(response).await
    }
}
