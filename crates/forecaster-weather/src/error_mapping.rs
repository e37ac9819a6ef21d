//! Maps provider errors onto `ForecastError` so nothing raw escapes the resolver.

use forecaster_core::ForecastError;

use crate::provider::ProviderError;

impl From<ProviderError> for ForecastError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Unauthorized => ForecastError::Unauthorized,
            ProviderError::RateLimited => ForecastError::RateLimited,
            ProviderError::NotFound => ForecastError::NotFound,
            ProviderError::Unreachable(s) => ForecastError::Unreachable(s),
            ProviderError::MalformedPayload(s) => ForecastError::MalformedPayload(s),
            ProviderError::UnexpectedStatus(code) => {
                ForecastError::Unexpected(format!("provider returned HTTP {}", code))
            }
            ProviderError::Request(s) => ForecastError::Unexpected(s),
        }
    }
}
