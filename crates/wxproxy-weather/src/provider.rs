//! Upstream weather API client (`current.json`).

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::instrument;
use wxproxy_core::WeatherConfig;

use crate::error::{WeatherError, GENERIC_UPSTREAM_MESSAGE};
use crate::types::{ApiCurrentResponse, ApiErrorResponse};

const USER_AGENT: &str = concat!("wxproxy/", env!("CARGO_PKG_VERSION"));

/// Provider error code for "No matching location found."
const LOCATION_NOT_FOUND_CODE: i64 = 1006;

#[derive(Clone)]
pub struct WeatherProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for WeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl WeatherProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Self::new(&config.base_url, &config.api_key, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch current conditions (with air quality) for `city`.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(&self, city: &str) -> Result<ApiCurrentResponse, WeatherError> {
        let url = format!("{}/current.json", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("q", city), ("key", self.api_key.as_str()), ("aqi", "yes")])
            .send()
            .await?;

        handle_response(response).await
    }
}

async fn handle_response(response: reqwest::Response) -> Result<ApiCurrentResponse, WeatherError> {
    let status = response.status();
    let body = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("Malformed weather payload: {}", e);
            WeatherError::upstream(Some(status.as_u16()), GENERIC_UPSTREAM_MESSAGE)
        });
    }

    let detail = serde_json::from_str::<ApiErrorResponse>(&body)
        .ok()
        .map(|r| r.error);
    let code = detail.as_ref().and_then(|d| d.code);
    let message = detail
        .and_then(|d| d.message)
        .filter(|m| !m.trim().is_empty());

    tracing::warn!(
        "Weather provider returned {} (code {:?}): {}",
        status,
        code,
        message.as_deref().unwrap_or("<no message>")
    );

    if status == StatusCode::NOT_FOUND || code == Some(LOCATION_NOT_FOUND_CODE) {
        let message = message.unwrap_or_else(|| "No matching location found.".to_string());
        return Err(WeatherError::NotFound(message));
    }

    Err(WeatherError::upstream(
        Some(status.as_u16()),
        message.unwrap_or_else(|| GENERIC_UPSTREAM_MESSAGE.to_string()),
    ))
}
