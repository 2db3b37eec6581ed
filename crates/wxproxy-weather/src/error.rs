//! Weather lookup error types.

use thiserror::Error;

/// Used when the provider gives no usable message.
pub const GENERIC_UPSTREAM_MESSAGE: &str = "Failed to fetch weather data";

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {message}")]
    Upstream {
        /// HTTP status from the provider, `None` for transport failures
        status: Option<u16>,
        message: String,
    },
}

impl WeatherError {
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status a routing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::NotFound(_) => 404,
            Self::Upstream { .. } => 502,
        }
    }

    /// Message safe to show to end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::NotFound(_) => "City not found. Check the spelling and try again.".to_string(),
            Self::Upstream { message, .. } => message.clone(),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        if e.is_timeout() {
            Self::upstream(status, "Weather provider timed out")
        } else if e.is_connect() {
            Self::upstream(status, "Unable to reach weather provider")
        } else {
            tracing::debug!("Upstream transport error: {}", e);
            Self::upstream(status, GENERIC_UPSTREAM_MESSAGE)
        }
    }
}
