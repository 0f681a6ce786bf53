use thiserror::Error;

/// Every externally observable failure of the retrieval pipeline.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City name cannot be empty")]
    InvalidInput,

    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("The API request timed out")]
    Timeout,

    #[error("API rate limit exceeded")]
    RateLimited,

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to save cache for {city}: {reason}")]
    CacheWriteFailed { city: String, reason: String },
}

impl WeatherError {
    /// Human-readable line for the terminal.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput => "City name cannot be empty.".to_string(),
            Self::ConfigurationMissing(what) => format!(
                "{what} is not configured.\n\
                 Hint: set WEATHER_API_KEY and WEATHER_API_BASE_URL, or run `weather configure`."
            ),
            Self::Timeout => "The API request timed out. Please try again later.".to_string(),
            Self::RateLimited => "API rate limit exceeded. Please try again later.".to_string(),
            Self::HttpError { status, message } => {
                format!("HTTP error occurred - {status}: {message}")
            }
            Self::NetworkError(msg) => format!("Network error occurred - {msg}"),
            Self::MalformedResponse(msg) => format!("Invalid weather data format - {msg}"),
            Self::CacheWriteFailed { city, .. } => format!("Failed to save cache for {city}"),
        }
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;
