use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    config::{CredentialSource, Credentials},
    error::{Result, WeatherError},
    model::{CityKey, WeatherPayload},
};

use super::{ProviderId, WeatherFetcher};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches current conditions with a single bounded GET.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    provider: ProviderId,
    credentials: CredentialSource,
    http: Client,
}

impl HttpFetcher {
    pub fn new(provider: ProviderId, credentials: CredentialSource) -> Result<Self> {
        Self::with_timeout(provider, credentials, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        provider: ProviderId,
        credentials: CredentialSource,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::NetworkError(format!("cannot build client: {e}")))?;

        Ok(Self {
            provider,
            credentials,
            http,
        })
    }

    fn build_request(&self, city: &CityKey, creds: &Credentials) -> RequestBuilder {
        let req = self.http.get(creds.base_url.clone());

        match self.provider {
            ProviderId::OpenWeather => req.query(&[
                ("q", city.name()),
                ("appid", creds.api_key.as_str()),
                ("units", "metric"),
            ]),
            ProviderId::ApiNinjas => {
                let host = creds.base_url.host_str().unwrap_or_default().to_string();
                req.query(&[("city", city.name())])
                    .header("X-RapidAPI-Key", creds.api_key.as_str())
                    .header("X-RapidAPI-Host", host)
            }
        }
    }
}

#[async_trait]
impl WeatherFetcher for HttpFetcher {
    async fn fetch(&self, city: &CityKey) -> Result<WeatherPayload> {
        // Resolved per call so configuration changes apply without a restart.
        let creds = self.credentials.resolve()?;

        debug!(
            city = %city,
            provider = %self.provider,
            url = %creds.base_url,
            "requesting weather"
        );

        let res = self
            .build_request(city, &creds)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(WeatherError::RateLimited);
        }

        let body = res.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(WeatherError::HttpError {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        let doc: Value = serde_json::from_str(&body).map_err(|e| {
            WeatherError::MalformedResponse(format!("{e}: {}", truncate_body(&body)))
        })?;

        info!(city = %city, "successfully fetched weather data");
        Ok(WeatherPayload::new(doc))
    }
}

fn classify_transport(err: reqwest::Error) -> WeatherError {
    if err.is_timeout() {
        WeatherError::Timeout
    } else {
        WeatherError::NetworkError(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
