use crate::{
    CityKey, Config, WeatherPayload, config::CredentialSource, error::Result,
    provider::http::HttpFetcher,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod http;

/// Request style of the upstream weather API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderId {
    /// `?q=<city>&appid=<key>&units=metric`
    #[default]
    OpenWeather,
    /// RapidAPI "weather by API Ninjas": `?city=<city>` plus `X-RapidAPI-*` headers.
    ApiNinjas,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::ApiNinjas => "apininjas",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::ApiNinjas]
    }

    /// Public endpoint for current conditions, offered as the default by `weather configure`.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "https://api.openweathermap.org/data/2.5/weather",
            ProviderId::ApiNinjas => "https://weather-by-api-ninjas.p.rapidapi.com/v1/weather",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "apininjas" => Ok(ProviderId::ApiNinjas),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, apininjas."
            )),
        }
    }
}

/// One remote lookup. No caching, no retry.
///
/// Expected network conditions come back as classified [`WeatherError`](crate::WeatherError)
/// values, never as panics.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, city: &CityKey) -> Result<WeatherPayload>;
}

/// Construct the HTTP fetcher described by `config`.
///
/// Credentials are not checked here; they are resolved on every fetch.
pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherFetcher>> {
    let provider = config.provider_id()?;
    let fetcher = HttpFetcher::new(provider, CredentialSource::from_config(config))?;

    Ok(Box::new(fetcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn provider_id_is_case_insensitive() {
        assert_eq!(ProviderId::try_from("OpenWeather").unwrap(), ProviderId::OpenWeather);
        assert_eq!(ProviderId::try_from(" APININJAS ").unwrap(), ProviderId::ApiNinjas);
    }

    #[test]
    fn default_base_urls_parse() {
        for id in ProviderId::all() {
            assert!(reqwest::Url::parse(id.default_base_url()).is_ok());
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn fetcher_from_config_does_not_require_credentials_up_front() {
        let cfg = Config::default();
        assert!(fetcher_from_config(&cfg).is_ok());
    }

    #[test]
    fn fetcher_from_config_rejects_unknown_provider() {
        let cfg = Config {
            provider: Some("nope".into()),
            ..Config::default()
        };
        let err = fetcher_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }
}
