//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - A time-bounded on-disk cache of weather payloads
//! - The HTTP fetcher and its error classification
//! - [`WeatherService`], which ties cache and fetcher together
//!
//! It is used by `weather-cli`, but can also be reused by other binaries.

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;

pub use cache::CacheStore;
pub use config::{CacheConfig, Config, CredentialSource, Credentials};
pub use error::WeatherError;
pub use model::{CacheEntry, CityKey, WeatherPayload, WeatherSummary};
pub use provider::{ProviderId, WeatherFetcher, fetcher_from_config, http::HttpFetcher};
pub use service::WeatherService;
