//! Cache-first weather retrieval.

use tracing::{debug, warn};

use crate::{
    cache::CacheStore,
    error::Result,
    model::{CityKey, WeatherPayload},
    provider::WeatherFetcher,
};

/// Composes the cache and the fetcher into a single lookup.
///
/// Holds no per-call state; every [`get_weather`](Self::get_weather) is independent.
#[derive(Debug)]
pub struct WeatherService {
    cache: CacheStore,
    fetcher: Box<dyn WeatherFetcher>,
}

impl WeatherService {
    pub fn new(cache: CacheStore, fetcher: Box<dyn WeatherFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fresh cached payload if there is one, otherwise fetch and write back.
    ///
    /// A failed fetch is returned as is; stale entries are never used as a fallback.
    /// A failed cache write is logged and the fetched payload is still returned.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherPayload> {
        let city = CityKey::parse(city)?;

        if let Some(entry) = self.cache.read(&city) {
            return Ok(entry.payload);
        }

        debug!(city = %city, "cache miss, fetching");
        let payload = self.fetcher.fetch(&city).await?;

        if let Err(e) = self.cache.write(&city, &payload) {
            warn!(city = %city, "continuing without cache: {e}");
        }

        Ok(payload)
    }
}
