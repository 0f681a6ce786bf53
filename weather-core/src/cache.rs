//! On-disk cache of weather payloads, one JSON record per city.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, process, time::Duration};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, WeatherError},
    model::{CacheEntry, CityKey, WeatherPayload},
};

/// Second precision, local time.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    timestamp: String,
    weather_data: WeatherPayload,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Storage location for a city. Stable across casing variants.
    pub fn path_for(&self, city: &CityKey) -> PathBuf {
        self.dir.join(format!("{}.json", city.file_stem()))
    }

    /// Fresh entry for `city`, if any.
    pub fn read(&self, city: &CityKey) -> Option<CacheEntry> {
        self.read_at(city, now())
    }

    /// Same as [`read`](Self::read), judging freshness against `now`.
    ///
    /// Missing, corrupt and stale records all come back as `None`.
    pub fn read_at(&self, city: &CityKey, now: NaiveDateTime) -> Option<CacheEntry> {
        let path = self.path_for(city);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(city = %city, path = %path.display(), "no cache entry: {e}");
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => {
                warn!(city = %city, path = %path.display(), "ignoring corrupt cache record: {e}");
                return None;
            }
        };

        let fetched_at = match NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT) {
            Ok(ts) => ts,
            Err(e) => {
                warn!(
                    city = %city,
                    timestamp = %record.timestamp,
                    "ignoring cache record with bad timestamp: {e}"
                );
                return None;
            }
        };

        if !self.is_fresh(fetched_at, now) {
            debug!(city = %city, %fetched_at, "cache entry is stale");
            return None;
        }

        info!(city = %city, "using cached weather data");
        Some(CacheEntry {
            city: city.clone(),
            fetched_at,
            payload: record.weather_data,
        })
    }

    /// Persist `payload` for `city`, replacing whatever was there.
    pub fn write(&self, city: &CityKey, payload: &WeatherPayload) -> Result<()> {
        self.write_at(city, payload, now())
    }

    /// Same as [`write`](Self::write), stamping the record with `fetched_at`.
    pub fn write_at(
        &self,
        city: &CityKey,
        payload: &WeatherPayload,
        fetched_at: NaiveDateTime,
    ) -> Result<()> {
        let fail = |reason: String| WeatherError::CacheWriteFailed {
            city: city.as_key().to_string(),
            reason,
        };

        let dir = self.dir.display();
        fs::create_dir_all(&self.dir)
            .map_err(|e| fail(format!("cannot create cache directory {dir}: {e}")))?;

        let record = CacheRecord {
            timestamp: fetched_at.format(TIMESTAMP_FORMAT).to_string(),
            weather_data: payload.clone(),
        };
        let json = serde_json::to_string(&record)
            .map_err(|e| fail(format!("cannot serialize record: {e}")))?;

        // Whole-file replace so a reader never sees half a record. The temp name
        // is per process so concurrent writers don't rename each other's file.
        let path = self.path_for(city);
        let tmp = path.with_extension(format!("json.{}.tmp", process::id()));
        fs::write(&tmp, json)
            .map_err(|e| fail(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            fail(format!("cannot replace {}: {e}", path.display()))
        })?;

        info!(city = %city, path = %path.display(), "saved cache");
        Ok(())
    }

    fn is_fresh(&self, fetched_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        match (now - fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            // Stamped in the future (clock moved back): age counts as zero.
            Err(_) => true,
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use serde_json::json;
    use tempfile::TempDir;

    const HOUR: Duration = Duration::from_secs(3600);

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn key(name: &str) -> CityKey {
        CityKey::parse(name).unwrap()
    }

    fn london() -> CityKey {
        key("London")
    }

    fn payload() -> WeatherPayload {
        WeatherPayload::new(json!({
            "name": "London",
            "main": { "temp": 10 },
            "weather": [{ "description": "Clouds" }]
        }))
    }

    fn minutes_after_noon(minutes: i64) -> NaiveDateTime {
        noon() + ChronoDuration::minutes(minutes)
    }

    #[test]
    fn missing_entry_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);
        assert!(store.read_at(&london(), noon()).is_none());
    }

    #[test]
    fn write_then_read_returns_payload() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);

        store.write_at(&london(), &payload(), noon()).unwrap();
        let entry = store.read_at(&london(), minutes_after_noon(59)).unwrap();

        assert_eq!(entry.payload, payload());
        assert_eq!(entry.fetched_at, noon());
        assert_eq!(entry.city, london());
    }

    #[test]
    fn entry_is_stale_at_exactly_the_window() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);

        store.write_at(&london(), &payload(), noon()).unwrap();

        let just_before = noon() + ChronoDuration::seconds(3599);
        assert!(store.read_at(&london(), just_before).is_some());
        assert!(store.read_at(&london(), minutes_after_noon(60)).is_none());
        // Stale records are left on disk.
        assert!(store.path_for(&london()).exists());
    }

    #[test]
    fn casing_variants_hit_the_same_slot() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);

        store.write_at(&key("LONDON"), &payload(), noon()).unwrap();

        assert!(store.read_at(&key("london"), noon()).is_some());
        assert_eq!(store.path_for(&london()), tmp.path().join("london.json"));
    }

    #[test]
    fn escaped_keys_do_not_share_a_slot() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);
        let slashed = WeatherPayload::new(json!({ "name": "A/B" }));

        store.write_at(&key("a/b"), &slashed, noon()).unwrap();

        assert_ne!(store.path_for(&key("a/b")), store.path_for(&key("a_b")));
        assert!(store.read_at(&key("a_b"), noon()).is_none());
        assert_eq!(store.read_at(&key("a/b"), noon()).unwrap().payload, slashed);
    }

    #[test]
    fn later_write_replaces_earlier_one() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);
        let newer = WeatherPayload::new(json!({ "name": "London", "main": { "temp": 12 } }));

        store.write_at(&london(), &payload(), noon()).unwrap();
        let later = minutes_after_noon(5);
        store.write_at(&london(), &newer, later).unwrap();

        let entry = store.read_at(&london(), minutes_after_noon(6)).unwrap();
        assert_eq!(entry.payload, newer);
        assert_eq!(entry.fetched_at, later);
    }

    #[test]
    fn record_layout_on_disk() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);

        store.write_at(&london(), &payload(), noon()).unwrap();

        let raw = fs::read_to_string(store.path_for(&london())).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["timestamp"], "2024-05-01 12:00:00");
        assert_eq!(doc["weather_data"]["main"]["temp"], 10);
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);

        let later = minutes_after_noon(1);
        store.write_at(&london(), &payload(), noon()).unwrap();
        store.write_at(&london(), &payload(), later).unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("london.json")]);
    }

    #[test]
    fn corrupt_json_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);
        fs::write(store.path_for(&london()), "{ not json").unwrap();

        assert!(store.read_at(&london(), noon()).is_none());
    }

    #[test]
    fn bad_timestamp_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);
        let record = r#"{"timestamp": "yesterday", "weather_data": {}}"#;
        fs::write(store.path_for(&london()), record).unwrap();

        assert!(store.read_at(&london(), noon()).is_none());
    }

    #[test]
    fn missing_fields_read_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);
        let record = r#"{"timestamp": "2024-05-01 12:00:00"}"#;
        fs::write(store.path_for(&london()), record).unwrap();

        assert!(store.read_at(&london(), noon()).is_none());
    }

    #[test]
    fn write_creates_the_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("cache");
        let store = CacheStore::new(&dir, HOUR);

        store.write_at(&london(), &payload(), noon()).unwrap();
        assert!(dir.join("london.json").exists());
    }

    #[test]
    fn write_failure_is_reported_not_raised() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the directory should be.
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = CacheStore::new(blocker.join("cache"), HOUR);

        let err = store.write_at(&london(), &payload(), noon()).unwrap_err();
        assert!(matches!(err, WeatherError::CacheWriteFailed { ref city, .. } if city == "london"));
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let tmp = TempDir::new().unwrap();
        let store = CacheStore::new(tmp.path(), HOUR);

        let ahead = minutes_after_noon(10);
        store.write_at(&london(), &payload(), ahead).unwrap();
        assert!(store.read_at(&london(), noon()).is_some());
    }
}
