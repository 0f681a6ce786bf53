use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Write};

use crate::error::{Result, WeatherError};

/// Normalized city identifier.
///
/// Keeps the trimmed name as typed (sent upstream) next to the lower-cased
/// form used as the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityKey {
    name: String,
    key: String,
}

impl CityKey {
    pub fn parse(input: &str) -> Result<Self> {
        let name = input.trim();
        if name.is_empty() {
            return Err(WeatherError::InvalidInput);
        }

        Ok(Self {
            name: name.to_string(),
            key: name.to_lowercase(),
        })
    }

    /// The city as the user typed it, minus surrounding whitespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased canonical form.
    pub fn as_key(&self) -> &str {
        &self.key
    }

    /// File-name-safe form of the key.
    ///
    /// Reserved characters, control characters and `%` are percent-encoded,
    /// so distinct keys always get distinct stems.
    pub fn file_stem(&self) -> String {
        let mut stem = String::with_capacity(self.key.len());
        let mut buf = [0u8; 4];

        for c in self.key.chars() {
            let reserved = matches!(
                c,
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%'
            );
            if reserved || c.is_control() {
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(stem, "%{byte:02X}");
                }
            } else {
                stem.push(c);
            }
        }

        stem
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Weather document exactly as the remote API returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherPayload(Value);

impl WeatherPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// A payload together with the moment it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub city: CityKey,
    pub fetched_at: NaiveDateTime,
    pub payload: WeatherPayload,
}

/// The three fields shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub city: String,
    pub temperature: f64,
    pub description: String,
}

impl WeatherSummary {
    /// Extract display fields from either the OpenWeather layout
    /// (`name`, `main.temp`, `weather[0].description`) or the flat layout
    /// (`city`, `temp`, `description`).
    pub fn from_payload(payload: &WeatherPayload, requested: &CityKey) -> Result<Self> {
        let doc = payload.as_value();

        let city = doc
            .get("name")
            .or_else(|| doc.get("city"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| requested.name().to_string());

        let temperature = doc
            .pointer("/main/temp")
            .or_else(|| doc.get("temp"))
            .and_then(Value::as_f64)
            .ok_or_else(|| missing_field("temp"))?;

        let description = doc
            .get("weather")
            .and_then(description_of)
            .or_else(|| {
                doc.get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| missing_field("description"))?;

        Ok(Self {
            city,
            temperature,
            description,
        })
    }
}

impl fmt::Display for WeatherSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current weather in {}: {}°C, {}",
            self.city, self.temperature, self.description
        )
    }
}

fn description_of(weather: &Value) -> Option<String> {
    let node = match weather {
        Value::Array(items) => items.first()?,
        other => other,
    };

    match node {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => node.get("description")?.as_str().map(str::to_string),
        _ => None,
    }
}

fn missing_field(field: &str) -> WeatherError {
    WeatherError::MalformedResponse(format!(
        "Missing or unexpected data in API response - '{field}'"
    ))
}
