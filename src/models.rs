//! Data models for the air-quality monitor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---

/// A measured quantity with its own threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    Temperature,
    Humidity,
    Oxygen,
}

impl Kind {
    // ---
    pub const ALL: [Kind; 5] = [
        Kind::Pm25,
        Kind::Pm10,
        Kind::Temperature,
        Kind::Humidity,
        Kind::Oxygen,
    ];

    /// Display name, as shown on gauges and table headers.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Pm25 => "PM2.5",
            Kind::Pm10 => "PM10",
            Kind::Temperature => "Temperature",
            Kind::Humidity => "Humidity",
            Kind::Oxygen => "Oxygen",
        }
    }

    /// Column name of this quantity in the `sensors` table.
    pub fn field(self) -> &'static str {
        match self {
            Kind::Pm25 => "pm25",
            Kind::Pm10 => "pm10",
            Kind::Temperature => "temperature",
            Kind::Humidity => "humidity",
            Kind::Oxygen => "oxygen",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown quantity kind '{0}'")]
pub struct UnknownKind(pub String);

/// Accepts either the display name or the column name, case-insensitively
/// (`"PM2.5"`, `"pm25"`, `"pm2_5"`, `"Humidity"`, `"oxygen"`, ...).
impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '.' | '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "pm25" => Ok(Kind::Pm25),
            "pm10" => Ok(Kind::Pm10),
            "temperature" | "temp" => Ok(Kind::Temperature),
            "humidity" => Ok(Kind::Humidity),
            "oxygen" | "o2" => Ok(Kind::Oxygen),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// Per-channel values of one sample. `None` means the channel produced no value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub oxygen: Option<f64>,
}

impl Measurements {
    pub fn get(&self, kind: Kind) -> Option<f64> {
        match kind {
            Kind::Pm25 => self.pm25,
            Kind::Pm10 => self.pm10,
            Kind::Temperature => self.temperature,
            Kind::Humidity => self.humidity,
            Kind::Oxygen => self.oxygen,
        }
    }
}

/// One sensor sample as held by the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub location: Option<String>,
    pub values: Measurements,
}

impl Reading {
    pub fn value(&self, kind: Kind) -> Option<f64> {
        self.values.get(kind)
    }
}

/// Row of the `sensors` table, as returned by PostgREST or read through sqlx.
#[derive(Debug, Clone, Deserialize, sqlx::FromRow)]
pub struct RawSensorRow {
    // ---
    pub id: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    #[sqlx(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub oxygen: Option<f64>,
}

impl RawSensorRow {
    // ---
    pub fn into_reading(self) -> Reading {
        // ---
        Reading {
            id: self.id,
            timestamp: self.date,
            location: self.location.filter(|name| !name.trim().is_empty()),
            values: Measurements {
                pm25: self.pm25,
                pm10: self.pm10,
                temperature: self.temperature,
                humidity: self.humidity,
                oxygen: self.oxygen,
            },
        }
    }
}

/// One entry of the `locations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocationEntry {
    pub location: String,
}

/// Accept RFC 3339 (`timestamptz`) as well as a bare `timestamp` column,
/// which PostgREST renders without an offset; the latter is taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    // ---
    let raw = String::deserialize(deserializer)?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}
