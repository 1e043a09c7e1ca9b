//! Hourly averages for line and bar charts.

use chrono::{NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::{Kind, Reading};

// ---

/// How hours without data are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketMode {
    /// Only hours with at least one value.
    #[default]
    Sparse,
    /// All 24 hours, empty ones as zero.
    Dense,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub mode: BucketMode,
    /// Restrict to the most recent calendar date present in the input.
    pub latest_date_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub label: String,
    pub average: f64,
    /// Number of values averaged; zero for a filled hour.
    pub samples: usize,
}

/// `0 -> "12 AM"`, `9 -> "9 AM"`, `12 -> "12 PM"`, `23 -> "11 PM"`.
pub fn hour_label(hour: u32) -> String {
    // ---
    let suffix = if hour % 24 >= 12 { "PM" } else { "AM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12} {suffix}")
}

/// Most recent calendar date (in `tz`) among `readings`.
pub fn latest_date<Tz: TimeZone>(readings: &[Reading], tz: &Tz) -> Option<NaiveDate> {
    readings
        .iter()
        .map(|r| r.timestamp)
        .max()
        .map(|ts| ts.with_timezone(tz).date_naive())
}

/// Average the `kind` values of `readings` per local hour-of-day.
///
/// Null values are skipped; an hour whose readings are all null counts as
/// empty. Output is ascending by hour. Pure, so safe to call on every tick.
pub fn aggregate_hourly<Tz: TimeZone>(
    readings: &[Reading],
    kind: Kind,
    options: AggregateOptions,
    tz: &Tz,
) -> Vec<HourlyBucket> {
    // ---
    let day = if options.latest_date_only {
        latest_date(readings, tz)
    } else {
        None
    };

    // (sum, count) per hour
    let mut totals = [(0.0_f64, 0_usize); 24];

    for reading in readings {
        let local = reading.timestamp.with_timezone(tz);
        if day.is_some_and(|d| local.date_naive() != d) {
            continue;
        }
        if let Some(value) = reading.value(kind) {
            let slot = &mut totals[local.hour() as usize];
            slot.0 += value;
            slot.1 += 1;
        }
    }

    (0u32..24)
        .zip(totals)
        .filter(|(_, (_, count))| options.mode == BucketMode::Dense || *count > 0)
        .map(|(hour, (sum, count))| HourlyBucket {
            hour,
            label: hour_label(hour),
            average: if count > 0 { sum / count as f64 } else { 0.0 },
            samples: count,
        })
        .collect()
}
