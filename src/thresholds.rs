//! Health-advisory threshold tables, one per quantity kind.
//!
//! Tables are plain data: contiguous ascending bands covering `[0, +inf)`,
//! each with a category label, display color and cautionary remark. Lookup
//! lives in [`crate::classify`] and never changes when a table does.

use serde::Serialize;

use crate::hourly::{AggregateOptions, BucketMode};
use crate::models::Kind;

// ---

/// One band of a threshold table. Bounds are inclusive; `max` may be infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub min: f64,
    #[serde(serialize_with = "serialize_open_max")]
    pub max: f64,
    pub label: &'static str,
    pub color: &'static str,
    pub remark: &'static str,
}

impl Band {
    pub fn is_open_above(&self) -> bool {
        self.max.is_infinite()
    }

    /// Range as printed in the reference table, e.g. `"26 - 35"` or `"> 91"`.
    pub fn range_text(&self) -> String {
        if self.is_open_above() {
            format!("> {}", self.min)
        } else {
            format!("{} - {}", self.min, self.max)
        }
    }
}

/// `+inf` has no JSON representation; open bands serialize `max` as `null`.
fn serialize_open_max<S>(max: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if max.is_finite() {
        serializer.serialize_some(max)
    } else {
        serializer.serialize_none()
    }
}

/// Ordered bands for one quantity plus where they come from.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ThresholdTable {
    pub source: &'static str,
    pub bands: &'static [Band],
}

impl ThresholdTable {
    /// Lowest value any band accepts.
    pub fn floor(&self) -> f64 {
        self.bands.first().map_or(0.0, |band| band.min)
    }
}

/// Declarative per-kind configuration for the shared engine.
#[derive(Debug, Clone, Copy)]
pub struct KindDescriptor {
    pub kind: Kind,
    pub unit: &'static str,
    pub table: &'static ThresholdTable,
    pub defaults: AggregateOptions,
}

pub fn descriptor(kind: Kind) -> &'static KindDescriptor {
    // ---
    match kind {
        Kind::Pm25 => &PM25,
        Kind::Pm10 => &PM10,
        Kind::Temperature => &TEMPERATURE,
        Kind::Humidity => &HUMIDITY,
        Kind::Oxygen => &OXYGEN,
    }
}

pub fn table(kind: Kind) -> &'static ThresholdTable {
    descriptor(kind).table
}

// ---

const DENR: &str = "Department of Environment and Natural Resources (DENR)";
const WHO_ASHRAE: &str = "World Health Organization & ASHRAE";

const GREEN: &str = "#14bb00";
const YELLOW: &str = "#e9cf00";
const ORANGE: &str = "#e07a00";
const DARK_RED: &str = "#8B0000";

const SAFE_AIR: &str = "Safe air levels; no action needed.";
const SENSITIVE: &str = "Some pollutants may be a concern for sensitive individuals.";
const LIMIT_EXERTION: &str =
    "People with respiratory disease, such as asthma, should limit outdoor exertion.";
const RESTRICT_VEHICLES: &str = "Pedestrians should avoid heavy traffic areas. People with heart or respiratory disease such as asthma should stay indoors and rest as much as possible. Unnecessary trips should be postponed. People should voluntarily restrict the use of vehicles.";
const CURTAIL_INDUSTRY: &str = "Pedestrians should avoid heavy traffic areas. People with heart or respiratory disease such as asthma should stay indoors and rest as much as possible. Unnecessary trips should be postponed. Motor vehicle use may be restricted. Industrial activities may be curtailed.";
const EMERGENCY: &str = "Everyone should remain indoors (keeping windows and doors closed). Motor vehicle use should be prohibited except for emergency situations. Industrial activities, except that which is vital for public safety and health, should be curtailed.";

const fn band(
    min: f64,
    max: f64,
    label: &'static str,
    color: &'static str,
    remark: &'static str,
) -> Band {
    Band {
        min,
        max,
        label,
        color,
        remark,
    }
}

static PM25_TABLE: ThresholdTable = ThresholdTable {
    source: DENR,
    bands: &[
        band(0.0, 25.0, "Good", GREEN, SAFE_AIR),
        band(26.0, 35.0, "Fair", YELLOW, SENSITIVE),
        band(36.0, 45.0, "Unhealthy", ORANGE, LIMIT_EXERTION),
        band(46.0, 55.0, "Very Unhealthy", "red", RESTRICT_VEHICLES),
        band(56.0, 90.0, "Acutely Unhealthy", "purple", CURTAIL_INDUSTRY),
        band(91.0, f64::INFINITY, "Emergency", DARK_RED, EMERGENCY),
    ],
};

static PM10_TABLE: ThresholdTable = ThresholdTable {
    source: DENR,
    bands: &[
        band(0.0, 54.0, "Good", GREEN, SAFE_AIR),
        band(55.0, 154.0, "Fair", YELLOW, SENSITIVE),
        band(155.0, 254.0, "Unhealthy", ORANGE, LIMIT_EXERTION),
        band(255.0, 354.0, "Very Unhealthy", "red", RESTRICT_VEHICLES),
        band(355.0, 424.0, "Acutely Unhealthy", "purple", CURTAIL_INDUSTRY),
        band(425.0, f64::INFINITY, "Emergency", DARK_RED, EMERGENCY),
    ],
};

static TEMPERATURE_TABLE: ThresholdTable = ThresholdTable {
    source: WHO_ASHRAE,
    bands: &[
        band(0.0, 33.0, "Good", GREEN, "Safe temperature levels; no action needed."),
        band(34.0, 41.0, "Caution", "#f9c71d", "Reduce prolonged exposure and stay hydrated."),
        band(42.0, 54.0, "Danger", "#fdb114", "Avoid outdoor activities; risk of heat-related illnesses."),
        band(55.0, f64::INFINITY, "Extreme", "red", "Severe risk: Stay indoors; heatstroke possible."),
    ],
};

static HUMIDITY_TABLE: ThresholdTable = ThresholdTable {
    source: WHO_ASHRAE,
    bands: &[
        band(0.0, 25.0, "Poor", "#FF4500", "Excessively dry; potential for skin irritation and dehydration. Use humidifiers."),
        band(26.0, 30.0, "Fair", YELLOW, "Dry conditions; monitor hydration levels and consider humidification."),
        band(31.0, 60.0, "Good", GREEN, "Comfortable range; no action needed."),
        band(61.0, 70.0, "Fair", YELLOW, "Slight discomfort; may feel sticky. Ventilation recommended."),
        band(71.0, f64::INFINITY, "Poor", "red", "Excessively humid; risk of mold growth and discomfort. Use dehumidifiers."),
    ],
};

static OXYGEN_TABLE: ThresholdTable = ThresholdTable {
    source: WHO_ASHRAE,
    bands: &[
        band(0.0, 19.4, "Low", "red", "Risk of hypoxia; ensure oxygen supply and ventilation."),
        band(19.5, f64::INFINITY, "Good", GREEN, "Safe oxygen levels; no action needed."),
    ],
};

// PM2.5 screens chart only the latest day; the others chart everything fetched.
const LATEST_DAY: AggregateOptions = AggregateOptions {
    mode: BucketMode::Sparse,
    latest_date_only: true,
};
const ALL_FETCHED: AggregateOptions = AggregateOptions {
    mode: BucketMode::Sparse,
    latest_date_only: false,
};

static PM25: KindDescriptor = KindDescriptor {
    kind: Kind::Pm25,
    unit: "µg/m³",
    table: &PM25_TABLE,
    defaults: LATEST_DAY,
};

static PM10: KindDescriptor = KindDescriptor {
    kind: Kind::Pm10,
    unit: "µg/m³",
    table: &PM10_TABLE,
    defaults: ALL_FETCHED,
};

static TEMPERATURE: KindDescriptor = KindDescriptor {
    kind: Kind::Temperature,
    unit: "°C",
    table: &TEMPERATURE_TABLE,
    defaults: ALL_FETCHED,
};

static HUMIDITY: KindDescriptor = KindDescriptor {
    kind: Kind::Humidity,
    unit: "%",
    table: &HUMIDITY_TABLE,
    defaults: ALL_FETCHED,
};

static OXYGEN: KindDescriptor = KindDescriptor {
    kind: Kind::Oxygen,
    unit: "%",
    table: &OXYGEN_TABLE,
    defaults: ALL_FETCHED,
};
