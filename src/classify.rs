//! Reading classification against the per-kind threshold tables.

use serde::Serialize;

use crate::models::Kind;
use crate::thresholds::{self, Band};

// ---

pub const NEUTRAL_COLOR: &str = "grey";
pub const NO_DATA_REMARK: &str = "No data available";

/// Category, display color and cautionary remark for one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub label: &'static str,
    pub color: &'static str,
    pub remark: &'static str,
}

impl Classification {
    /// Result for an absent value.
    pub const NO_DATA: Classification = Classification {
        label: "No data",
        color: NEUTRAL_COLOR,
        remark: NO_DATA_REMARK,
    };

    /// Result for a value (or kind) no band accepts.
    pub const UNKNOWN: Classification = Classification {
        label: "Unknown",
        color: NEUTRAL_COLOR,
        remark: NO_DATA_REMARK,
    };

    pub fn is_fallback(&self) -> bool {
        *self == Self::NO_DATA || *self == Self::UNKNOWN
    }
}

impl From<&Band> for Classification {
    fn from(band: &Band) -> Self {
        Classification {
            label: band.label,
            color: band.color,
            remark: band.remark,
        }
    }
}

/// Classify `value` for `kind`.
///
/// Bands are scanned in ascending order and the first one whose upper bound
/// is `>= value` wins, so a value sitting exactly on a shared edge belongs to
/// the lower band (PM2.5 `25.0` is "Good", `25.0001` is "Fair"). Values in the
/// gaps between printed bounds (`25.5`) fall into the next band up.
///
/// Total over its inputs: `None` yields [`Classification::NO_DATA`]; negative
/// values and NaN yield [`Classification::UNKNOWN`].
pub fn classify(kind: Kind, value: Option<f64>) -> Classification {
    // ---
    let Some(value) = value else {
        return Classification::NO_DATA;
    };

    let table = thresholds::table(kind);
    if value.is_nan() || value < table.floor() {
        tracing::trace!(%kind, value, "value below table floor");
        return Classification::UNKNOWN;
    }

    table
        .bands
        .iter()
        .find(|band| value <= band.max)
        .map(Classification::from)
        .unwrap_or(Classification::UNKNOWN)
}

/// Like [`classify`], for callers holding a kind name rather than a [`Kind`].
/// Unrecognised names classify as [`Classification::UNKNOWN`] (or `NO_DATA`
/// when the value is absent).
pub fn classify_by_name(kind: &str, value: Option<f64>) -> Classification {
    // ---
    match (kind.parse::<Kind>(), value) {
        (_, None) => Classification::NO_DATA,
        (Ok(kind), value) => classify(kind, value),
        (Err(e), _) => {
            tracing::debug!("{}", e);
            Classification::UNKNOWN
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn label(kind: Kind, value: f64) -> &'static str {
        classify(kind, Some(value)).label
    }

    #[test]
    fn test_boundary_values_take_the_lower_band() {
        // ---
        assert_eq!(label(Kind::Pm25, 25.0), "Good");
        assert_eq!(label(Kind::Pm25, 25.01), "Fair");
        assert_eq!(label(Kind::Pm25, 25.0001), "Fair");
        assert_eq!(label(Kind::Pm10, 54.0), "Good");
        assert_eq!(label(Kind::Pm10, 55.0), "Fair");
        assert_eq!(label(Kind::Oxygen, 19.4), "Low");
        assert_eq!(label(Kind::Oxygen, 19.5), "Good");
    }

    #[test]
    fn test_every_band_edge_belongs_to_its_band() {
        // ---
        for kind in Kind::ALL {
            for band in thresholds::table(kind).bands {
                let at_min = classify(kind, Some(band.min));
                assert_eq!(at_min.label, band.label, "{kind} min {}", band.min);

                if !band.is_open_above() {
                    let at_max = classify(kind, Some(band.max));
                    assert_eq!(at_max.label, band.label, "{kind} max {}", band.max);
                }
            }
        }
    }

    #[test]
    fn test_values_between_printed_bounds_go_up() {
        // ---
        assert_eq!(label(Kind::Pm25, 35.5), "Unhealthy");
        assert_eq!(label(Kind::Humidity, 60.5), "Fair");
        assert_eq!(label(Kind::Temperature, 33.9), "Caution");
    }

    #[test]
    fn test_missing_value_is_no_data_for_every_kind() {
        // ---
        for kind in Kind::ALL {
            let result = classify(kind, None);
            assert_eq!(result, Classification::NO_DATA);
            assert_eq!(result.label, "No data");
            assert_eq!(result.color, NEUTRAL_COLOR);
            assert_eq!(result.remark, "No data available");
        }
    }

    #[test]
    fn test_out_of_domain_values_fail_open() {
        // ---
        assert_eq!(classify(Kind::Pm25, Some(-1.0)), Classification::UNKNOWN);
        assert_eq!(classify(Kind::Humidity, Some(f64::NAN)), Classification::UNKNOWN);
        assert!(classify(Kind::Oxygen, Some(-0.1)).is_fallback());
    }

    #[test]
    fn test_huge_values_land_in_the_open_band() {
        // ---
        assert_eq!(label(Kind::Pm25, 1.0e9), "Emergency");
        assert_eq!(label(Kind::Temperature, f64::INFINITY), "Extreme");
    }

    #[test]
    fn test_dashboard_colors() {
        // ---
        let good = classify(Kind::Pm25, Some(25.0));
        assert_eq!((good.label, good.color), ("Good", "#14bb00"));

        let unhealthy = classify(Kind::Pm25, Some(40.0));
        assert_eq!((unhealthy.label, unhealthy.color), ("Unhealthy", "#e07a00"));
        assert!(unhealthy.remark.contains("limit outdoor exertion"));

        let humid = classify(Kind::Humidity, Some(85.0));
        assert_eq!((humid.label, humid.color), ("Poor", "red"));
    }

    #[test]
    fn test_classify_by_name() {
        // ---
        assert_eq!(classify_by_name("PM2.5", Some(30.0)).label, "Fair");
        assert_eq!(classify_by_name("temperature", Some(45.0)).label, "Danger");
        assert_eq!(classify_by_name("ozone", Some(10.0)), Classification::UNKNOWN);
        assert_eq!(classify_by_name("ozone", None), Classification::NO_DATA);
    }
}
