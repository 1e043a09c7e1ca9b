use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::AppState;
use crate::polling::Snapshot;
use crate::thresholds::{self, Band};
use crate::{
    aggregate_hourly, classify, classify_by_name, AggregateOptions, BucketMode, Classification,
    DataSource, HourlyBucket, Kind,
};

// ---

/// Table rows shown when the list is collapsed / expanded.
const COLLAPSED_ROWS: usize = 1;
const MAX_ROWS: usize = 20;

pub fn router<S: DataSource>() -> Router<AppState<S>> {
    // ---
    Router::new()
        .route("/dashboard/{kind}", get(dashboard::<S>))
        .route("/thresholds/{kind}", get(thresholds_table))
        .route("/classify", get(classify_value))
}

/// Query parameters for `/dashboard/{kind}`; unset fields use the kind's defaults.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    mode: Option<BucketMode>,
    latest_date_only: Option<bool>,
    rows: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CurrentValue {
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub classification: Classification,
}

#[derive(Debug, Serialize)]
pub struct TableRow {
    pub id: i64,
    pub timestamp: DateTime<FixedOffset>,
    pub value: Option<f64>,
    pub classification: Classification,
}

/// Everything one pollutant view renders.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub location: Option<String>,
    pub kind: Kind,
    pub unit: &'static str,
    pub current: CurrentValue,
    pub hourly: Vec<HourlyBucket>,
    pub rows: Vec<TableRow>,
    pub cached: usize,
    pub last_merged_at: Option<DateTime<Utc>>,
}

/// Build the view of `kind` for the active location of `snapshot`.
pub fn dashboard_view(
    snapshot: &Snapshot,
    kind: Kind,
    options: AggregateOptions,
    rows: usize,
    tz: &FixedOffset,
) -> DashboardView {
    // ---
    let readings = snapshot.active_readings();
    let latest = readings.first();

    let current = CurrentValue {
        value: latest.and_then(|r| r.value(kind)),
        timestamp: latest.map(|r| r.timestamp.with_timezone(tz)),
        classification: classify(kind, latest.and_then(|r| r.value(kind))),
    };

    let rows = readings
        .iter()
        .take(rows.min(MAX_ROWS))
        .map(|r| TableRow {
            id: r.id,
            timestamp: r.timestamp.with_timezone(tz),
            value: r.value(kind),
            classification: classify(kind, r.value(kind)),
        })
        .collect();

    DashboardView {
        location: snapshot.active_location().map(str::to_string),
        kind,
        unit: thresholds::descriptor(kind).unit,
        current,
        hourly: aggregate_hourly(readings, kind, options, tz),
        rows,
        cached: readings.len(),
        last_merged_at: snapshot.last_merged_at,
    }
}

/// `GET /dashboard/{kind}`
async fn dashboard<S: DataSource>(
    Path(kind): Path<String>,
    Query(params): Query<DashboardQuery>,
    State(state): State<AppState<S>>,
) -> impl IntoResponse {
    // ---
    let Ok(kind) = kind.parse::<Kind>() else {
        return (StatusCode::NOT_FOUND, Json("Unknown quantity kind")).into_response();
    };

    let defaults = thresholds::descriptor(kind).defaults;
    let options = AggregateOptions {
        mode: params.mode.unwrap_or(defaults.mode),
        latest_date_only: params.latest_date_only.unwrap_or(defaults.latest_date_only),
    };
    debug!("GET /dashboard/{} - {:?}", kind, options);

    let snapshot = state.poller.snapshot();
    let view = dashboard_view(
        &snapshot,
        kind,
        options,
        params.rows.unwrap_or(COLLAPSED_ROWS),
        &state.display_offset,
    );

    info!(
        "GET /dashboard/{} - {} cached readings for {:?}",
        kind, view.cached, view.location
    );
    (StatusCode::OK, Json(view)).into_response()
}

#[derive(Debug, Serialize)]
struct ThresholdView {
    kind: Kind,
    unit: &'static str,
    source: &'static str,
    bands: Vec<BandView>,
}

#[derive(Debug, Serialize)]
struct BandView {
    #[serde(flatten)]
    band: Band,
    range: String,
}

/// `GET /thresholds/{kind}`: the reference table behind the classification.
async fn thresholds_table(Path(kind): Path<String>) -> impl IntoResponse {
    // ---
    let Ok(kind) = kind.parse::<Kind>() else {
        return (StatusCode::NOT_FOUND, Json("Unknown quantity kind")).into_response();
    };

    let descriptor = thresholds::descriptor(kind);
    let view = ThresholdView {
        kind,
        unit: descriptor.unit,
        source: descriptor.table.source,
        bands: descriptor
            .table
            .bands
            .iter()
            .map(|band| BandView {
                band: *band,
                range: band.range_text(),
            })
            .collect(),
    };
    (StatusCode::OK, Json(view)).into_response()
}

#[derive(Debug, Deserialize)]
struct ClassifyQuery {
    kind: String,
    value: Option<f64>,
}

/// `GET /classify?kind=..&value=..`: never fails, unknown kinds classify as "Unknown".
async fn classify_value(Query(params): Query<ClassifyQuery>) -> Json<Classification> {
    Json(classify_by_name(&params.kind, params.value))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Measurements;
    use crate::polling::PollState;
    use crate::LocationCache;

    fn reading(id: i64, ts: &str, pm25: Option<f64>) -> crate::Reading {
        // ---
        crate::Reading {
            id,
            timestamp: ts.parse().unwrap(),
            location: Some("USTP-CDO".into()),
            values: Measurements {
                pm25,
                humidity: Some(55.0),
                ..Default::default()
            },
        }
    }

    fn snapshot() -> Snapshot {
        // ---
        let batch = vec![
            reading(3, "2024-01-01T09:10:00Z", Some(40.0)),
            reading(2, "2024-01-01T08:45:00Z", Some(30.0)),
            reading(1, "2024-01-01T08:15:00Z", Some(20.0)),
        ];
        Snapshot {
            state: PollState::Polling {
                location: "USTP-CDO".into(),
            },
            cache: LocationCache::default().merge("USTP-CDO", &batch),
            last_merged_at: None,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_view_for_active_location() {
        // ---
        let options = thresholds::descriptor(Kind::Pm25).defaults;
        let view = dashboard_view(&snapshot(), Kind::Pm25, options, 20, &utc());

        assert_eq!(view.location.as_deref(), Some("USTP-CDO"));
        assert_eq!(view.current.value, Some(40.0));
        assert_eq!(view.current.classification.label, "Unhealthy");
        assert_eq!(view.unit, "µg/m³");
        assert_eq!(view.cached, 3);
        assert_eq!(view.rows.len(), 3);
        assert_eq!(view.rows[2].classification.label, "Good");

        let hours: Vec<(&str, f64)> = view
            .hourly
            .iter()
            .map(|b| (b.label.as_str(), b.average))
            .collect();
        assert_eq!(hours, vec![("8 AM", 25.0), ("9 AM", 40.0)]);
    }

    #[test]
    fn test_rows_are_capped() {
        // ---
        let options = AggregateOptions::default();
        let snapshot = snapshot();

        assert_eq!(dashboard_view(&snapshot, Kind::Pm25, options, 1, &utc()).rows.len(), 1);
        assert_eq!(dashboard_view(&snapshot, Kind::Pm25, options, 0, &utc()).rows.len(), 0);

        let batch: Vec<_> = (10..50)
            .rev()
            .map(|id| reading(id, "2024-01-02T10:00:00Z", Some(1.0)))
            .collect();
        let big = Snapshot {
            cache: snapshot.cache.merge("USTP-CDO", &batch),
            ..snapshot
        };
        assert_eq!(dashboard_view(&big, Kind::Pm25, options, 500, &utc()).rows.len(), MAX_ROWS);
    }

    #[test]
    fn test_idle_view_has_no_data() {
        // ---
        let idle = Snapshot {
            state: PollState::Idle,
            ..snapshot()
        };
        let dense = AggregateOptions {
            mode: BucketMode::Dense,
            latest_date_only: false,
        };
        let view = dashboard_view(&idle, Kind::Oxygen, dense, 1, &utc());

        assert_eq!(view.location, None);
        assert_eq!(view.current.classification, Classification::NO_DATA);
        assert!(view.rows.is_empty());
        assert_eq!(view.hourly.len(), 24);
    }

    #[test]
    fn test_missing_channel_is_no_data() {
        // ---
        let view = dashboard_view(&snapshot(), Kind::Pm10, AggregateOptions::default(), 5, &utc());

        assert_eq!(view.current.value, None);
        assert_eq!(view.current.classification.label, "No data");
        assert!(view.hourly.is_empty());
    }
}
