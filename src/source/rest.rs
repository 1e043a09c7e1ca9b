//! PostgREST client for the hosted store (the protocol Supabase exposes).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use super::{DataAccessError, DataSource, SourceError};
use crate::models::{LocationEntry, RawSensorRow, Reading};

// ---

pub struct RestSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestSource {
    // ---
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, SourceError> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        // ---
        let url = self.table_url(table);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataAccessError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response.json().await?)
    }

    /// `locationId` of the location named exactly `name`.
    async fn resolve_location(&self, name: &str) -> Result<String, SourceError> {
        // ---
        let rows: Vec<Value> = self
            .select(
                "locations",
                &[
                    ("select", "locationId".to_string()),
                    ("location", format!("eq.{name}")),
                ],
            )
            .await?;

        let id = rows
            .first()
            .and_then(|row| row.get("locationId"))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        id.ok_or_else(|| SourceError::NotFound(name.to_string()))
    }
}

impl DataSource for RestSource {
    // ---
    async fn list_locations(&self) -> Result<Vec<LocationEntry>, SourceError> {
        self.select("locations", &[("select", "location".to_string())])
            .await
    }

    async fn fetch_readings(&self, location: &str, limit: u32) -> Result<Vec<Reading>, SourceError> {
        // ---
        let location_id = self.resolve_location(location).await?;

        let rows: Vec<Value> = self
            .select(
                "sensors",
                &[
                    ("select", "*".to_string()),
                    ("locationId", format!("eq.{location_id}")),
                    ("order", "date.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let mut readings = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            match serde_json::from_value::<RawSensorRow>(row) {
                Ok(raw) => readings.push(raw.into_reading()),
                Err(e) => debug!("Skipping sensor row {} for '{}': {}", i, location, e),
            }
        }

        info!("Fetched {} readings for '{}'", readings.len(), location);
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    const KEY: &str = "anon-key";

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("apikey").is_some_and(|v| v == KEY)
            && headers
                .get("authorization")
                .is_some_and(|v| v == &format!("Bearer {KEY}"))
    }

    async fn locations(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        // ---
        if !authorized(&headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "bad key"})));
        }
        match params.get("location").map(String::as_str) {
            None => (
                StatusCode::OK,
                Json(json!([{"location": "USTP-CDO"}, {"location": "Lapasan"}])),
            ),
            Some("eq.USTP-CDO") => (StatusCode::OK, Json(json!([{"locationId": 7}]))),
            Some(_) => (StatusCode::OK, Json(json!([]))),
        }
    }

    async fn sensors(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
        // ---
        assert_eq!(params.get("locationId").map(String::as_str), Some("eq.7"));
        assert_eq!(params.get("order").map(String::as_str), Some("date.desc"));
        assert_eq!(params.get("limit").map(String::as_str), Some("50"));

        Json(json!([
            {"id": 2, "date": "2024-01-01T09:10:00+00:00", "location": "USTP-CDO", "pm25": 40.0},
            {"id": "garbage"},
            {"id": 1, "date": "2024-01-01T08:15:00+00:00", "location": "USTP-CDO", "pm25": 20.0},
        ]))
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}/")
    }

    async fn mock_store() -> RestSource {
        // ---
        let router = Router::new()
            .route("/rest/v1/locations", get(locations))
            .route("/rest/v1/sensors", get(sensors));
        let base = serve(router).await;

        RestSource::new(&base, KEY, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_locations() {
        // ---
        let source = mock_store().await;
        let locations = source.list_locations().await.unwrap();

        assert_eq!(
            locations,
            vec![
                LocationEntry { location: "USTP-CDO".into() },
                LocationEntry { location: "Lapasan".into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_readings_skips_bad_rows() {
        // ---
        let source = mock_store().await;
        let readings = source.fetch_readings("USTP-CDO", 50).await.unwrap();

        let ids: Vec<i64> = readings.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_unknown_location_is_not_found() {
        // ---
        let source = mock_store().await;
        let err = source.fetch_readings("Atlantis", 50).await.unwrap_err();

        assert!(err.is_not_found(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_rejected_key_is_a_data_access_error() {
        // ---
        let router = Router::new().route("/rest/v1/locations", get(locations));
        let base = serve(router).await;
        let source = RestSource::new(&base, "wrong", Duration::from_secs(5)).unwrap();

        match source.list_locations().await {
            Err(SourceError::DataAccess(DataAccessError::Status { status, .. })) => {
                assert_eq!(status, 401)
            }
            other => panic!("expected 401, got {other:?}"),
        }
    }
}
