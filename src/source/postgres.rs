//! Direct PostgreSQL access to the same `locations` / `sensors` tables.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::{DataSource, SourceError};
use crate::models::{LocationEntry, RawSensorRow, Reading};

// ---

pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    // ---
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self, SourceError> {
        // ---
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;

        Ok(Self { pool })
    }
}

impl DataSource for PgSource {
    // ---
    async fn list_locations(&self) -> Result<Vec<LocationEntry>, SourceError> {
        // ---
        let rows = sqlx::query_as::<_, LocationEntry>(r#"SELECT location FROM locations"#)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn fetch_readings(&self, location: &str, limit: u32) -> Result<Vec<Reading>, SourceError> {
        // ---
        let location_id: Option<String> = sqlx::query_scalar(
            r#"SELECT "locationId"::text FROM locations WHERE location = $1 LIMIT 1"#,
        )
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        let Some(location_id) = location_id else {
            return Err(SourceError::NotFound(location.to_string()));
        };

        // Casts keep decoding independent of the exact column types upstream.
        let rows = sqlx::query_as::<_, RawSensorRow>(
            r#"
            SELECT
                id::int8                AS id,
                date::timestamptz       AS date,
                location::text          AS location,
                pm25::float8            AS pm25,
                pm10::float8            AS pm10,
                temperature::float8     AS temperature,
                humidity::float8        AS humidity,
                oxygen::float8          AS oxygen
            FROM sensors
            WHERE "locationId"::text = $1
            ORDER BY date DESC
            LIMIT $2
            "#,
        )
        .bind(&location_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        info!("Fetched {} readings for '{}'", rows.len(), location);
        Ok(rows.into_iter().map(RawSensorRow::into_reading).collect())
    }
}
