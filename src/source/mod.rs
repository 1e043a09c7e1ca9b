//! Access to the remote sensor-data store.
//!
//! The polling controller only sees the [`DataSource`] trait; which store
//! backs it is decided once at startup (see [`Source`]).

use std::future::Future;

use thiserror::Error;

use crate::models::{LocationEntry, Reading};

mod postgres;
mod rest;

pub use postgres::PgSource;
pub use rest::RestSource;

// ---

/// Failure talking to the store itself.
#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("location '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::DataAccess(e.into())
    }
}

impl From<sqlx::Error> for SourceError {
    fn from(e: sqlx::Error) -> Self {
        SourceError::DataAccess(e.into())
    }
}

/// The queries the dashboard needs from the store.
pub trait DataSource: Send + Sync + 'static {
    /// All monitoring locations.
    fn list_locations(&self) -> impl Future<Output = Result<Vec<LocationEntry>, SourceError>> + Send;

    /// The newest `limit` readings for the location with exactly this name,
    /// newest-first.
    fn fetch_readings(
        &self,
        location: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Reading>, SourceError>> + Send;
}

/// The store selected by configuration.
pub enum Source {
    Rest(RestSource),
    Postgres(PgSource),
}

impl Source {
    pub fn describe(&self) -> &'static str {
        match self {
            Source::Rest(_) => "PostgREST",
            Source::Postgres(_) => "PostgreSQL",
        }
    }
}

impl DataSource for Source {
    async fn list_locations(&self) -> Result<Vec<LocationEntry>, SourceError> {
        match self {
            Source::Rest(source) => source.list_locations().await,
            Source::Postgres(source) => source.list_locations().await,
        }
    }

    async fn fetch_readings(&self, location: &str, limit: u32) -> Result<Vec<Reading>, SourceError> {
        match self {
            Source::Rest(source) => source.fetch_readings(location, limit).await,
            Source::Postgres(source) => source.fetch_readings(location, limit).await,
        }
    }
}
