//! Air-quality dashboard engine.
//!
//! Polls a remote sensor store for the selected monitoring location, keeps a
//! deduplicated per-location cache, classifies readings against health
//! advisory thresholds and builds hourly chart series.
//!
//! Module boundaries follow the Explicit Module Boundary Pattern (EMBP):
//! each module exposes its public surface at its own path, and the
//! re-exports below are the entry points for the binary and integration
//! tests.

pub mod cache;
pub mod classify;
pub mod config;
pub mod hourly;
pub mod models;
pub mod polling;
pub mod routes;
pub mod source;
pub mod thresholds;

pub use cache::LocationCache;
pub use classify::{classify, classify_by_name, Classification};
pub use config::Config;
pub use hourly::{aggregate_hourly, AggregateOptions, BucketMode, HourlyBucket};
pub use models::{Kind, LocationEntry, Measurements, Reading};
pub use polling::{PollSettings, PollState, PollingController, Snapshot};
pub use source::{DataSource, PgSource, RestSource, Source, SourceError};
