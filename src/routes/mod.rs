use std::sync::Arc;

use axum::Router;
use chrono::FixedOffset;

use crate::{DataSource, PollingController};

mod dashboard;
mod health;
mod locations;

// ---

/// Shared by every route: the store (for location listing), the single
/// polling controller all views read from, and the display zone.
pub struct AppState<S> {
    pub source: Arc<S>,
    pub poller: Arc<PollingController>,
    pub display_offset: FixedOffset,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            poller: Arc::clone(&self.poller),
            display_offset: self.display_offset,
        }
    }
}

pub fn router<S: DataSource>(state: AppState<S>) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(locations::router())
        .merge(health::router())
        .with_state(state)
}
