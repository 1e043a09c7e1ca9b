use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::DataSource;

// ---

pub fn router<S: DataSource>() -> Router<AppState<S>> {
    // ---
    Router::new()
        .route("/locations", get(list_locations::<S>))
        .route(
            "/location",
            get(active_location::<S>)
                .put(select_location::<S>)
                .delete(stop_polling::<S>),
        )
}

#[derive(Debug, Serialize, Deserialize)]
struct LocationBody {
    location: Option<String>,
}

/// `GET /locations`: every monitoring site known to the store.
async fn list_locations<S: DataSource>(State(state): State<AppState<S>>) -> impl IntoResponse {
    // ---
    match state.source.list_locations().await {
        Ok(locations) => (StatusCode::OK, Json(locations)).into_response(),
        Err(e) => {
            error!("Failed to list locations: {}", e);
            (StatusCode::BAD_GATEWAY, Json("Failed to list locations")).into_response()
        }
    }
}

/// `GET /location`: the location currently polled, `null` when idle.
async fn active_location<S: DataSource>(State(state): State<AppState<S>>) -> Json<LocationBody> {
    let snapshot = state.poller.snapshot();
    Json(LocationBody {
        location: snapshot.active_location().map(str::to_string),
    })
}

/// `PUT /location`: switch polling to another location.
async fn select_location<S: DataSource>(
    State(state): State<AppState<S>>,
    Json(body): Json<LocationBody>,
) -> impl IntoResponse {
    // ---
    let Some(location) = body.location.filter(|l| !l.trim().is_empty()) else {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json("location is required")).into_response();
    };

    info!("PUT /location - '{}'", location);
    match state.poller.set_location(location) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("{}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json("Polling is not running")).into_response()
        }
    }
}

/// `DELETE /location`: stop polling; cached readings stay available.
async fn stop_polling<S: DataSource>(State(state): State<AppState<S>>) -> impl IntoResponse {
    // ---
    info!("DELETE /location");
    match state.poller.stop() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!("{}", e);
            (StatusCode::SERVICE_UNAVAILABLE, Json("Polling is not running")).into_response()
        }
    }
}
