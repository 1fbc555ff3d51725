use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::response::ApiError;
use crate::http::server::AppState;

#[derive(Serialize)]
pub struct Cleared {
    pub cleared: bool,
    pub network: u64,
}

/// Drop every stored subscription for this network.
pub async fn clear(State(state): State<AppState>) -> Result<Json<Cleared>, ApiError> {
    state.store.clear_subscriptions().await?;
    Ok(Json(Cleared {
        cleared: true,
        network: state.network().0,
    }))
}
