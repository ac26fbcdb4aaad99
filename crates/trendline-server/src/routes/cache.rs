use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::{error::AppError, state::AppState};

/// `POST /api/cache/flush` - Drop every cached report.
pub async fn flush_cache(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    state.engine.cache().flush().await?;
    info!("report cache flushed");
    Ok(Json(json!({ "data": { "flushed": true } })))
}
