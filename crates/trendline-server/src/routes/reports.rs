use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use trendline_core::reports::ReportKind;
use trendline_core::request::{ReportQuery, ReportRequest};

use crate::{error::AppError, state::AppState};

/// `GET /api/reports/{kind}` - Run one report.
///
/// Validation problems are a 400; an unreachable provider still answers
/// 200 with a zero-valued payload of the usual shape.
#[tracing::instrument(skip(state, query))]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let kind = ReportKind::parse(&kind)?;
    let request = ReportRequest::try_from(query)?;

    let payload = state.engine.run(kind, &request).await?;
    Ok(Json(json!({ "data": payload })))
}
