//! Product lookup handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use vshop_models::{ProductResult, VideoId};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    /// Playback position in seconds
    pub time: Option<f64>,
}

/// Products visible near a playback position.
///
/// Unknown videos are a 404; videos still processing return an empty list.
pub async fn get_results(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<Vec<ProductResult>>> {
    let job = state.registry.get(&VideoId::from(video_id)).await?;
    let products = state.store().get(&job, query.time.unwrap_or(0.0)).await;
    Ok(Json(products.into_iter().map(ProductResult::from).collect()))
}
