//! Product bundle handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::info;
use vshop_models::{build_bundles, Bundle, VideoId};

use crate::error::ApiResult;
use crate::handlers::results::ResultsQuery;
use crate::state::AppState;

/// Bundles of complementary products visible near a playback position.
///
/// Unknown videos are a 404; frames without complementary products return an
/// empty list.
pub async fn get_bundles(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<Vec<Bundle>>> {
    let id = VideoId::from(video_id);
    let job = state.registry.get(&id).await?;
    let time = query.time.unwrap_or(0.0);

    let products = state.store().get(&job, time).await;
    let bundles = build_bundles(&products, &id, time);
    info!(video_id = %id, time, bundles = bundles.len(), "Built product bundles");

    Ok(Json(bundles))
}
