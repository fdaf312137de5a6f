use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::ApiError;
use crate::models::{SearchRequest, SearchResponse};
use crate::state::AppState;

/// POST /search - Hybrid search pipeline:
///   1. Keyword retrieval on the raw query, alongside embedding + kNN
///   2. RRF fusion of the two ranked id lists (keyword first on ties)
///   3. Top `top_k` fused ids hydrated in one batch, in fused order
///
/// Any text is a valid query, including an empty one. A missing embedding
/// degrades to keyword-only results. Only a failed hydration fetch or a
/// malformed body surfaces as an error.
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let query = req.query;
    let limits = &state.config.search;
    let top_k = req
        .top_k
        .map_or(limits.default_top_k, |k| k.min(limits.max_top_k));

    let outcome = state.search.search(&query, top_k).await?;

    Ok(Json(SearchResponse {
        query,
        total_keyword_hits: outcome.keyword.len(),
        total_vector_hits: outcome.vector.len(),
        vector_status: outcome.vector.status().to_string(),
        results: outcome.products,
    }))
}
