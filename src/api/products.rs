use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::ApiError;
use crate::ingest;
use crate::models::{IndexResponse, Product};
use crate::state::AppState;

/// POST /index-product - Embed and upsert one product, keyed by `product_id`.
pub async fn index_product(
    State(state): State<AppState>,
    payload: Result<Json<Product>, JsonRejection>,
) -> Result<(StatusCode, Json<IndexResponse>), ApiError> {
    let Json(product) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let record = ingest::index_product(state.embedder.as_ref(), state.store.as_ref(), product).await?;

    Ok((
        StatusCode::CREATED,
        Json(IndexResponse {
            status: "indexed".to_string(),
            product_id: record.product.product_id,
        }),
    ))
}
