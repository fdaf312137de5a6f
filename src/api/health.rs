use axum::extract::State;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// GET /health - Routes only exist after bootstrap, so answering at all means ready.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready".to_string(),
        collection: state.config.store.index_name.clone(),
        store: state.store.name().to_string(),
    })
}
