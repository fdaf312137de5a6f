//! HTTP surface. Routes are only mounted once bootstrap has reached `Ready`.

pub mod health;
pub mod products;
pub mod search;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ingest::IngestError;
use crate::state::AppState;
use crate::store::StoreError;

/// Handler error rendered as `{"error": <class>, "detail": <message>}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Embedding failed during ingestion; carries the cause class
    Embedding { cause: &'static str, detail: String },
    Store(StoreError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            ApiError::Embedding { cause, detail } => {
                (StatusCode::INTERNAL_SERVER_ERROR, cause, detail.clone())
            }
            ApiError::Store(e) => (StatusCode::BAD_GATEWAY, "store_error", e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, class, detail) = self.parts();
        (status, Json(json!({ "error": class, "detail": detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Invalid(msg) => ApiError::BadRequest(msg),
            IngestError::Embedding(e) => ApiError::Embedding {
                cause: e.cause(),
                detail: format!("failed to generate embedding: {e}"),
            },
            IngestError::Store(e) => ApiError::Store(e),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/index-product", post(products::index_product))
        .route("/search", post(search::search))
        .route("/health", get(health::health))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{o}'");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::llm::embeddings::{Embedder, EmbeddingError};
    use crate::state::AppState;
    use crate::store::local::LocalStore;
    use crate::store::{CollectionSchema, DocumentStore};

    /// Bag-of-letters embedding: deterministic and needs no service.
    pub struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut v = vec![0.0f32; 4];
            for (i, c) in text.chars().filter(|c| c.is_ascii_alphabetic()).enumerate() {
                v[(c as usize + i) % 4] += 1.0;
            }
            Ok(v)
        }
    }

    pub struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::NotConfigured)
        }
    }

    pub async fn state_with(embedder: Arc<dyn Embedder>) -> AppState {
        let mut config = Config::default();
        config.embedding.dims = 4;
        config.store.backend = "local".into();
        let store = LocalStore::in_memory().unwrap();
        store
            .ensure_collection(&CollectionSchema::products(&config.store.index_name, 4))
            .await
            .unwrap();
        AppState::with_components(config, Arc::new(store), embedder)
    }

    pub async fn call(
        state: AppState,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = super::router(state).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }
}
