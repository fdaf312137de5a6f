//! Document/vector store collaborator.
//!
//! The gateway never talks to a concrete engine directly; every component
//! receives an `Arc<dyn DocumentStore>`. Two backends exist:
//! [`elasticsearch::ElasticsearchStore`] for production and
//! [`local::LocalStore`] (tantivy + in-memory cosine index) for single-process
//! deployments and tests.

pub mod bm25;
pub mod elasticsearch;
pub mod local;
pub mod vector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Product, ProductRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected store response: {0}")]
    Malformed(String),

    #[error("collection does not exist")]
    MissingCollection,

    #[error("document rejected: {0}")]
    Rejected(String),

    #[error("index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("store configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    Cosine,
}

/// Definition of the product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    /// Field searched by keyword retrieval
    pub text_field: String,
    /// Field holding the embedding
    pub vector_field: String,
    pub dims: usize,
    pub similarity: Similarity,
}

impl CollectionSchema {
    pub fn products(name: impl Into<String>, dims: usize) -> Self {
        Self {
            name: name.into(),
            text_field: "description".to_string(),
            vector_field: "embedding".to_string(),
            dims,
            similarity: Similarity::Cosine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Already present; left untouched
    Existing,
    /// Created with the requested schema
    Created,
}

/// One entry of a batch fetch. `product` is None when the id is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub id: String,
    pub product: Option<Product>,
}

/// Nearest-neighbour query over the embedding field.
#[derive(Debug, Clone, Copy)]
pub struct KnnQuery<'a> {
    pub vector: &'a [f32],
    pub k: usize,
    /// Candidate pool examined before truncating to `k`
    pub num_candidates: usize,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Liveness probe
    async fn ping(&self) -> Result<(), StoreError>;

    /// Create the collection if absent. Never modifies an existing collection.
    async fn ensure_collection(
        &self,
        schema: &CollectionSchema,
    ) -> Result<CollectionStatus, StoreError>;

    /// Lexical search over the text field, ids in relevance order.
    async fn keyword_search(&self, text: &str, top_k: usize) -> Result<Vec<String>, StoreError>;

    /// Nearest neighbours by cosine similarity, most similar first.
    async fn knn_search(&self, query: KnnQuery<'_>) -> Result<Vec<String>, StoreError>;

    /// Batch fetch; the returned order is unspecified.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<FetchedDocument>, StoreError>;

    /// Insert or replace by product id.
    async fn upsert(&self, record: &ProductRecord) -> Result<(), StoreError>;
}
