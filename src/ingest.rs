//! Product ingestion: embed the description, then upsert product + vector together.

use thiserror::Error;

use crate::llm::embeddings::{Embedder, EmbeddingError};
use crate::models::{Product, ProductRecord};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid product: {0}")]
    Invalid(String),

    #[error("failed to generate embedding: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("failed to store product: {0}")]
    Store(#[from] StoreError),
}

/// Index one product. Nothing is written unless the embedding succeeded.
pub async fn index_product(
    embedder: &dyn Embedder,
    store: &dyn DocumentStore,
    product: Product,
) -> Result<ProductRecord, IngestError> {
    product.validate().map_err(IngestError::Invalid)?;

    let embedding = embedder.embed(&product.description).await.map_err(|e| {
        e.log(&format!("Embedding failed for product {}", product.product_id));
        e
    })?;

    let record = ProductRecord { product, embedding };
    store.upsert(&record).await?;
    tracing::info!("Indexed product {}", record.id());
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::local::LocalStore;
    use crate::store::CollectionSchema;
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(self.0.clone())
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Status {
                status: 502,
                body: "bad gateway".into(),
            })
        }
    }

    fn lamp() -> Product {
        Product {
            product_id: "lamp-1".into(),
            description: "brass desk lamp".into(),
            category: "lighting".into(),
            price: 45.0,
        }
    }

    async fn store() -> LocalStore {
        let store = LocalStore::in_memory().unwrap();
        store
            .ensure_collection(&CollectionSchema::products("products", 3))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_indexes_product_with_embedding() {
        let store = store().await;
        let record = index_product(&FixedEmbedder(vec![0.1, 0.2, 0.3]), &store, lamp())
            .await
            .unwrap();
        assert_eq!(record.embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        let store = store().await;
        let err = index_product(&DownEmbedder, &store, lamp()).await.unwrap_err();
        assert!(matches!(err, IngestError::Embedding(_)));
        assert!(store.is_empty());
        let fetched = store.get_many(&["lamp-1".to_string()]).await.unwrap();
        assert!(fetched[0].product.is_none());
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_record() {
        let store = store().await;
        index_product(&FixedEmbedder(vec![0.1, 0.2, 0.3]), &store, lamp())
            .await
            .unwrap();

        let mut updated = lamp();
        updated.description = "chrome floor lamp".into();
        assert!(index_product(&DownEmbedder, &store, updated).await.is_err());

        let fetched = store.get_many(&["lamp-1".to_string()]).await.unwrap();
        assert_eq!(
            fetched[0].product.as_ref().unwrap().description,
            "brass desk lamp"
        );
    }

    #[tokio::test]
    async fn test_invalid_product_is_rejected_before_embedding() {
        let store = store().await;
        let mut bad = lamp();
        bad.price = -1.0;
        let err = index_product(&DownEmbedder, &store, bad).await.unwrap_err();
        assert!(matches!(err, IngestError::Invalid(_)));
    }
}
