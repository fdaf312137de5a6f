//! Keyword and vector candidate retrieval.

use std::sync::Arc;

use crate::config::SearchConfig;
use crate::store::{DocumentStore, KnnQuery};

/// Elasticsearch rejects `num_candidates` above this.
const MAX_NUM_CANDIDATES: usize = 10_000;

/// Outcome of one retrieval strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidates {
    /// Ids in the store's ranking order, best first
    Ranked(Vec<String>),
    /// Vector path skipped because no query embedding was available
    NoVector,
    /// The store query itself failed
    Failed(String),
}

impl Candidates {
    /// Ids to feed into fusion; empty unless the query ran.
    pub fn ids(&self) -> &[String] {
        match self {
            Candidates::Ranked(ids) => ids,
            Candidates::NoVector | Candidates::Failed(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    pub fn status(&self) -> &'static str {
        match self {
            Candidates::Ranked(_) => "ranked",
            Candidates::NoVector => "no_vector",
            Candidates::Failed(_) => "failed",
        }
    }
}

#[derive(Clone)]
pub struct CandidateRetriever {
    store: Arc<dyn DocumentStore>,
    knn_oversample: usize,
    knn_min_candidates: usize,
}

impl CandidateRetriever {
    pub fn new(store: Arc<dyn DocumentStore>, config: &SearchConfig) -> Self {
        Self {
            store,
            knn_oversample: config.knn_oversample,
            knn_min_candidates: config.knn_min_candidates,
        }
    }

    /// Fuzzy lexical match on the description field.
    pub async fn keyword(&self, text: &str, top_k: usize) -> Candidates {
        match self.store.keyword_search(text, top_k).await {
            Ok(mut ids) => {
                ids.truncate(top_k);
                Candidates::Ranked(ids)
            }
            Err(e) => {
                tracing::warn!("Keyword retrieval failed: {e}");
                Candidates::Failed(e.to_string())
            }
        }
    }

    /// Nearest neighbours of `vector`. An absent or empty vector yields
    /// [`Candidates::NoVector`] without touching the store.
    pub async fn vector(&self, vector: Option<&[f32]>, top_k: usize) -> Candidates {
        let Some(vector) = vector.filter(|v| !v.is_empty()) else {
            return Candidates::NoVector;
        };

        let query = KnnQuery {
            vector,
            k: top_k,
            num_candidates: self.num_candidates(top_k),
        };
        match self.store.knn_search(query).await {
            Ok(mut ids) => {
                ids.truncate(top_k);
                Candidates::Ranked(ids)
            }
            Err(e) => {
                tracing::warn!("Vector retrieval failed: {e}");
                Candidates::Failed(e.to_string())
            }
        }
    }

    /// Candidate pool for kNN: oversampled, never below `top_k`, capped by the store limit.
    pub fn num_candidates(&self, top_k: usize) -> usize {
        top_k
            .saturating_mul(self.knn_oversample)
            .max(self.knn_min_candidates)
            .min(MAX_NUM_CANDIDATES)
            .max(top_k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, ProductRecord};
    use crate::store::local::LocalStore;
    use crate::store::{CollectionSchema, CollectionStatus, FetchedDocument, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose queries always fail; counts kNN calls.
    #[derive(Default)]
    struct BrokenStore {
        knn_calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for BrokenStore {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Malformed("down".into()))
        }
        async fn ensure_collection(
            &self,
            _schema: &CollectionSchema,
        ) -> Result<CollectionStatus, StoreError> {
            Err(StoreError::Malformed("down".into()))
        }
        async fn keyword_search(&self, _: &str, _: usize) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
        async fn knn_search(&self, _: KnnQuery<'_>) -> Result<Vec<String>, StoreError> {
            self.knn_calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
        async fn get_many(&self, _: &[String]) -> Result<Vec<FetchedDocument>, StoreError> {
            Err(StoreError::Malformed("down".into()))
        }
        async fn upsert(&self, _: &ProductRecord) -> Result<(), StoreError> {
            Err(StoreError::Malformed("down".into()))
        }
    }

    async fn seeded_store() -> Arc<LocalStore> {
        let store = LocalStore::in_memory().unwrap();
        store
            .ensure_collection(&CollectionSchema::products("products", 2))
            .await
            .unwrap();
        for (id, desc, emb) in [
            ("p-1", "leather hiking boots", vec![1.0, 0.0]),
            ("p-2", "trail running shoes", vec![0.8, 0.2]),
            ("p-3", "cotton beach towel", vec![0.0, 1.0]),
        ] {
            store
                .upsert(&ProductRecord {
                    product: Product {
                        product_id: id.into(),
                        description: desc.into(),
                        category: "outdoor".into(),
                        price: 50.0,
                    },
                    embedding: emb,
                })
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_absent_or_empty_vector_skips_store() {
        let store = Arc::new(BrokenStore::default());
        let retriever = CandidateRetriever::new(store.clone(), &SearchConfig::default());

        assert_eq!(retriever.vector(None, 5).await, Candidates::NoVector);
        assert_eq!(retriever.vector(Some(&[]), 5).await, Candidates::NoVector);
        assert_eq!(store.knn_calls.load(Ordering::SeqCst), 0);
        assert!(retriever.vector(None, 5).await.ids().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_distinct_from_no_vector() {
        let store = Arc::new(BrokenStore::default());
        let retriever = CandidateRetriever::new(store.clone(), &SearchConfig::default());

        let vector = retriever.vector(Some(&[0.1, 0.2]), 5).await;
        assert!(matches!(vector, Candidates::Failed(_)));
        assert_eq!(vector.status(), "failed");
        assert!(vector.is_empty());
        assert_eq!(store.knn_calls.load(Ordering::SeqCst), 1);

        let keyword = retriever.keyword("boots", 5).await;
        assert!(matches!(keyword, Candidates::Failed(_)));
    }

    #[tokio::test]
    async fn test_ranked_results_bounded_by_top_k() {
        let retriever = CandidateRetriever::new(seeded_store().await, &SearchConfig::default());

        let vector = retriever.vector(Some(&[1.0, 0.0]), 2).await;
        assert_eq!(vector, Candidates::Ranked(vec!["p-1".into(), "p-2".into()]));

        let keyword = retriever.keyword("hiking boots", 1).await;
        assert_eq!(keyword, Candidates::Ranked(vec!["p-1".into()]));
    }

    #[test]
    fn test_num_candidates_oversamples_with_bounds() {
        let config = SearchConfig {
            knn_oversample: 10,
            knn_min_candidates: 100,
            ..SearchConfig::default()
        };
        let retriever = CandidateRetriever::new(Arc::new(BrokenStore::default()), &config);
        assert_eq!(retriever.num_candidates(5), 100);
        assert_eq!(retriever.num_candidates(50), 500);
        assert_eq!(retriever.num_candidates(5_000), 10_000);
        assert_eq!(retriever.num_candidates(20_000), 20_000);
    }
}
