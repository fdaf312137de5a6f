use std::sync::Arc;

use crate::config::SearchConfig;
use crate::llm::embeddings::Embedder;
use crate::models::Product;
use crate::search::fusion::fuse;
use crate::search::hydrate::hydrate;
use crate::search::retriever::{CandidateRetriever, Candidates};
use crate::store::{DocumentStore, StoreError};

/// Result of one hybrid search, with the per-strategy outcomes kept for diagnostics.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub products: Vec<Product>,
    pub keyword: Candidates,
    pub vector: Candidates,
}

/// Keyword + vector retrieval fused with RRF, then hydrated.
///
/// Pipeline:
/// 1. Keyword retrieval on the raw text, concurrently with
///    embedding the query and running kNN on the result.
/// 2. Reciprocal rank fusion of the two id lists (keyword list first, so it
///    wins score ties).
/// 3. Keep the top `top_k` fused ids and fetch their documents in one batch.
#[derive(Clone)]
pub struct HybridSearch {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    retriever: CandidateRetriever,
    rrf_k: f64,
}

impl HybridSearch {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            retriever: CandidateRetriever::new(store.clone(), config),
            store,
            embedder,
            rrf_k: config.rrf_k,
        }
    }

    /// Only hydration can fail; retrieval problems degrade to empty candidate lists.
    /// `top_k == 0` asks for nothing and touches neither collaborator.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<SearchOutcome, StoreError> {
        if top_k == 0 {
            return Ok(SearchOutcome {
                products: Vec::new(),
                keyword: Candidates::Ranked(Vec::new()),
                vector: Candidates::Ranked(Vec::new()),
            });
        }

        let keyword = self.retriever.keyword(query, top_k);
        let vector = async {
            let embedding = match self.embedder.embed(query).await {
                Ok(v) => Some(v),
                Err(e) => {
                    e.log("Query embedding unavailable, skipping vector retrieval");
                    None
                }
            };
            self.retriever.vector(embedding.as_deref(), top_k).await
        };
        let (keyword, vector) = tokio::join!(keyword, vector);

        let mut fused = fuse(&[keyword.ids(), vector.ids()], self.rrf_k);
        fused.truncate(top_k);

        let products = hydrate(self.store.as_ref(), &fused).await?;
        tracing::info!(
            keyword_hits = keyword.len(),
            vector_hits = vector.len(),
            vector_status = vector.status(),
            results = products.len(),
            "Search for '{query}'"
        );

        Ok(SearchOutcome {
            products,
            keyword,
            vector,
        })
    }
}
