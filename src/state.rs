use std::sync::Arc;

use anyhow::bail;

use crate::config::Config;
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::search::hybrid::HybridSearch;
use crate::store::elasticsearch::ElasticsearchStore;
use crate::store::local::LocalStore;
use crate::store::{CollectionSchema, DocumentStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn Embedder>,
    pub search: HybridSearch,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        let schema = CollectionSchema::products(&config.store.index_name, config.embedding.dims);
        let store: Arc<dyn DocumentStore> = match config.store.backend.as_str() {
            "elasticsearch" => Arc::new(ElasticsearchStore::new(
                http_client.clone(),
                &config.store.url,
                schema,
                config.store.timeout(),
            )?),
            "local" => Arc::new(LocalStore::open(&config.store.data_dir)?),
            other => bail!("unknown store backend '{other}'"),
        };

        if config.embedding.api_url.is_none() {
            tracing::warn!("EMBEDDING_API_URL is not set; ingestion will fail and search is keyword-only");
        }
        let embedder = Arc::new(HttpEmbedder::new(http_client, &config.embedding));

        Ok(Self::with_components(config, store, embedder))
    }

    /// Assemble state from prebuilt collaborators.
    pub fn with_components(
        config: Config,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let search = HybridSearch::new(store.clone(), embedder.clone(), &config.search);
        Self {
            config: Arc::new(config),
            store,
            embedder,
            search,
        }
    }

    pub fn schema(&self) -> CollectionSchema {
        CollectionSchema::products(&self.config.store.index_name, self.config.embedding.dims)
    }
}
