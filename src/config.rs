use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Document/vector store configuration
    pub store: StoreConfig,
    /// Embedding service configuration
    pub embedding: EmbeddingConfig,
    /// Retrieval and fusion tuning
    pub search: SearchConfig,
    /// Startup readiness loop
    pub bootstrap: BootstrapConfig,
    /// Browser origins allowed by the CORS layer
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "elasticsearch" or "local"
    pub backend: String,
    /// Base URL of the Elasticsearch cluster
    pub url: String,
    /// Collection (index) name
    pub index_name: String,
    /// Where the local backend persists its records
    pub data_dir: PathBuf,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding endpoint (text-embeddings-inference `/embed` style).
    /// If None, every embedding attempt fails with a configuration error.
    pub api_url: Option<String>,
    /// Embedding vector dimension
    pub dims: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Result count when a request does not specify one
    pub default_top_k: usize,
    /// Upper bound on requested result count
    pub max_top_k: usize,
    /// Reciprocal rank fusion constant
    pub rrf_k: f64,
    /// kNN candidate pool multiplier over top_k
    pub knn_oversample: usize,
    /// Lower bound on the kNN candidate pool
    pub knn_min_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Failed liveness probes tolerated before startup is abandoned
    pub max_retries: u32,
    /// Fixed delay between probes in seconds
    pub retry_delay_secs: u64,
    /// Liveness probe timeout in seconds
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown store backend `{0}` (expected `elasticsearch` or `local`)")]
    UnknownBackend(String),
    #[error("RRF_K must be a positive finite number, got {0}")]
    InvalidRrfK(f64),
    #[error("EMBEDDING_DIMS must be greater than zero")]
    ZeroDims,
    #[error("default top_k {default} must be between 1 and max top_k {max}")]
    InvalidTopK { default: usize, max: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            bootstrap: BootstrapConfig::default(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "elasticsearch".to_string(),
            url: "http://localhost:9200".to_string(),
            index_name: "products_qwen3".to_string(),
            data_dir: PathBuf::from("./data"),
            timeout_secs: 10,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            dims: 4096,
            timeout_secs: 30,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            max_top_k: 100,
            rrf_k: crate::search::fusion::DEFAULT_RRF_K,
            knn_oversample: 10,
            knn_min_candidates: 100,
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_retries: 30,
            retry_delay_secs: 5,
            probe_timeout_secs: 3,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = std::env::var(key) {
        if let Ok(v) = val.trim().parse() {
            *target = v;
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }

        // Store
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            config.store.backend = backend.trim().to_lowercase();
        }
        if let Ok(url) = std::env::var("ELASTICSEARCH_URL") {
            config.store.url = url;
        }
        if let Ok(name) = std::env::var("SEARCH_INDEX_NAME") {
            config.store.index_name = name;
        }
        if let Ok(dir) = std::env::var("SEARCH_DATA_DIR") {
            config.store.data_dir = PathBuf::from(dir);
        }
        env_parse("STORE_TIMEOUT_SECS", &mut config.store.timeout_secs);

        // Embedding
        if let Ok(url) = std::env::var("EMBEDDING_API_URL") {
            if !url.trim().is_empty() {
                config.embedding.api_url = Some(url.trim().to_string());
            }
        }
        env_parse("EMBEDDING_DIMS", &mut config.embedding.dims);
        env_parse("EMBEDDING_TIMEOUT_SECS", &mut config.embedding.timeout_secs);

        // Search
        env_parse("SEARCH_DEFAULT_TOP_K", &mut config.search.default_top_k);
        env_parse("SEARCH_MAX_TOP_K", &mut config.search.max_top_k);
        env_parse("RRF_K", &mut config.search.rrf_k);
        env_parse("KNN_OVERSAMPLE", &mut config.search.knn_oversample);
        env_parse("KNN_MIN_CANDIDATES", &mut config.search.knn_min_candidates);

        // Bootstrap
        env_parse("STARTUP_MAX_RETRIES", &mut config.bootstrap.max_retries);
        env_parse("STARTUP_RETRY_DELAY_SECS", &mut config.bootstrap.retry_delay_secs);
        env_parse("STARTUP_PROBE_TIMEOUT_SECS", &mut config.bootstrap.probe_timeout_secs);

        if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        config
    }

    /// Reject settings the service can never run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.store.backend.as_str() {
            "elasticsearch" | "local" => {}
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        }
        if !self.search.rrf_k.is_finite() || self.search.rrf_k <= 0.0 {
            return Err(ConfigError::InvalidRrfK(self.search.rrf_k));
        }
        if self.embedding.dims == 0 {
            return Err(ConfigError::ZeroDims);
        }
        if self.search.default_top_k == 0 || self.search.default_top_k > self.search.max_top_k {
            return Err(ConfigError::InvalidTopK {
                default: self.search.default_top_k,
                max: self.search.max_top_k,
            });
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BootstrapConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}
