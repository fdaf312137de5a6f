//! Embedded store: tantivy keyword index + in-memory cosine vector index.
//!
//! Records optionally persist to `products.json` in a data directory; both
//! indexes are rebuilt from that file on open. Every write lands on disk
//! before it becomes visible in memory, so a failed write leaves no trace.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::bm25::Bm25Index;
use super::vector::VectorIndex;
use super::{
    CollectionSchema, CollectionStatus, DocumentStore, FetchedDocument, KnnQuery, StoreError,
};
use crate::models::ProductRecord;

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    collection: Option<CollectionSchema>,
    records: Vec<ProductRecord>,
}

pub struct LocalStore {
    keyword: Arc<Bm25Index>,
    vectors: VectorIndex,
    records: RwLock<HashMap<String, ProductRecord>>,
    collection: RwLock<Option<CollectionSchema>>,
    persist_path: Option<PathBuf>,
    // Serializes writers so snapshots land in commit order.
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            keyword: Arc::new(Bm25Index::new()?),
            vectors: VectorIndex::new(),
            records: RwLock::new(HashMap::new()),
            collection: RwLock::new(None),
            persist_path: None,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Open (or start) a store persisted under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let persist_path = data_dir.join("products.json");

        let snapshot: Snapshot = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)?;
            serde_json::from_str(&data)?
        } else {
            Snapshot::default()
        };

        let store = Self {
            persist_path: Some(persist_path),
            ..Self::in_memory()?
        };

        store.keyword.upsert_many(
            snapshot
                .records
                .iter()
                .map(|r| (r.id(), r.product.description.as_str())),
        )?;
        for record in &snapshot.records {
            store.vectors.upsert(record.id(), record.embedding.clone());
        }
        tracing::info!(
            "Loaded {} products from {}",
            snapshot.records.len(),
            data_dir.display()
        );

        *store.collection.write() = snapshot.collection;
        *store.records.write() = snapshot
            .records
            .into_iter()
            .map(|r| (r.id().to_string(), r))
            .collect();

        Ok(store)
    }

    pub fn collection(&self) -> Option<CollectionSchema> {
        self.collection.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn require_collection(&self) -> Result<CollectionSchema, StoreError> {
        self.collection().ok_or(StoreError::MissingCollection)
    }

    /// Persist the current records with `pending` applied on top.
    /// Callers hold `write_lock`.
    async fn persist_with(
        &self,
        collection: Option<CollectionSchema>,
        pending: Option<&ProductRecord>,
    ) -> Result<(), StoreError> {
        let Some(path) = self.persist_path.clone() else {
            return Ok(());
        };

        let mut records: Vec<ProductRecord> = {
            let current = self.records.read();
            current
                .values()
                .filter(|r| pending.map_or(true, |p| p.id() != r.id()))
                .cloned()
                .collect()
        };
        records.extend(pending.cloned());
        records.sort_by(|a, b| a.id().cmp(b.id()));
        let snapshot = Snapshot {
            collection,
            records,
        };

        tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot)).await?
    }
}

/// Atomic write: temp file + rename.
fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let data = serde_json::to_string(snapshot)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn ensure_collection(
        &self,
        schema: &CollectionSchema,
    ) -> Result<CollectionStatus, StoreError> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.collection() {
            if &existing != schema {
                tracing::warn!(
                    "Collection `{}` exists with a different schema ({} dims); leaving it unchanged",
                    existing.name,
                    existing.dims
                );
            }
            return Ok(CollectionStatus::Existing);
        }

        self.persist_with(Some(schema.clone()), None).await?;
        *self.collection.write() = Some(schema.clone());
        Ok(CollectionStatus::Created)
    }

    async fn keyword_search(&self, text: &str, top_k: usize) -> Result<Vec<String>, StoreError> {
        self.require_collection()?;
        let keyword = self.keyword.clone();
        let text = text.to_string();
        let hits = tokio::task::spawn_blocking(move || keyword.search(&text, top_k)).await??;
        Ok(hits.into_iter().map(|h| h.product_id).collect())
    }

    async fn knn_search(&self, query: KnnQuery<'_>) -> Result<Vec<String>, StoreError> {
        self.require_collection()?;
        // Exact search: every stored vector is a candidate.
        Ok(self
            .vectors
            .search(query.vector, query.k)
            .into_iter()
            .map(|h| h.product_id)
            .collect())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<FetchedDocument>, StoreError> {
        let records = self.records.read();
        Ok(ids
            .iter()
            .map(|id| FetchedDocument {
                id: id.clone(),
                product: records.get(id).map(|r| r.product.clone()),
            })
            .collect())
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let schema = self.require_collection()?;
        if record.embedding.len() != schema.dims {
            return Err(StoreError::Rejected(format!(
                "embedding has {} dimensions, collection `{}` expects {}",
                record.embedding.len(),
                schema.name,
                schema.dims
            )));
        }

        self.persist_with(Some(schema.clone()), Some(record)).await?;

        let keyword = self.keyword.clone();
        let id = record.id().to_string();
        let description = record.product.description.clone();
        let indexed = tokio::task::spawn_blocking(move || keyword.upsert(&id, &description))
            .await
            .map_err(StoreError::from)
            .and_then(|r| r.map_err(StoreError::from));
        if let Err(e) = indexed {
            // Undo the snapshot so disk matches memory again.
            if let Err(undo) = self.persist_with(Some(schema), None).await {
                tracing::warn!("Failed to restore snapshot after index error: {undo}");
            }
            return Err(e);
        }

        self.vectors.upsert(record.id(), record.embedding.clone());
        self.records
            .write()
            .insert(record.id().to_string(), record.clone());
        Ok(())
    }
}
