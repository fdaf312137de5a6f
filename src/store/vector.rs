use parking_lot::RwLock;

/// A stored vector entry
#[derive(Debug, Clone)]
struct VectorEntry {
    product_id: String,
    embedding: Vec<f32>,
}

/// In-memory vector index with exact cosine similarity search.
#[derive(Default)]
pub struct VectorIndex {
    entries: RwLock<Vec<VectorEntry>>,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub product_id: String,
    pub score: f32,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the vector for a product.
    pub fn upsert(&self, product_id: &str, embedding: Vec<f32>) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(entry) => entry.embedding = embedding,
            None => entries.push(VectorEntry {
                product_id: product_id.to_string(),
                embedding,
            }),
        }
    }

    /// Search by cosine similarity against a query embedding.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<VectorHit> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = entries
            .iter()
            .map(|e| (cosine_similarity(query_embedding, &e.embedding), e))
            .collect();

        // Sort descending by score
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(score, e)| VectorHit {
                product_id: e.product_id.clone(),
                score,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
