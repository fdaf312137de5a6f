use std::collections::HashMap;

use crate::models::Product;
use crate::store::{DocumentStore, StoreError};

/// Expand fused ids into products with one batch fetch.
///
/// Output follows `ids` order regardless of how the store orders its reply.
/// Ids the store no longer knows are dropped silently.
pub async fn hydrate(store: &dyn DocumentStore, ids: &[String]) -> Result<Vec<Product>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut found: HashMap<String, Product> = store
        .get_many(ids)
        .await?
        .into_iter()
        .filter_map(|doc| doc.product.map(|p| (doc.id, p)))
        .collect();

    let products: Vec<Product> = ids.iter().filter_map(|id| found.remove(id)).collect();
    if products.len() < ids.len() {
        tracing::debug!(
            "Hydration dropped {} of {} ids missing from the store",
            ids.len() - products.len(),
            ids.len()
        );
    }
    Ok(products)
}
