use serde::{Deserialize, Serialize};

/// A catalog product as accepted by ingestion and returned by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub description: String,
    pub category: String,
    pub price: f64,
}

impl Product {
    /// Check the structural constraints a product must satisfy before it is embedded.
    pub fn validate(&self) -> Result<(), String> {
        if self.product_id.trim().is_empty() {
            return Err("product_id is required".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!(
                "price must be a non-negative number, got {}",
                self.price
            ));
        }
        Ok(())
    }
}

/// A product together with its current embedding, as written to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(flatten)]
    pub product: Product,
    pub embedding: Vec<f32>,
}

impl ProductRecord {
    pub fn id(&self) -> &str {
        &self.product.product_id
    }
}

/// Search request
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Falls back to the configured default when absent
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<Product>,
    pub total_keyword_hits: usize,
    pub total_vector_hits: usize,
    /// "ranked", "no_vector" or "failed"
    pub vector_status: String,
}

/// Ingestion acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub status: String,
    pub product_id: String,
}

/// Readiness signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub collection: String,
    pub store: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price: f64) -> Product {
        Product {
            product_id: id.to_string(),
            description: "wireless noise cancelling headphones".to_string(),
            category: "audio".to_string(),
            price,
        }
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = ProductRecord {
            product: product("p-1", 99.5),
            embedding: vec![0.25, 0.5],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["product_id"], "p-1");
        assert_eq!(json["category"], "audio");
        assert_eq!(json["embedding"][1], 0.5);
        assert!(json.get("product").is_none());
    }

    #[test]
    fn test_product_ignores_unknown_fields() {
        let json = r#"{"product_id":"p-2","description":"d","category":"c","price":1.0,"embedding":[0.1]}"#;
        let parsed: Product = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.product_id, "p-2");
    }

    #[test]
    fn test_validate_rejects_blank_id_and_negative_price() {
        assert!(product("  ", 1.0).validate().is_err());
        assert!(product("p-3", -0.01).validate().is_err());
        assert!(product("p-3", f64::NAN).validate().is_err());
        assert!(product("p-3", 0.0).validate().is_ok());
    }

    #[test]
    fn test_search_request_top_k_optional() {
        let req: SearchRequest = serde_json::from_str(r#"{"query":"lamp"}"#).unwrap();
        assert_eq!(req.top_k, None);
        let req: SearchRequest = serde_json::from_str(r#"{"query":"lamp","top_k":3}"#).unwrap();
        assert_eq!(req.top_k, Some(3));
    }
}
