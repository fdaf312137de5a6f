//! Elasticsearch-backed store speaking the REST JSON API.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::{
    CollectionSchema, CollectionStatus, DocumentStore, FetchedDocument, KnnQuery, StoreError,
};
use crate::models::{Product, ProductRecord};

pub struct ElasticsearchStore {
    client: reqwest::Client,
    base_url: Url,
    /// Collection this store reads and writes; queries name its fields
    schema: CollectionSchema,
    timeout: Duration,
}

impl ElasticsearchStore {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        schema: CollectionSchema,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Config(format!("invalid store URL `{base_url}`: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "store URL `{base_url}` cannot be used as a base"
            )));
        }
        Ok(Self {
            client,
            base_url,
            schema,
            timeout,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: Url,
        body: &Value,
    ) -> Result<T, StoreError> {
        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        resp.json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn collection_exists(&self) -> Result<bool, StoreError> {
        let resp = self
            .client
            .head(self.url(&[&self.schema.name]))
            .timeout(self.timeout)
            .send()
            .await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StoreError::Status {
                status: status.as_u16(),
                body: String::new(),
            }),
        }
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

/// Index mappings for the product collection.
pub fn mappings(schema: &CollectionSchema) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert("product_id".into(), json!({"type": "keyword"}));
    properties.insert(schema.text_field.clone(), json!({"type": "text"}));
    properties.insert("category".into(), json!({"type": "keyword"}));
    properties.insert("price".into(), json!({"type": "float"}));
    properties.insert(
        schema.vector_field.clone(),
        json!({
            "type": "dense_vector",
            "dims": schema.dims,
            "index": true,
            "similarity": schema.similarity,
        }),
    );
    json!({ "properties": properties })
}

pub fn keyword_query(schema: &CollectionSchema, text: &str, top_k: usize) -> Value {
    let mut field = serde_json::Map::new();
    field.insert(
        schema.text_field.clone(),
        json!({ "query": text, "fuzziness": "AUTO" }),
    );
    json!({
        "query": { "match": field },
        "size": top_k,
        "_source": false,
    })
}

pub fn knn_query(schema: &CollectionSchema, query: &KnnQuery<'_>) -> Value {
    json!({
        "knn": {
            "field": schema.vector_field,
            "query_vector": query.vector,
            "k": query.k,
            "num_candidates": query.num_candidates,
        },
        "size": query.k,
        "_source": false,
    })
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_id")]
    id: String,
}

impl SearchResponse {
    fn into_ids(self) -> Vec<String> {
        self.hits.hits.into_iter().map(|h| h.id).collect()
    }
}

#[derive(Deserialize)]
struct MgetResponse {
    docs: Vec<MgetDoc>,
}

#[derive(Deserialize)]
struct MgetDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

impl MgetDoc {
    fn into_fetched(self, schema: &CollectionSchema) -> Result<FetchedDocument, StoreError> {
        let product = match (self.found, self.source) {
            (true, Some(source)) => Some(product_from_source(schema, source)?),
            _ => None,
        };
        Ok(FetchedDocument {
            id: self.id,
            product,
        })
    }
}

/// Stored document for `record`, with the text and vector under the schema's field names.
pub fn document(schema: &CollectionSchema, record: &ProductRecord) -> Value {
    let mut doc = serde_json::Map::new();
    doc.insert("product_id".into(), json!(record.product.product_id));
    doc.insert(schema.text_field.clone(), json!(record.product.description));
    doc.insert("category".into(), json!(record.product.category));
    doc.insert("price".into(), json!(record.product.price));
    doc.insert(schema.vector_field.clone(), json!(record.embedding));
    Value::Object(doc)
}

fn product_from_source(schema: &CollectionSchema, source: Value) -> Result<Product, StoreError> {
    let Value::Object(mut fields) = source else {
        return Err(StoreError::Malformed("_source is not an object".to_string()));
    };
    if let Some(text) = fields.remove(&schema.text_field) {
        fields.insert("description".into(), text);
    }
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| StoreError::Malformed(format!("bad product document: {e}")))
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    fn name(&self) -> &'static str {
        "elasticsearch"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let resp = self
            .client
            .head(self.base_url.clone())
            .timeout(self.timeout)
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }

    async fn ensure_collection(
        &self,
        schema: &CollectionSchema,
    ) -> Result<CollectionStatus, StoreError> {
        if schema.name != self.schema.name {
            return Err(StoreError::Config(format!(
                "store is bound to index `{}`, asked to ensure `{}`",
                self.schema.name, schema.name
            )));
        }
        if self.collection_exists().await? {
            return Ok(CollectionStatus::Existing);
        }

        tracing::info!("Index `{}` not found, creating it", schema.name);
        let resp = self
            .client
            .put(self.url(&[&schema.name]))
            .timeout(self.timeout)
            .json(&json!({ "mappings": mappings(schema) }))
            .send()
            .await?;

        match check_status(resp).await {
            Ok(_) => {
                tracing::info!(
                    "Created index `{}` with {}-dimensional vectors",
                    schema.name,
                    schema.dims
                );
                Ok(CollectionStatus::Created)
            }
            // Another instance created it between the check and the PUT.
            Err(StoreError::Status { status: 400, body })
                if body.contains("resource_already_exists_exception") =>
            {
                Ok(CollectionStatus::Existing)
            }
            Err(e) => Err(e),
        }
    }

    async fn keyword_search(&self, text: &str, top_k: usize) -> Result<Vec<String>, StoreError> {
        let resp: SearchResponse = self
            .post_json(
                self.url(&[&self.schema.name, "_search"]),
                &keyword_query(&self.schema, text, top_k),
            )
            .await?;
        Ok(resp.into_ids())
    }

    async fn knn_search(&self, query: KnnQuery<'_>) -> Result<Vec<String>, StoreError> {
        let resp: SearchResponse = self
            .post_json(
                self.url(&[&self.schema.name, "_search"]),
                &knn_query(&self.schema, &query),
            )
            .await?;
        Ok(resp.into_ids())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<FetchedDocument>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.url(&[&self.schema.name, "_mget"]);
        url.query_pairs_mut()
            .append_pair("_source_excludes", &self.schema.vector_field);

        let resp: MgetResponse = self.post_json(url, &json!({ "ids": ids })).await?;
        resp.docs
            .into_iter()
            .map(|doc| doc.into_fetched(&self.schema))
            .collect()
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<(), StoreError> {
        let resp = self
            .client
            .put(self.url(&[&self.schema.name, "_doc", record.id()]))
            .timeout(self.timeout)
            .json(&document(&self.schema, record))
            .send()
            .await?;
        check_status(resp).await.map(|_| ())
    }
}
