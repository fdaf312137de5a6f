//! # product-search
//!
//! A hybrid product search gateway. Products are embedded on ingestion and
//! stored with their vectors; queries run a fuzzy keyword search and a
//! k-nearest-neighbour search side by side and merge them with Reciprocal
//! Rank Fusion.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌─────────────┐
//!                        │ User Query  │
//!                        └──────┬──────┘
//!                               │
//!                  ┌────────────┴────────────┐
//!                  ▼                         ▼
//!         ┌────────────────┐        ┌─────────────────┐
//!         │ Keyword search │        │ Embedding client│
//!         │ (fuzzy, BM25)  │        │  text → vector  │
//!         └───────┬────────┘        └────────┬────────┘
//!                 │                          │ no vector → skip
//!                 │                          ▼
//!                 │                 ┌─────────────────┐
//!                 │                 │   kNN search    │
//!                 │                 │ (cosine, top_k) │
//!                 │                 └────────┬────────┘
//!                 └────────────┬─────────────┘
//!                              │ 2 ranked id lists
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │      RRF Fusion       │
//!                  │  Σ 1 / (rank + 60)    │
//!                  │  ties: keyword first  │
//!                  │  keep top_k           │
//!                  └───────────┬───────────┘
//!                              │
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │  Hydration (1 batch)  │
//!                  │  fused order, misses  │
//!                  │  dropped              │
//!                  └───────────┬───────────┘
//!                              ▼
//!                  ┌───────────────────────┐
//!                  │    Final Results      │
//!                  └───────────────────────┘
//! ```
//!
//! Before any route is served, [`bootstrap`] waits for the store with a
//! bounded retry loop and ensures the collection exists.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, store, embedding and search
//! - [`models`] - Shared data types: `Product`, `ProductRecord`, request/response types
//! - [`llm::embeddings`] - HTTP embedding client
//! - [`store`] - `DocumentStore` trait with Elasticsearch and local (tantivy) backends
//! - [`search::retriever`] - Keyword and vector candidate retrieval with typed outcomes
//! - [`search::fusion`] - Reciprocal Rank Fusion with deterministic tie-breaking
//! - [`search::hydrate`] - Batch document fetch preserving fused order
//! - [`search::hybrid`] - The full concurrent search pipeline
//! - [`ingest`] - Embed-then-upsert product ingestion
//! - [`bootstrap`] - Startup readiness state machine
//! - [`loader`] - Batch JSON-lines loader client
//! - [`api`] - Axum HTTP handlers for ingestion, search and health
//! - [`state`] - Shared application state wiring the collaborators together

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod models;
pub mod search;
pub mod state;
pub mod store;
