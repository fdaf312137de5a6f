//! Batch loader: replay a JSON-lines product file through `POST /index-product`.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use serde::Serialize;

use crate::bootstrap::{RetryPolicy, Sleeper};
use crate::models::Product;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub indexed: usize,
    pub failed: usize,
}

pub struct BatchLoader {
    client: reqwest::Client,
    api_url: String,
}

impl BatchLoader {
    pub fn new(client: reqwest::Client, api_url: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Poll `GET /health` until it answers 200, with the same bounded retry as startup.
    pub async fn wait_until_ready(&self, policy: RetryPolicy, sleeper: &dyn Sleeper) -> Result<()> {
        let url = format!("{}/health", self.api_url);
        let allowed = policy.max_retries.saturating_add(1);

        for attempt in 1..=allowed {
            let probe = self
                .client
                .get(&url)
                .timeout(policy.probe_timeout)
                .send()
                .await;
            match probe {
                Ok(resp) if resp.status() == StatusCode::OK => {
                    tracing::info!("Search API ready at {}", self.api_url);
                    return Ok(());
                }
                Ok(resp) => tracing::warn!(
                    "Search API not ready (attempt {attempt}/{allowed}): HTTP {}",
                    resp.status()
                ),
                Err(e) => tracing::warn!("Search API not ready (attempt {attempt}/{allowed}): {e}"),
            }
            if attempt < allowed {
                sleeper.sleep(policy.delay).await;
            }
        }

        bail!(
            "search API at {} not ready after {allowed} attempts",
            self.api_url
        )
    }

    /// Index every non-blank line of `path`. Unparseable lines and rejected
    /// products count as failed; the load carries on.
    pub async fn load_file(&self, path: &Path) -> Result<LoadSummary> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut summary = LoadSummary::default();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let product: Product = match serde_json::from_str(line) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("Skipping line {}: {e}", line_no + 1);
                    summary.failed += 1;
                    continue;
                }
            };

            match self.index(&product).await {
                Ok(()) => summary.indexed += 1,
                Err(e) => {
                    tracing::warn!("Failed to index {}: {e:#}", product.product_id);
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            "Loaded {}: {} indexed, {} failed",
            path.display(),
            summary.indexed,
            summary.failed
        );
        Ok(summary)
    }

    async fn index(&self, product: &Product) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/index-product", self.api_url))
            .json(product)
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            bail!("HTTP {status}: {body}");
        }
        Ok(())
    }
}
