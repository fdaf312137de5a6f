//! Startup readiness: wait for the store, ensure the collection, then serve.
//!
//! ```text
//! WaitingForStore{1} --probe ok--> SchemaCheck --ensured--> Ready
//!        |
//!   probe failed, attempt <= max_retries: sleep, WaitingForStore{attempt + 1}
//!   probe failed, attempt >  max_retries: StartupFailed (fatal)
//! ```
//!
//! The sleeper is injected so tests drive the loop without wall-clock delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BootstrapConfig;
use crate::store::{CollectionSchema, CollectionStatus, DocumentStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    /// Probing store liveness; `attempt` is 1-based
    WaitingForStore { attempt: u32 },
    SchemaCheck,
    Ready,
    StartupFailed,
}

impl BootstrapState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BootstrapState::Ready | BootstrapState::StartupFailed)
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("store unreachable after {attempts} attempts")]
    StoreUnreachable { attempts: u32 },

    #[error("failed to ensure collection: {0}")]
    Schema(#[source] StoreError),
}

/// Bounded fixed-delay retry. `max_retries` failures are tolerated, so up to
/// `max_retries + 1` probes run in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub probe_timeout: Duration,
}

impl From<&BootstrapConfig> for RetryPolicy {
    fn from(config: &BootstrapConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
            probe_timeout: config.probe_timeout(),
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Every state visited, starting with the first probe and ending in `Ready`
    pub history: Vec<BootstrapState>,
    pub collection_status: CollectionStatus,
}

pub struct Bootstrap {
    store: Arc<dyn DocumentStore>,
    schema: CollectionSchema,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    collection_status: Option<CollectionStatus>,
    attempts: u32,
}

impl Bootstrap {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        schema: CollectionSchema,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            store,
            schema,
            policy,
            sleeper,
            collection_status: None,
            attempts: 0,
        }
    }

    /// Advance one transition. Terminal states map to themselves.
    pub async fn step(&mut self, state: BootstrapState) -> Result<BootstrapState, BootstrapError> {
        match state {
            BootstrapState::WaitingForStore { attempt } => {
                let probe = tokio::time::timeout(self.policy.probe_timeout, self.store.ping()).await;
                let failure = match probe {
                    Ok(Ok(())) => {
                        tracing::info!("{} store reachable (attempt {attempt})", self.store.name());
                        return Ok(BootstrapState::SchemaCheck);
                    }
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => format!("no answer within {:?}", self.policy.probe_timeout),
                };

                let allowed = self.policy.max_retries.saturating_add(1);
                if attempt >= allowed {
                    tracing::error!(
                        "{} store unreachable after {attempt} attempts: {failure}",
                        self.store.name()
                    );
                    self.attempts = attempt;
                    return Ok(BootstrapState::StartupFailed);
                }
                tracing::warn!(
                    "Waiting for {} store (attempt {attempt}/{allowed}): {failure}",
                    self.store.name()
                );
                self.sleeper.sleep(self.policy.delay).await;
                Ok(BootstrapState::WaitingForStore {
                    attempt: attempt + 1,
                })
            }
            BootstrapState::SchemaCheck => {
                let status = self
                    .store
                    .ensure_collection(&self.schema)
                    .await
                    .map_err(|e| {
                        tracing::error!("Schema check for '{}' failed: {e}", self.schema.name);
                        BootstrapError::Schema(e)
                    })?;
                match status {
                    CollectionStatus::Created => tracing::info!(
                        "Created collection '{}' ({} dims, {:?})",
                        self.schema.name,
                        self.schema.dims,
                        self.schema.similarity
                    ),
                    CollectionStatus::Existing => {
                        tracing::info!("Collection '{}' already exists", self.schema.name)
                    }
                }
                self.collection_status = Some(status);
                Ok(BootstrapState::Ready)
            }
            terminal => Ok(terminal),
        }
    }

    /// Drive the state machine from the first probe until `Ready`.
    /// Reaching `StartupFailed` or failing the schema check is an error.
    pub async fn run(&mut self) -> Result<BootstrapReport, BootstrapError> {
        let mut state = BootstrapState::WaitingForStore { attempt: 1 };
        let mut history = vec![state];
        while !state.is_terminal() {
            state = self.step(state).await?;
            history.push(state);
        }

        match (state, self.collection_status) {
            (BootstrapState::Ready, Some(collection_status)) => Ok(BootstrapReport {
                history,
                collection_status,
            }),
            _ => Err(BootstrapError::StoreUnreachable {
                attempts: self.attempts,
            }),
        }
    }
}
