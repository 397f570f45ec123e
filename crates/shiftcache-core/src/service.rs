//! Consumer-facing read and write functions.
//!
//! Reads go through the query cache; writes go to the record store and
//! then clear the `shifts:` namespace. Writes report expected failures
//! (unknown id, bad transition, empty batch) as result values so a UI can
//! show per-item feedback.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{namespace_pattern, CacheAside, CacheClient, Invalidator, ReadSource, UpstashClient};
use crate::config::Config;
use crate::error::ShiftError;
use crate::models::{QuerySpec, ShiftRecord, ShiftStatus};
use crate::query;
use crate::store::RecordStore;

/// Actor recorded on updates when the caller does not name one.
pub const DEFAULT_ACTOR: &str = "admin_001";

/// Result of `get_shifts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ShiftsResponse {
    pub data: Vec<ShiftRecord>,
    pub total: usize,
    pub filtered: usize,
    pub source: ReadSource,
}

/// Result of a single status update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UpdateResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ShiftRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a batch status update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<ShiftRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchUpdateResult {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            data: None,
            updated: None,
            not_found: None,
            skipped: None,
            error: Some(error),
        }
    }
}

pub struct ShiftService {
    store: RecordStore,
    cache: CacheAside,
    invalidator: Invalidator,
    ttl: Duration,
}

impl ShiftService {
    pub fn new(store: RecordStore, client: Arc<dyn CacheClient>, ttl: Duration) -> Self {
        Self {
            store,
            cache: CacheAside::new(Arc::clone(&client)),
            invalidator: Invalidator::new(client),
            ttl,
        }
    }

    /// Wire up the file store and the Upstash backend from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = UpstashClient::from_config(&config.cache)?;
        Ok(Self::new(
            RecordStore::new(config.data_path.clone()),
            Arc::new(client),
            config.cache_ttl,
        ))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Filtered, sorted shifts, served from the cache when possible.
    ///
    /// Only a failure to read the shift file is an error here.
    pub async fn get_shifts(&self, spec: &QuerySpec) -> Result<ShiftsResponse, ShiftError> {
        let read = self
            .cache
            .get(
                spec,
                move || async move {
                    let shifts = self.store.load().await?;
                    Ok(query::apply(&shifts, spec))
                },
                self.ttl,
            )
            .await?;

        Ok(ShiftsResponse {
            total: read.data.total,
            filtered: read.data.filtered,
            data: read.data.data,
            source: read.source,
        })
    }

    pub async fn update_shift_status(&self, id: &str, status: ShiftStatus, actor: Option<&str>) -> UpdateResult {
        let actor = actor.unwrap_or(DEFAULT_ACTOR);
        match self.store.update_one(id, status, actor).await {
            Ok(shift) => {
                info!(id = %id, status = %status, actor = %actor, "Updated shift status");
                self.invalidate_queries().await;
                UpdateResult {
                    success: true,
                    data: Some(shift),
                    error: None,
                }
            }
            Err(e) => {
                log_write_failure(&e);
                UpdateResult {
                    success: false,
                    data: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn batch_update_shifts(&self, ids: &[String], status: ShiftStatus, actor: Option<&str>) -> BatchUpdateResult {
        let actor = actor.unwrap_or(DEFAULT_ACTOR);
        match self.store.update_many(ids, status, actor).await {
            Ok(outcome) => {
                info!(
                    updated = outcome.updated.len(),
                    not_found = outcome.not_found.len(),
                    skipped = outcome.skipped.len(),
                    status = %status,
                    actor = %actor,
                    "Batch updated shifts"
                );
                self.invalidate_queries().await;
                BatchUpdateResult {
                    success: true,
                    updated: Some(outcome.updated.len()),
                    data: Some(outcome.updated),
                    not_found: Some(outcome.not_found),
                    skipped: Some(outcome.skipped),
                    error: None,
                }
            }
            Err(e) => {
                log_write_failure(&e);
                BatchUpdateResult::failed(e.to_string())
            }
        }
    }

    /// Drop every cached query. Returns how many entries were removed.
    ///
    /// Pending cache writes from earlier reads land first, so none of them
    /// can restore a pre-write result after the namespace is cleared.
    pub async fn invalidate_queries(&self) -> u64 {
        self.cache.drain().await;
        self.invalidator.invalidate(&[namespace_pattern()]).await
    }

    /// Let detached cache writes finish; call before a short-lived process exits.
    pub async fn shutdown(&self) {
        self.cache.drain().await;
    }
}

fn log_write_failure(e: &ShiftError) {
    if e.is_validation() {
        info!(error = %e, "Rejected shift update");
    } else {
        warn!(error = %e, "Shift update failed");
    }
}
