use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::{CacheClient, CacheError};

/// Keys requested per SCAN step.
const SCAN_COUNT: usize = 100;

/// Keys per DEL call, bounding request size.
const DELETE_BATCH_SIZE: usize = 100;

/// Clears cache namespaces after writes.
///
/// Each pattern is enumerated completely with SCAN before anything is
/// deleted. Patterns run concurrently with no shared state between them.
/// Backend errors are logged and swallowed: a write that already
/// succeeded must not fail because the cache could not be cleared.
pub struct Invalidator {
    client: Arc<dyn CacheClient>,
}

impl Invalidator {
    pub fn new(client: Arc<dyn CacheClient>) -> Self {
        Self { client }
    }

    /// Delete every key matching any of `patterns`. Returns the number deleted.
    pub async fn invalidate(&self, patterns: &[String]) -> u64 {
        let results = join_all(patterns.iter().map(|pattern| async move {
            match self.invalidate_pattern(pattern).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Cache invalidation failed");
                    0
                }
            }
        }))
        .await;

        results.into_iter().sum()
    }

    async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut cursor = 0;
        let mut keys = Vec::new();

        loop {
            let (next, found) = self.client.scan(cursor, pattern, SCAN_COUNT).await?;
            keys.extend(found);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        // SCAN may report a key more than once
        keys.sort_unstable();
        keys.dedup();

        let mut deleted = 0;
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            deleted += self.client.del(batch).await?;
        }

        if !keys.is_empty() {
            debug!(pattern = %pattern, matched = keys.len(), deleted = deleted, "Invalidated cache keys");
        }
        Ok(deleted)
    }
}
