use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{derive_key, CacheClient};
use crate::error::ShiftError;
use crate::models::QuerySpec;

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ReadSource {
    Cache,
    Source,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedRead<T> {
    pub data: T,
    pub source: ReadSource,
}

/// Cache-aside reads over a `CacheClient`.
///
/// Backend failures never reach the caller: a failed lookup is a miss, a
/// failed store is logged. Only the loader's own error propagates.
pub struct CacheAside {
    client: Arc<dyn CacheClient>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl CacheAside {
    pub fn new(client: Arc<dyn CacheClient>) -> Self {
        Self {
            client,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn client(&self) -> &Arc<dyn CacheClient> {
        &self.client
    }

    /// Serve `spec` from the cache, or from `loader` on a miss.
    pub async fn get<T, F, Fut>(&self, spec: &QuerySpec, loader: F, ttl: Duration) -> Result<CachedRead<T>, ShiftError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ShiftError>>,
    {
        self.get_key(&derive_key(spec), loader, ttl).await
    }

    /// Same as `get` for a key the caller already derived.
    pub async fn get_key<T, F, Fut>(&self, key: &str, loader: F, ttl: Duration) -> Result<CachedRead<T>, ShiftError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ShiftError>>,
    {
        let started = Instant::now();

        let reachable = match self.client.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(data) => {
                    debug!(key = %key, hit = true, elapsed_ms = started.elapsed().as_millis() as u64, "Cache read");
                    return Ok(CachedRead {
                        data,
                        source: ReadSource::Cache,
                    });
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                    true
                }
            },
            Ok(None) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, reading from source");
                false
            }
        };

        let data = loader().await?;
        debug!(key = %key, hit = false, elapsed_ms = started.elapsed().as_millis() as u64, "Cache read");

        if reachable {
            match serde_json::to_string(&data) {
                Ok(value) => self.populate(key.to_string(), value, ttl),
                Err(e) => warn!(key = %key, error = %e, "Failed to serialize result for cache"),
            }
        }

        Ok(CachedRead {
            data,
            source: ReadSource::Source,
        })
    }

    /// Store a computed result without making the reader wait for it.
    fn populate(&self, key: String, value: String, ttl: Duration) {
        let client = Arc::clone(&self.client);
        let ttl_secs = ttl.as_secs().max(1);

        let handle = tokio::spawn(async move {
            if let Err(e) = client.set_ex(&key, &value, ttl_secs).await {
                warn!(key = %key, error = %e, "Cache storage failed");
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for cache writes spawned by earlier reads to finish.
    pub async fn drain(&self) {
        let handles: Vec<_> = {
            let mut pending = self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache population task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    fn accessor() -> (Arc<MemoryCache>, CacheAside) {
        let cache = Arc::new(MemoryCache::new());
        let aside = CacheAside::new(cache.clone());
        (cache, aside)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, aside) = accessor();
        let spec = QuerySpec::new().with_caregiver("alice");
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let loader = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ShiftError>(vec![1, 2, 3])
        };

        let first = aside.get(&spec, loader, TTL).await.unwrap();
        assert_eq!(first.source, ReadSource::Source);
        aside.drain().await;
        assert!(cache.contains(&derive_key(&spec)));

        let second = aside.get(&spec, loader, TTL).await.unwrap();
        assert_eq!(second.source, ReadSource::Cache);
        assert_eq!(second.data, first.data);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_equivalent_specs_share_entry() {
        let (_cache, aside) = accessor();
        let a = QuerySpec::new();
        let b = QuerySpec::new().with_caregiver("   ");

        aside.get(&a, || async { Ok(7u32) }, TTL).await.unwrap();
        aside.drain().await;
        let read = aside.get(&b, || async { Ok(8u32) }, TTL).await.unwrap();
        assert_eq!(read.source, ReadSource::Cache);
        assert_eq!(read.data, 7);
    }

    #[tokio::test]
    async fn test_unavailable_backend_falls_back() {
        let (cache, aside) = accessor();
        cache.set_unavailable(true);

        let read = aside.get(&QuerySpec::new(), || async { Ok("fresh".to_string()) }, TTL).await.unwrap();
        assert_eq!(read.source, ReadSource::Source);
        assert_eq!(read.data, "fresh");
        aside.drain().await;

        cache.set_unavailable(false);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_read() {
        let (cache, aside) = accessor();
        cache.set_reject_writes(true);

        let read = aside.get(&QuerySpec::new(), || async { Ok(1u8) }, TTL).await.unwrap();
        assert_eq!(read.source, ReadSource::Source);
        aside.drain().await;
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let (cache, aside) = accessor();
        let key = derive_key(&QuerySpec::new());
        cache.set_ex(&key, "not json", 60).await.unwrap();

        let read = aside.get(&QuerySpec::new(), || async { Ok(vec!["x".to_string()]) }, TTL).await.unwrap();
        assert_eq!(read.source, ReadSource::Source);
        aside.drain().await;
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some(r#"["x"]"#));
    }

    #[tokio::test]
    async fn test_loader_error_propagates() {
        let (cache, aside) = accessor();
        let err = aside
            .get::<u8, _, _>(
                &QuerySpec::new(),
                || async { Err(ShiftError::SourceUnavailable("gone".into())) },
                TTL,
            )
            .await
            .unwrap_err();
        assert_eq!(err, ShiftError::SourceUnavailable("gone".into()));
        aside.drain().await;
        assert!(cache.keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let (_cache, aside) = accessor();
        let spec = QuerySpec::new();

        aside.get(&spec, || async { Ok(1u8) }, Duration::from_secs(5)).await.unwrap();
        aside.drain().await;
        assert_eq!(aside.get(&spec, || async { Ok(2u8) }, TTL).await.unwrap().source, ReadSource::Cache);

        tokio::time::advance(Duration::from_secs(6)).await;
        let read = aside.get(&spec, || async { Ok(2u8) }, TTL).await.unwrap();
        assert_eq!(read.source, ReadSource::Source);
        assert_eq!(read.data, 2);
    }
}
