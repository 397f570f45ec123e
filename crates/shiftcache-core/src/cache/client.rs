use async_trait::async_trait;

use super::CacheError;

/// Key-value cache backend used by the query cache.
///
/// Values are opaque strings; expiry is the backend's job. Implementations
/// must be shareable across tasks since cache population runs detached.
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Fetch a value. Expired entries are reported as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl_secs`.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// One step of a cursor scan. Start with cursor 0; a returned cursor of 0
    /// means the scan is complete.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>), CacheError>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64, CacheError>;
}
