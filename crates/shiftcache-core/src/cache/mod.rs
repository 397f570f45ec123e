//! Query cache for shift reads.
//!
//! Reads go through `CacheAside`: derive a key from the normalized query,
//! try the backend, fall back to the record store on a miss or any backend
//! error, and populate the backend in a detached task. Writes clear the
//! whole `shifts:` namespace through the `Invalidator`, so an entry can
//! only outlive a write if invalidation itself failed, and then only until
//! its TTL runs out.
//!
//! Backends implement `CacheClient`:
//! - `UpstashClient`: Redis over the Upstash REST protocol
//! - `MemoryCache`: in-process backend with TTLs and glob SCAN

pub mod accessor;
pub mod client;
pub mod error;
pub mod invalidator;
pub mod key;
pub mod memory;
pub mod upstash;

pub use accessor::{CacheAside, CachedRead, ReadSource};
pub use client::CacheClient;
pub use error::CacheError;
pub use invalidator::Invalidator;
pub use key::{derive_key, namespace_pattern, KEY_PREFIX};
pub use memory::MemoryCache;
pub use upstash::UpstashClient;
