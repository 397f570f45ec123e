//! In-process cache backend.
//!
//! Behaves like the Redis subset the query cache uses: values expire after
//! their TTL (measured on the tokio clock, so paused-time tests work), SCAN
//! walks keys in order with a numeric cursor and glob matching. Failure
//! switches let callers simulate an unreachable or read-only backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CacheClient, CacheError};

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<BTreeMap<String, Entry>>,
    unavailable: AtomicBool,
    reject_writes: AtomicBool,
    del_batches: Mutex<Vec<usize>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every command fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make SET fail while reads keep working.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Live (unexpired) keys in order.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.lock_entries()
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock_entries()
            .get(key)
            .map_or(false, |e| e.expires_at > now)
    }

    /// Sizes of the DEL calls received so far.
    pub fn del_batches(&self) -> Vec<usize> {
        self.del_batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::ServerError("memory cache marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.lock_entries();
        let found = entries.get(key).map(|e| (e.expires_at > now, e.value.clone()));
        match found {
            Some((true, value)) => Ok(Some(value)),
            Some((false, _)) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.check_available()?;
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Command {
                command: "SET".to_string(),
                message: "READONLY memory cache rejects writes".to_string(),
            });
        }
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        self.lock_entries().insert(key.to_string(), entry);
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>), CacheError> {
        self.check_available()?;
        let keys = self.keys();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(keys.len());
        let end = start.saturating_add(count.max(1)).min(keys.len());

        let matched = keys[start..end]
            .iter()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        let next = if end >= keys.len() { 0 } else { end as u64 };
        Ok((next, matched))
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        self.check_available()?;
        self.del_batches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(keys.len());

        let now = Instant::now();
        let mut entries = self.lock_entries();
        let removed = keys
            .iter()
            .filter_map(|k| entries.remove(k))
            .filter(|e| e.expires_at > now)
            .count();
        Ok(removed as u64)
    }
}

/// Redis-style glob: `*`, `?`, `[abc]`, `[a-z]`, `[^x]` and `\` escapes.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_at(&pattern, &text)
}

fn glob_match_at(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position after the last `*` and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p + 1, t));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match_class(pattern, p, text[t]),
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == text[t]).then_some(p + 2),
            Some(&c) => (c == text[t]).then_some(p + 1),
            None => None,
        };

        match (step, backtrack) {
            (Some(next), _) => {
                p = next;
                t += 1;
            }
            (None, Some((star_p, star_t))) => {
                p = star_p;
                t = star_t + 1;
                backtrack = Some((star_p, star_t + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match `c` against the class starting at `pattern[open]` (a `[`).
/// Returns the index after the closing `]` on a match.
fn match_class(pattern: &[char], open: usize, c: char) -> Option<usize> {
    let mut i = open + 1;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (lo, hi) = if pattern[i] <= pattern[i + 2] {
                (pattern[i], pattern[i + 2])
            } else {
                (pattern[i + 2], pattern[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    // Unterminated class: treat as no match
    if i >= pattern.len() {
        return None;
    }
    (matched != negate).then_some(i + 1)
}
