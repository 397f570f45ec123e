use sha2::{Digest, Sha256};

use crate::models::QuerySpec;

/// Prefix shared by every cached shift query.
pub const KEY_PREFIX: &str = "shifts:";

/// Derive the cache key for a query.
///
/// The key is `shifts:` followed by the hex SHA-256 of the normalized fields
/// serialized as a JSON object with sorted names. Specs that normalize to the
/// same fields and values always get the same key.
pub fn derive_key(spec: &QuerySpec) -> String {
    // BTreeMap serializes in key order
    let canonical = serde_json::to_string(&spec.normalized()).unwrap_or_else(|_| "{}".to_string());
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}{}", KEY_PREFIX, hex::encode(digest))
}

/// Glob matching every key in the shift query namespace.
pub fn namespace_pattern() -> String {
    format!("{}*", KEY_PREFIX)
}
