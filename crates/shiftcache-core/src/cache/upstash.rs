//! Redis client speaking the Upstash REST protocol.
//!
//! Each command is POSTed as a JSON array (`["GET", "shifts:abc"]`) to the
//! endpoint with a bearer token. Replies are `{"result": ...}` on success
//! and `{"error": "..."}` when Redis rejects the command.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{CacheClient, CacheError};
use crate::config::CacheConfig;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Bounds a single cache round trip; reads fall back to the file when it expires.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retries for transient failures (network, 429, 5xx).
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds, doubled on each retry.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Upper bound on a single backoff delay.
const MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

/// Upstash REST client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct UpstashClient {
    client: Client,
    url: String,
    token: String,
}

impl UpstashClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self, CacheError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self, CacheError> {
        Self::new(config.url.clone(), config.token.clone())
    }

    /// Delay before retry number `retry`, counted from 0: 1 s, 2 s, 4 s, ...
    fn backoff_ms(retry: u32) -> u64 {
        INITIAL_BACKOFF_MS
            .saturating_mul(1u64 << retry.min(16))
            .min(MAX_BACKOFF_MS)
    }

    async fn send_once(&self, args: &[Value]) -> Result<Value, CacheError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Rejected commands come back as 400 with an error body
        let reply = serde_json::from_str::<CommandReply>(&body).ok();
        if let Some(message) = reply.as_ref().and_then(|r| r.error.clone()) {
            return Err(CacheError::Command {
                command: command_name(args),
                message,
            });
        }

        if !status.is_success() {
            return Err(CacheError::from_status(status, &body));
        }

        reply
            .map(|r| r.result)
            .ok_or_else(|| CacheError::InvalidResponse(format!("Unparseable reply to {}", command_name(args))))
    }

    /// Run one command, retrying transient failures with exponential backoff.
    async fn command(&self, args: Vec<Value>) -> Result<Value, CacheError> {
        let mut retries = 0;

        loop {
            match self.send_once(&args).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && retries < MAX_RETRIES => {
                    let backoff_ms = Self::backoff_ms(retries);
                    retries += 1;
                    warn!(command = %command_name(&args), retry = retries, backoff_ms = backoff_ms, error = %e, "Cache command failed, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn command_name(args: &[Value]) -> String {
    args.first()
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string()
}

fn parse_get_reply(result: Value) -> Result<Option<String>, CacheError> {
    match result {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(CacheError::InvalidResponse(format!("GET returned {}", other))),
    }
}

fn parse_cursor(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn parse_scan_reply(result: Value) -> Result<(u64, Vec<String>), CacheError> {
    let invalid = || CacheError::InvalidResponse("SCAN reply is not [cursor, keys]".to_string());

    let parts = result.as_array().ok_or_else(invalid)?;
    let [cursor, keys] = parts.as_slice() else {
        return Err(invalid());
    };

    let cursor = parse_cursor(cursor).ok_or_else(invalid)?;
    let keys = keys
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .filter_map(|k| k.as_str().map(str::to_string))
        .collect();

    Ok((cursor, keys))
}

#[async_trait]
impl CacheClient for UpstashClient {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        parse_get_reply(self.command(vec![json!("GET"), json!(key)]).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let result = self
            .command(vec![json!("SET"), json!(key), json!(value), json!("EX"), json!(ttl_secs)])
            .await?;
        match result.as_str() {
            Some("OK") => Ok(()),
            _ => Err(CacheError::InvalidResponse(format!("SET returned {}", result))),
        }
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>), CacheError> {
        let result = self
            .command(vec![
                json!("SCAN"),
                json!(cursor.to_string()),
                json!("MATCH"),
                json!(pattern),
                json!("COUNT"),
                json!(count),
            ])
            .await?;
        let (next, keys) = parse_scan_reply(result)?;
        debug!(cursor = cursor, next = next, found = keys.len(), "SCAN step");
        Ok((next, keys))
    }

    async fn del(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push(json!("DEL"));
        args.extend(keys.iter().map(|k| json!(k)));

        let result = self.command(args).await?;
        result
            .as_u64()
            .ok_or_else(|| CacheError::InvalidResponse(format!("DEL returned {}", result)))
    }
}
