//! shiftcache - list and decide caregiver shifts from the command line.
//!
//! Reads go through the shared query cache, writes clear it, exactly as
//! the admin UI's server functions do. Results are printed as JSON.

use std::io;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shiftcache_core::models::query::DATE_FORMAT;
use shiftcache_core::{Config, QuerySpec, Role, ShiftService, ShiftStatus};

const USAGE: &str = "\
Usage: shiftcache <command> [options]

Commands:
  list [--caregiver NAME] [--status STATUS] [--role ROLE] [--from YYYY-MM-DD] [--to YYYY-MM-DD]
  confirm [--actor ID] <shift-id>...
  decline [--actor ID] <shift-id>...
  invalidate

Environment:
  UPSTASH_REDIS_REST_URL, UPSTASH_REDIS_REST_TOKEN  (required)
  SHIFTS_DATA_PATH, SHIFTS_CACHE_TTL_SECS, RUST_LOG (optional)";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Split `--name value` pairs from positional arguments.
fn split_flags(args: &[String]) -> Result<(Vec<(&str, &str)>, Vec<&str>)> {
    let mut flags = Vec::new();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if let Some(name) = arg.strip_prefix("--") {
            let value = iter
                .next()
                .with_context(|| format!("Missing value for --{}", name))?;
            flags.push((name, value.as_str()));
        } else {
            positional.push(arg.as_str());
        }
    }

    Ok((flags, positional))
}

fn parse_query(args: &[String]) -> Result<QuerySpec> {
    let (flags, positional) = split_flags(args)?;
    if let Some(extra) = positional.first() {
        bail!("Unexpected argument: {}", extra);
    }

    let mut params = Vec::with_capacity(flags.len());
    for (name, value) in flags {
        let param = match name {
            "caregiver" => "caregiver",
            "status" => {
                value.parse::<ShiftStatus>().map_err(anyhow::Error::msg)?;
                "status"
            }
            "role" => {
                value.parse::<Role>().map_err(anyhow::Error::msg)?;
                "role"
            }
            "from" | "to" => {
                NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
                    .with_context(|| format!("Invalid date for --{}: {} (expected YYYY-MM-DD)", name, value))?;
                if name == "from" { "date_from" } else { "date_to" }
            }
            other => bail!("Unknown option for list: --{}", other),
        };
        params.push((param, value));
    }

    Ok(QuerySpec::from_params(params))
}

/// Apply a decision to one or more shifts. Returns whether it succeeded.
async fn decide(service: &ShiftService, status: ShiftStatus, args: &[String]) -> Result<bool> {
    let (flags, ids) = split_flags(args)?;

    let mut actor = None;
    for (name, value) in flags {
        match name {
            "actor" => actor = Some(value),
            other => bail!("Unknown option: --{}", other),
        }
    }

    if let [id] = ids.as_slice() {
        let result = service.update_shift_status(id, status, actor).await;
        print_json(&result)?;
        Ok(result.success)
    } else {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let result = service.batch_update_shifts(&ids, status, actor).await;
        print_json(&result)?;
        Ok(result.success)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    if command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(data_path = %config.data_path.display(), "shiftcache starting");
    let service = ShiftService::from_config(&config)?;

    let success = match command.as_str() {
        "list" => {
            let spec = parse_query(rest)?;
            let response = service
                .get_shifts(&spec)
                .await
                .context("Failed to read shifts")?;
            print_json(&response)?;
            true
        }
        "confirm" => decide(&service, ShiftStatus::Confirmed, rest).await?,
        "decline" => decide(&service, ShiftStatus::Declined, rest).await?,
        "invalidate" => {
            let deleted = service.invalidate_queries().await;
            print_json(&serde_json::json!({ "deleted": deleted }))?;
            true
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    };

    // Let detached cache writes land before the runtime goes away
    service.shutdown().await;

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
