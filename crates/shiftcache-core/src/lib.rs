//! Shift schedule data access with a cache-aside query layer.
//!
//! The shift file is the system of record (`store`). Reads are filtered and
//! sorted (`query`) behind a Redis-backed cache (`cache`); every write clears
//! the cached queries. `service::ShiftService` is the entry point for
//! callers.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod service;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::ShiftError;
pub use models::{QuerySpec, Role, ShiftPage, ShiftRecord, ShiftStatus};
pub use service::{BatchUpdateResult, ShiftService, ShiftsResponse, UpdateResult};
pub use store::RecordStore;
