//! Data models for the shift schedule.
//!
//! - `ShiftRecord`, `ShiftStatus`, `Role`: the records held in the shift file
//! - `QuerySpec`: filter parameters driving a read
//! - `ShiftPage`: a filtered, sorted result with its counts

pub mod query;
pub mod shift;

pub use query::QuerySpec;
pub use shift::{Role, ShiftPage, ShiftRecord, ShiftStatus};
