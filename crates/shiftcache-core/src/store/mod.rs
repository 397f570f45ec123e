//! File-backed system of record for shift data.
//!
//! The `RecordStore` owns the shift file. Every mutation is a whole-file
//! read-modify-write with no lock between the read and the write, so two
//! concurrent writers can lose an update. That is accepted for a
//! single-process admin tool.

pub mod records;

pub use records::{BatchOutcome, RecordStore};
