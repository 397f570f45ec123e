//! Pure filtering and ordering of the shift collection.

pub mod filter;

pub use filter::apply;
