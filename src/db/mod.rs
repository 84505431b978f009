//! Database access for pickup points

pub mod queries;

pub use queries::*;
