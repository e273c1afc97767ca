//! HTTP handlers for the query service operations.

pub mod query;
pub use query::*;
