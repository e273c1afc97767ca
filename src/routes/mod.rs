//! Routers built from [`crate::AppState`].

mod query;
pub use query::{query_routes, MAX_OPTIONS_BYTES};
