//! QueryService: model dispatch, whitelist filtering, and the typed client.

mod client;
mod dispatcher;
pub mod filter;

pub use client::{QueryClient, QueryTransport};
pub use dispatcher::{QueryService, DEFAULT_REQUEST_TIMEOUT};
pub use filter::{apply_filter, apply_sort_defs};
