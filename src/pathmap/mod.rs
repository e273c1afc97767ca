//! String-keyed dynamic document addressed by dotted/bracketed paths.
//!
//! Meant for untyped documents such as request options decoded from JSON:
//! `options.get_string("filter.status")`, `options.get_int("items[1].qty")`.

mod map;
pub mod path;

pub use map::PathMap;
pub use path::{parse_path, parse_segment, Segment};
