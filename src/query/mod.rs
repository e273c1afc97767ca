//! Query construction from dynamic configuration and record post-processing.

mod factory;
pub mod records;

pub use factory::{extract_simple_json_query, QueryFactory};
pub use records::{convert_json_value, convert_json_values_in_records, extract_json_array, extract_json_array_in_records};
