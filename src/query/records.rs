//! Post-processing of fetched records holding JSON documents as text.

use crate::storage::Record;
use serde_json::Value;

/// Replace a string holding JSON text at `path` with the parsed document.
/// Missing paths, non-strings and unparsable text are left untouched.
pub fn convert_json_value(record: &mut Record, path: &str) {
    let parsed = match record.get(path) {
        Ok(Value::String(text)) => serde_json::from_str::<Value>(text).ok(),
        _ => None,
    };
    if let Some(doc) = parsed {
        let _ = record.set(path, doc);
    }
}

pub fn convert_json_values_in_records(records: &mut [Record], paths: &[String]) {
    for record in records.iter_mut() {
        for path in paths {
            convert_json_value(record, path);
        }
    }
}

/// Parse the JSON object at `path` (text or already decoded) and replace it
/// with its array under `key` (`path` when `key` is empty). Returns whether
/// that array is non-empty; a document without the array leaves an empty one.
pub fn extract_json_array(record: &mut Record, path: &str, key: &str) -> bool {
    let key = if key.is_empty() { path } else { key };
    let doc = match record.get(path) {
        Ok(Value::String(text)) => serde_json::from_str::<Value>(text).ok(),
        Ok(v) if v.is_object() => Some(v.clone()),
        _ => None,
    };
    let Some(doc) = doc.and_then(|d| Record::try_from(d).ok()) else {
        return false;
    };
    let arr = doc.get_array_default(key, Vec::new());
    let found = !arr.is_empty();
    let _ = record.set(path, Value::Array(arr));
    found
}

pub fn extract_json_array_in_records(records: &mut [Record], path: &str, key: &str) -> bool {
    records
        .iter_mut()
        .fold(false, |found, record| extract_json_array(record, path, key) || found)
}
