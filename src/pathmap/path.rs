//! Path grammar: `path ::= segment ("." segment)*`, `segment ::= name | name "[" digits "]"`.

use once_cell::sync::Lazy;
use regex::Regex;

static INDEXED_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[]+)\[(\d+)\]$").expect("indexed segment pattern"));

/// One path segment: a key, optionally indexing into the sequence stored under it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    pub name: &'a str,
    pub index: Option<usize>,
}

/// Parse `name[n]`. Anything else, including a malformed bracket, is a literal key.
pub fn parse_segment(field: &str) -> Segment<'_> {
    if let Some(caps) = INDEXED_SEGMENT.captures(field) {
        if let (Some(name), Some(index)) = (caps.get(1), caps.get(2)) {
            if let Ok(index) = index.as_str().parse::<usize>() {
                return Segment {
                    name: name.as_str(),
                    index: Some(index),
                };
            }
        }
    }
    Segment { name: field, index: None }
}

/// Split a path into its intermediate segments and the leaf segment.
pub fn parse_path(path: &str) -> (Vec<&str>, &str) {
    let mut fields: Vec<&str> = path.split('.').collect();
    let last = fields.pop().unwrap_or("");
    (fields, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_leaf_from_parents() {
        assert_eq!(parse_path("a.b.c"), (vec!["a", "b"], "c"));
        assert_eq!(parse_path("a"), (vec![], "a"));
        assert_eq!(parse_path(""), (vec![], ""));
    }

    #[test]
    fn indexed_segments() {
        assert_eq!(parse_segment("arr[2]"), Segment { name: "arr", index: Some(2) });
        assert_eq!(parse_segment("arr[0]"), Segment { name: "arr", index: Some(0) });
    }

    #[test]
    fn malformed_brackets_are_literal_keys() {
        for field in ["arr[x]", "[2]", "arr[2]b", "arr[-1]", "arr[]", "a[1][2]"] {
            assert_eq!(parse_segment(field), Segment { name: field, index: None }, "{field}");
        }
        let huge = "arr[99999999999999999999999]";
        assert_eq!(parse_segment(huge).index, None);
    }
}
