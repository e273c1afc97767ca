//! Incremental construction of a storage query from request configuration.

use crate::storage::{Predicate, QueryBuilder, SortDirection};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Wraps a storage query and mutates it in place. Every `apply_*` returns the
/// factory so calls chain; there is no rollback.
///
/// ```ignore
/// let mut qf = QueryFactory::new(storage.query(&template));
/// // "item" needs "item_id" on the root row; "id" is always selected.
/// let relations = HashMap::from([("item".to_string(), vec!["item_id".to_string()])]);
/// let nested = qf.apply_fields(&["name".into(), "item.item_name".into()], &["id".into()], &relations);
/// // nested == {"item": ["item_name"]}: build the item query from it.
/// qf.apply_query("status", &json!("open")).apply_sort("name", "DESC");
/// ```
pub struct QueryFactory<Q: ?Sized = dyn QueryBuilder> {
    query: Box<Q>,
}

/// Parse `key:value` tokens. Tokens without `:` are skipped; the value is
/// everything after the first `:`; a repeated key keeps its last value.
pub fn extract_simple_json_query(pairs: &[String]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl<Q: QueryBuilder + ?Sized> QueryFactory<Q> {
    pub fn new(query: Box<Q>) -> Self {
        QueryFactory { query }
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn into_query(self) -> Box<Q> {
        self.query
    }

    /// Split requested fields into root columns and relation sub-fields.
    ///
    /// - `"name"`: root column.
    /// - `"item"` (a known relation): the whole relation, empty sub-field list.
    /// - `"item.item_name"`: sub-field collected under `"item"`.
    /// - any other dotted field is dropped.
    ///
    /// A selected relation adds its dependency columns to the root projection,
    /// and `compulsory` columns are always added. An empty request, or one where
    /// every field was dropped and nothing is compulsory, leaves the projection
    /// untouched (all columns).
    pub fn apply_fields(
        &mut self,
        fields: &[String],
        compulsory: &[String],
        relations: &HashMap<String, Vec<String>>,
    ) -> HashMap<String, Vec<String>> {
        let mut relation_fields: HashMap<String, Vec<String>> = HashMap::new();
        if fields.is_empty() {
            return relation_fields;
        }
        let mut whole: HashSet<&str> = HashSet::new();
        let mut root: Vec<String> = Vec::new();
        for field in fields {
            let matched = relations.iter().find_map(|(relation, deps)| {
                if field == relation {
                    Some((relation, deps, None))
                } else {
                    field
                        .strip_prefix(relation.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        .map(|sub| (relation, deps, Some(sub)))
                }
            });
            if let Some((relation, deps, sub)) = matched {
                let entry = relation_fields.entry(relation.clone()).or_default();
                match sub {
                    None => {
                        whole.insert(relation.as_str());
                        entry.clear();
                    }
                    Some(sub) if !whole.contains(relation.as_str()) => entry.push(sub.to_string()),
                    Some(_) => {}
                }
                root.extend(deps.iter().cloned());
                continue;
            }
            if field.contains('.') {
                tracing::debug!(field = %field, "dropping field of unknown relation");
                continue;
            }
            root.push(field.clone());
        }
        root.extend(compulsory.iter().cloned());
        let mut seen = HashSet::new();
        root.retain(|f| seen.insert(f.clone()));
        if !root.is_empty() {
            self.query.select(root);
        }
        relation_fields
    }

    /// Scalar: `field = value`. Array: `field IN (values)`. Null or empty field: no-op.
    /// Objects would be operator filters, which are not supported: logged and ignored.
    pub fn apply_query(&mut self, field: &str, value: &Value) -> &mut Self {
        if field.is_empty() {
            return self;
        }
        match value {
            Value::Null => {}
            Value::String(_) | Value::Bool(_) | Value::Number(_) => self.query.filter(Predicate::Eq {
                field: field.to_string(),
                value: value.clone(),
            }),
            Value::Array(values) => self.query.filter(Predicate::In {
                field: field.to_string(),
                values: values.clone(),
            }),
            Value::Object(_) => {
                tracing::warn!(field = %field, value = %value, "unsupported filter value, ignoring");
            }
        }
        self
    }

    /// `["app:APP1", "platform:web"]` on `tags` gives
    /// `tags ->> 'app' = 'APP1' AND tags ->> 'platform' = 'web'`.
    pub fn apply_simple_json_query(&mut self, field: &str, pairs: &[String]) -> &mut Self {
        for (key, value) in extract_simple_json_query(pairs) {
            self.query.filter(Predicate::JsonEq {
                field: field.to_string(),
                key,
                value,
            });
        }
        self
    }

    pub fn apply_sort(&mut self, field: &str, direction: &str) -> &mut Self {
        match SortDirection::parse(direction) {
            Some(dir) => self.query.order(field.to_string(), dir),
            None => tracing::warn!(field = %field, direction = %direction, "wrong sort def, ignoring"),
        }
        self
    }

    /// `limit == 0` leaves the query unpaginated.
    pub fn paginate(&mut self, limit: u64, page: u64) -> &mut Self {
        if limit != 0 {
            self.query.limit(limit);
            self.query.offset(limit.saturating_mul(page));
        }
        self
    }
}
