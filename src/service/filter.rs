//! Filter and sort documents applied through the model whitelist.

use crate::config::Whitelist;
use crate::pathmap::PathMap;
use crate::query::QueryFactory;
use crate::storage::QueryBuilder;
use serde_json::Value;

/// Apply the whitelisted keys of `filter`; every other key is ignored.
/// JSON fields take `key:value` tokens, other fields a scalar or an array.
/// Returns whether at least one predicate was added.
pub fn apply_filter<Q: QueryBuilder + ?Sized>(
    qf: &mut QueryFactory<Q>,
    filter: &PathMap,
    whitelist: &Whitelist,
) -> bool {
    let before = qf.query().parts().predicates.len();
    for (field, spec) in whitelist {
        if spec.is_json_field {
            let tokens = filter.get_string_array_safe(field);
            if tokens.is_empty() {
                continue;
            }
            qf.apply_simple_json_query(field, &tokens);
        } else {
            let value = filter.get_default(field, Value::Null);
            if value.is_null() {
                continue;
            }
            qf.apply_query(field, &value);
        }
    }
    qf.query().parts().predicates.len() > before
}

/// Order by each whitelisted key of `sort`, in document order. A missing or
/// non-string direction means `ASC`.
pub fn apply_sort_defs<Q: QueryBuilder + ?Sized>(
    qf: &mut QueryFactory<Q>,
    sort: &PathMap,
    whitelist: &Whitelist,
) {
    for field in sort.keys() {
        if !whitelist.contains_key(field) {
            tracing::warn!(field = %field, "sort on non-whitelisted field, ignoring");
            continue;
        }
        let direction = sort.get_string_default(field, "ASC");
        qf.apply_sort(field, &direction);
    }
}
