use super::path::{parse_path, parse_segment};
use crate::error::PathError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unordered map from string key to JSON value with path addressing.
///
/// Intermediate path segments must resolve to maps; `name[n]` indexes into an
/// existing sequence. Writes replace values but never grow a sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMap(Map<String, Value>);

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

fn mismatch(path: &str, expected: &str, v: &Value) -> PathError {
    PathError::InvalidType(format!("{} is {}, expected {}", path, kind(v), expected))
}

fn element<'a>(val: &'a Value, name: &str, index: usize) -> Result<&'a Value, PathError> {
    match val {
        Value::Null => Err(PathError::InvalidPath(format!("the field {} is empty", name))),
        Value::Array(arr) => arr.get(index).ok_or_else(|| {
            PathError::InvalidPath(format!("the index {} exceeds size of {}", index, name))
        }),
        _ => Err(PathError::InvalidPath(format!("the field {} is not an array", name))),
    }
}

fn element_mut<'a>(val: &'a mut Value, name: &str, index: usize) -> Result<&'a mut Value, PathError> {
    match val {
        Value::Null => Err(PathError::InvalidPath(format!("the field {} is empty", name))),
        Value::Array(arr) => arr.get_mut(index).ok_or_else(|| {
            PathError::InvalidPath(format!("the index {} exceeds size of {}", index, name))
        }),
        _ => Err(PathError::InvalidPath(format!("the field {} is not an array", name))),
    }
}

fn resolve_segment<'a>(parent: &'a Map<String, Value>, field: &str) -> Result<&'a Value, PathError> {
    let seg = parse_segment(field);
    let val = parent
        .get(seg.name)
        .ok_or_else(|| PathError::InvalidField(seg.name.to_string()))?;
    match seg.index {
        Some(index) => element(val, seg.name, index),
        None => Ok(val),
    }
}

fn resolve_segment_mut<'a>(parent: &'a mut Map<String, Value>, field: &str) -> Result<&'a mut Value, PathError> {
    let seg = parse_segment(field);
    let val = parent
        .get_mut(seg.name)
        .ok_or_else(|| PathError::InvalidField(seg.name.to_string()))?;
    match seg.index {
        Some(index) => element_mut(val, seg.name, index),
        None => Ok(val),
    }
}

impl PathMap {
    pub fn new() -> Self {
        PathMap(Map::new())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Insert under a literal top-level key (no path parsing).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    fn resolve_parent(&self, fields: &[&str]) -> Result<&Map<String, Value>, PathError> {
        let mut ptr = &self.0;
        for (i, field) in fields.iter().enumerate() {
            ptr = match resolve_segment(ptr, field)? {
                Value::Object(m) => m,
                _ => {
                    return Err(PathError::InvalidType(format!(
                        "path {} is not a map",
                        fields[..=i].join(".")
                    )))
                }
            };
        }
        Ok(ptr)
    }

    fn resolve_parent_mut(&mut self, fields: &[&str]) -> Result<&mut Map<String, Value>, PathError> {
        let mut ptr = &mut self.0;
        for (i, field) in fields.iter().enumerate() {
            ptr = match resolve_segment_mut(ptr, field)? {
                Value::Object(m) => m,
                _ => {
                    return Err(PathError::InvalidType(format!(
                        "path {} is not a map",
                        fields[..=i].join(".")
                    )))
                }
            };
        }
        Ok(ptr)
    }

    pub fn get(&self, path: &str) -> Result<&Value, PathError> {
        let (fields, last) = parse_path(path);
        if last.is_empty() {
            return Err(PathError::InvalidField(format!("empty leaf in '{}'", path)));
        }
        let parent = self.resolve_parent(&fields)?;
        resolve_segment(parent, last)
    }

    /// Value at `path`, or `default` when it cannot be resolved or is null.
    pub fn get_default(&self, path: &str, default: Value) -> Value {
        match self.get(path) {
            Ok(Value::Null) | Err(_) => default,
            Ok(v) => v.clone(),
        }
    }

    pub fn get_string(&self, path: &str) -> Result<&str, PathError> {
        match self.get(path)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(path, "string", other)),
        }
    }

    /// Empty strings fall back to `default` as well.
    pub fn get_string_default(&self, path: &str, default: &str) -> String {
        match self.get_string(path) {
            Ok(s) if !s.is_empty() => s.to_string(),
            _ => default.to_string(),
        }
    }

    /// Any numeric value, narrowed to i64. Floats truncate toward zero; values
    /// outside the i64 range saturate.
    pub fn get_int(&self, path: &str) -> Result<i64, PathError> {
        match self.get(path)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| PathError::InvalidType(format!("{} is not representable as int", path))),
            other => Err(mismatch(path, "number", other)),
        }
    }

    pub fn get_int_default(&self, path: &str, default: i64) -> i64 {
        self.get_int(path).unwrap_or(default)
    }

    pub fn get_float(&self, path: &str) -> Result<f64, PathError> {
        match self.get(path)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| PathError::InvalidType(format!("{} is not representable as float", path))),
            other => Err(mismatch(path, "number", other)),
        }
    }

    pub fn get_float_default(&self, path: &str, default: f64) -> f64 {
        self.get_float(path).unwrap_or(default)
    }

    pub fn get_bool(&self, path: &str) -> Result<bool, PathError> {
        match self.get(path)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(path, "bool", other)),
        }
    }

    pub fn get_bool_default(&self, path: &str, default: bool) -> bool {
        self.get_bool(path).unwrap_or(default)
    }

    pub fn get_map(&self, path: &str) -> Result<PathMap, PathError> {
        match self.get(path)? {
            Value::Object(m) => Ok(PathMap(m.clone())),
            other => Err(mismatch(path, "map", other)),
        }
    }

    pub fn get_map_default(&self, path: &str, default: PathMap) -> PathMap {
        self.get_map(path).unwrap_or(default)
    }

    pub fn get_array(&self, path: &str) -> Result<&[Value], PathError> {
        match self.get(path)? {
            Value::Array(arr) => Ok(arr),
            other => Err(mismatch(path, "array", other)),
        }
    }

    pub fn get_array_default(&self, path: &str, default: Vec<Value>) -> Vec<Value> {
        self.get_array(path).map(<[Value]>::to_vec).unwrap_or(default)
    }

    pub fn get_string_array(&self, path: &str) -> Result<Vec<String>, PathError> {
        self.get_array(path)?
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(mismatch(&format!("{}[{}]", path, i), "string", other)),
            })
            .collect()
    }

    pub fn get_string_array_default(&self, path: &str, default: Vec<String>) -> Vec<String> {
        self.get_string_array(path).unwrap_or(default)
    }

    /// String elements only; anything else is skipped. Unresolvable paths give an empty vec.
    pub fn get_string_array_safe(&self, path: &str) -> Vec<String> {
        self.get_array(path)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    pub fn get_map_array(&self, path: &str) -> Result<Vec<PathMap>, PathError> {
        self.get_array(path)?
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Object(m) => Ok(PathMap(m.clone())),
                other => Err(mismatch(&format!("{}[{}]", path, i), "map", other)),
            })
            .collect()
    }

    pub fn get_map_array_default(&self, path: &str, default: Vec<PathMap>) -> Vec<PathMap> {
        self.get_map_array(path).unwrap_or(default)
    }

    pub fn get_map_array_safe(&self, path: &str) -> Vec<PathMap> {
        self.get_array(path)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_object().map(|m| PathMap(m.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Create or replace the leaf of `path`. Parents must already exist; a
    /// bracketed leaf must address an existing slot. On error the map is unchanged.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<(), PathError> {
        let (fields, last) = parse_path(path);
        if last.is_empty() {
            return Err(PathError::InvalidField(format!("empty leaf in '{}'", path)));
        }
        let parent = self.resolve_parent_mut(&fields)?;
        let seg = parse_segment(last);
        match seg.index {
            Some(index) => {
                let arr = parent
                    .get_mut(seg.name)
                    .ok_or_else(|| PathError::InvalidPath(format!("the field {} is empty", seg.name)))?;
                *element_mut(arr, seg.name, index)? = value.into();
            }
            None => {
                parent.insert(last.to_string(), value.into());
            }
        }
        Ok(())
    }
}

impl From<Map<String, Value>> for PathMap {
    fn from(m: Map<String, Value>) -> Self {
        PathMap(m)
    }
}

impl From<PathMap> for Map<String, Value> {
    fn from(m: PathMap) -> Self {
        m.0
    }
}

impl From<PathMap> for Value {
    fn from(m: PathMap) -> Self {
        Value::Object(m.0)
    }
}

impl TryFrom<Value> for PathMap {
    type Error = PathError;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Object(m) => Ok(PathMap(m)),
            other => Err(mismatch("document root", "map", &other)),
        }
    }
}

impl FromIterator<(String, Value)> for PathMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        PathMap(iter.into_iter().collect())
    }
}
