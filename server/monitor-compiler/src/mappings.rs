//! Index mapping walker: collects dotted field paths per mapping type.
//!
//! Feeds the field pickers (where-clause fields, metric fields, time fields).

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::enums::FieldType;
use crate::types::FieldRef;

/// Mapping type -> field paths.
pub type PathsPerType = BTreeMap<String, BTreeSet<String>>;

const DATE_TYPES: [&str; 2] = ["date", "date_nanos"];

/// Accepts a `_mapping` response (`{index: {mappings: ...}}`), a bare `mappings`
/// object, or a `properties` object.
pub fn paths_per_data_type(mappings: &Value) -> PathsPerType {
  let mut out = PathsPerType::new();
  let root = match mappings.as_object() {
    Some(root) => root,
    None => return out,
  };

  if let Some(props) = root.get("properties").and_then(Value::as_object) {
    walk(props, "", &mut out);
  } else if let Some(props) = root
    .get("mappings")
    .and_then(|m| m.get("properties"))
    .and_then(Value::as_object)
  {
    walk(props, "", &mut out);
  } else {
    for index in root.values() {
      if let Some(props) = index
        .get("mappings")
        .and_then(|m| m.get("properties"))
        .and_then(Value::as_object)
      {
        walk(props, "", &mut out);
      }
    }
  }
  out
}

fn walk(properties: &Map<String, Value>, prefix: &str, out: &mut PathsPerType) {
  for (name, field) in properties {
    let path = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{}.{}", prefix, name)
    };

    if let Some(nested) = field.get("properties").and_then(Value::as_object) {
      walk(nested, &path, out);
      continue;
    }
    if let Some(ty) = field.get("type").and_then(Value::as_str) {
      out.entry(ty.to_string()).or_default().insert(path.clone());
    }
    // Multi-fields, e.g. `message.keyword`.
    if let Some(sub) = field.get("fields").and_then(Value::as_object) {
      walk(sub, &path, out);
    }
  }
}

/// Typed field references for where-clause pickers, sorted by path.
pub fn where_field_refs(paths: &PathsPerType) -> Vec<FieldRef> {
  let mut refs: Vec<FieldRef> = paths
    .iter()
    .filter_map(|(ty, fields)| FieldType::from_mapping_type(ty).map(|t| (t, fields)))
    .flat_map(|(t, fields)| fields.iter().map(move |f| FieldRef::new(f.clone(), t)))
    .collect();
  refs.sort_by(|a, b| a.label.cmp(&b.label));
  refs
}

/// Numeric fields usable by avg/sum/min/max.
pub fn metric_fields(paths: &PathsPerType) -> Vec<String> {
  let mut fields: Vec<String> = paths
    .iter()
    .filter(|(ty, _)| FieldType::from_mapping_type(ty) == Some(FieldType::Number))
    .flat_map(|(_, fields)| fields.iter().cloned())
    .collect();
  fields.sort();
  fields
}

pub fn time_fields(paths: &PathsPerType) -> Vec<String> {
  let mut fields: Vec<String> = DATE_TYPES
    .iter()
    .filter_map(|ty| paths.get(*ty))
    .flat_map(|fields| fields.iter().cloned())
    .collect();
  fields.sort();
  fields
}
