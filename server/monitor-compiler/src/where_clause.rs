//! Where-clause compiler: one field/operator/value triple -> query filter fragment.
//!
//! Also maps the clause onto a bucket-level `composite_agg_filter` and back.

use serde_json::{json, Map, Value};

use crate::enums::{FieldType, WhereOperator};
use crate::error::CompileError;
use crate::operators;
use crate::types::{CompositeAggFilter, FieldRef, WhereClause};

/// Compile a where-clause into a filter fragment.
///
/// Returns `None` when no field is selected; that is the common "no filter" case.
pub fn compile_where(clause: &WhereClause) -> Option<Value> {
  let field = clause.field()?;
  let spec = operators::spec(clause.operator);
  Some((spec.render)(field, clause))
}

fn keyed(key: &str, value: Value) -> Value {
  let mut map = Map::new();
  map.insert(key.to_string(), value);
  Value::Object(map)
}

fn must_not(fragment: Value) -> Value {
  json!({ "bool": { "must_not": fragment } })
}

fn is_text(field: &FieldRef) -> bool {
  field.field_type == Some(FieldType::Text)
}

fn range(field: &FieldRef, bounds: Value) -> Value {
  json!({ "range": keyed(&field.label, bounds) })
}

// ---------------------------------------------------------------------------
// Per-operator renderers (wired up in the operator catalogue)
// ---------------------------------------------------------------------------

pub(crate) fn is(field: &FieldRef, clause: &WhereClause) -> Value {
  let kind = if is_text(field) { "match_phrase" } else { "term" };
  keyed(kind, keyed(&field.label, clause.field_value.clone()))
}

pub(crate) fn is_not(field: &FieldRef, clause: &WhereClause) -> Value {
  must_not(is(field, clause))
}

pub(crate) fn is_null(field: &FieldRef, clause: &WhereClause) -> Value {
  must_not(is_not_null(field, clause))
}

pub(crate) fn is_not_null(field: &FieldRef, _clause: &WhereClause) -> Value {
  json!({ "exists": { "field": field.label } })
}

pub(crate) fn is_greater(field: &FieldRef, clause: &WhereClause) -> Value {
  range(field, json!({ "gt": clause.field_value }))
}

pub(crate) fn is_greater_equal(field: &FieldRef, clause: &WhereClause) -> Value {
  range(field, json!({ "gte": clause.field_value }))
}

pub(crate) fn is_less(field: &FieldRef, clause: &WhereClause) -> Value {
  range(field, json!({ "lt": clause.field_value }))
}

pub(crate) fn is_less_equal(field: &FieldRef, clause: &WhereClause) -> Value {
  range(field, json!({ "lte": clause.field_value }))
}

pub(crate) fn in_range(field: &FieldRef, clause: &WhereClause) -> Value {
  range(
    field,
    json!({ "gte": clause.field_range_start, "lte": clause.field_range_end }),
  )
}

pub(crate) fn not_in_range(field: &FieldRef, clause: &WhereClause) -> Value {
  must_not(in_range(field, clause))
}

pub(crate) fn starts_with(field: &FieldRef, clause: &WhereClause) -> Value {
  json!({ "prefix": keyed(&field.label, Value::String(clause.value_text())) })
}

pub(crate) fn ends_with(field: &FieldRef, clause: &WhereClause) -> Value {
  let pattern = format!("*{}", clause.value_text());
  json!({ "wildcard": keyed(&field.label, Value::String(pattern)) })
}

pub(crate) fn contains(field: &FieldRef, clause: &WhereClause) -> Value {
  let pattern = format!("*{}*", clause.value_text());
  if is_text(field) {
    json!({ "query_string": { "query": pattern, "default_field": field.label } })
  } else {
    json!({ "wildcard": keyed(&field.label, Value::String(pattern)) })
  }
}

pub(crate) fn does_not_contain(field: &FieldRef, clause: &WhereClause) -> Value {
  must_not(contains(field, clause))
}

// ---------------------------------------------------------------------------
// Bucket-level composite_agg_filter
// ---------------------------------------------------------------------------

/// Map a where-clause onto single-field include/exclude semantics.
///
/// `Ok(None)` when no field is selected; the caller omits the key entirely.
pub fn composite_agg_filter(clause: &WhereClause) -> Result<Option<CompositeAggFilter>, CompileError> {
  let field = match clause.field() {
    Some(f) => f,
    None => return Ok(None),
  };
  let text = clause.value_text();
  let (mode, pattern) = match clause.operator {
    WhereOperator::Is => ("include", clause.field_value.clone()),
    WhereOperator::IsNot => ("exclude", clause.field_value.clone()),
    WhereOperator::Contains => ("include", Value::String(format!(".*{}.*", text))),
    WhereOperator::DoesNotContain => ("exclude", Value::String(format!(".*{}.*", text))),
    WhereOperator::StartsWith => ("include", Value::String(format!("{}.*", text))),
    WhereOperator::EndsWith => ("include", Value::String(format!(".*{}", text))),
    other => {
      return Err(CompileError::validation(
        "where.operator",
        &format!("{} is not supported by bucket-level filters", operators::spec(other).label),
      ))
    }
  };

  let mut inner = std::collections::BTreeMap::new();
  inner.insert(mode.to_string(), pattern);
  let mut filter = CompositeAggFilter::new();
  filter.insert(field.label.clone(), inner);
  Ok(Some(filter))
}

/// Rebuild a keyword where-clause from a persisted `composite_agg_filter`.
pub fn where_from_composite_filter(filter: &CompositeAggFilter) -> Option<WhereClause> {
  let (field, modes) = filter.iter().next()?;
  let (mode, pattern) = modes.iter().next()?;
  let include = match mode.as_str() {
    "include" => true,
    "exclude" => false,
    _ => return None,
  };

  let (operator, field_value) = match pattern.as_str() {
    Some(p) => {
      let inner = p.strip_prefix(".*").and_then(|rest| rest.strip_suffix(".*"));
      if let Some(inner) = inner {
        let op = if include { WhereOperator::Contains } else { WhereOperator::DoesNotContain };
        (op, Value::String(inner.to_string()))
      } else if let (true, Some(prefix)) = (include, p.strip_suffix(".*")) {
        (WhereOperator::StartsWith, Value::String(prefix.to_string()))
      } else if let (true, Some(suffix)) = (include, p.strip_prefix(".*")) {
        (WhereOperator::EndsWith, Value::String(suffix.to_string()))
      } else {
        (equality(include), pattern.clone())
      }
    }
    None => (equality(include), pattern.clone()),
  };

  Some(WhereClause {
    field_name: vec![FieldRef::new(field.clone(), FieldType::Keyword)],
    operator,
    field_value,
    field_range_start: None,
    field_range_end: None,
  })
}

fn equality(include: bool) -> WhereOperator {
  if include {
    WhereOperator::Is
  } else {
    WhereOperator::IsNot
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn clause(field: &str, ty: FieldType, op: WhereOperator, value: Value) -> WhereClause {
    WhereClause {
      field_name: vec![FieldRef::new(field, ty)],
      operator: op,
      field_value: value,
      ..WhereClause::default()
    }
  }

  #[test]
  fn no_field_means_no_filter() {
    assert_eq!(compile_where(&WhereClause::default()), None);
  }

  #[test]
  fn is_uses_phrase_on_text_and_term_otherwise() {
    let text = clause("message", FieldType::Text, WhereOperator::Is, json!("timed out"));
    assert_eq!(
      compile_where(&text),
      Some(json!({ "match_phrase": { "message": "timed out" } }))
    );
    let kw = clause("host", FieldType::Keyword, WhereOperator::Is, json!("web-1"));
    assert_eq!(compile_where(&kw), Some(json!({ "term": { "host": "web-1" } })));
  }

  #[test]
  fn is_not_wraps_in_must_not() {
    let c = clause("status", FieldType::Number, WhereOperator::IsNot, json!(500));
    assert_eq!(
      compile_where(&c),
      Some(json!({ "bool": { "must_not": { "term": { "status": 500 } } } }))
    );
  }

  #[test]
  fn null_checks_use_exists() {
    let not_null = clause("user", FieldType::Keyword, WhereOperator::IsNotNull, Value::Null);
    assert_eq!(compile_where(&not_null), Some(json!({ "exists": { "field": "user" } })));
    let null = clause("user", FieldType::Keyword, WhereOperator::IsNull, Value::Null);
    assert_eq!(
      compile_where(&null),
      Some(json!({ "bool": { "must_not": { "exists": { "field": "user" } } } }))
    );
  }

  #[test]
  fn comparisons_map_to_range_bounds() {
    let cases = [
      (WhereOperator::IsGreater, "gt"),
      (WhereOperator::IsGreaterEqual, "gte"),
      (WhereOperator::IsLess, "lt"),
      (WhereOperator::IsLessEqual, "lte"),
    ];
    for (op, bound) in cases {
      let c = clause("bytes", FieldType::Number, op, json!(1024));
      let expected = json!({ "range": { "bytes": { bound: 1024 } } });
      assert_eq!(compile_where(&c), Some(expected), "{:?}", op);
    }
  }

  #[test]
  fn ranges_are_inclusive_and_negatable() {
    let mut c = clause("bytes", FieldType::Number, WhereOperator::InRange, Value::Null);
    c.field_range_start = Some(10.0);
    c.field_range_end = Some(20.0);
    assert_eq!(
      compile_where(&c),
      Some(json!({ "range": { "bytes": { "gte": 10.0, "lte": 20.0 } } }))
    );
    c.operator = WhereOperator::NotInRange;
    assert_eq!(
      compile_where(&c),
      Some(json!({ "bool": { "must_not": { "range": { "bytes": { "gte": 10.0, "lte": 20.0 } } } } }))
    );
  }

  #[test]
  fn string_patterns() {
    let sw = clause("path", FieldType::Keyword, WhereOperator::StartsWith, json!("/api"));
    assert_eq!(compile_where(&sw), Some(json!({ "prefix": { "path": "/api" } })));
    let ew = clause("path", FieldType::Keyword, WhereOperator::EndsWith, json!(".png"));
    assert_eq!(compile_where(&ew), Some(json!({ "wildcard": { "path": "*.png" } })));
  }

  #[test]
  fn contains_is_type_sensitive() {
    let text = clause("message", FieldType::Text, WhereOperator::Contains, json!("error"));
    assert_eq!(
      compile_where(&text),
      Some(json!({ "query_string": { "query": "*error*", "default_field": "message" } }))
    );
    let kw = clause("host", FieldType::Keyword, WhereOperator::DoesNotContain, json!("canary"));
    assert_eq!(
      compile_where(&kw),
      Some(json!({ "bool": { "must_not": { "wildcard": { "host": "*canary*" } } } }))
    );
  }

  #[test]
  fn every_catalogued_pair_compiles_to_an_object() {
    for spec in operators::OPERATORS.iter() {
      for ty in spec.applicable {
        let mut c = clause("f", *ty, spec.operator, json!("v"));
        c.field_range_start = Some(1.0);
        c.field_range_end = Some(2.0);
        let fragment = compile_where(&c).unwrap();
        assert!(fragment.is_object(), "{:?}/{:?}", spec.operator, ty);
      }
    }
  }

  #[test]
  fn composite_filter_include_exclude() {
    let c = clause("region", FieldType::Keyword, WhereOperator::IsNot, json!("us-east-1"));
    let filter = composite_agg_filter(&c).unwrap().unwrap();
    assert_eq!(
      serde_json::to_value(&filter).unwrap(),
      json!({ "region": { "exclude": "us-east-1" } })
    );
    assert_eq!(composite_agg_filter(&WhereClause::default()).unwrap(), None);
  }

  #[test]
  fn composite_filter_rejects_numeric_operators() {
    let c = clause("bytes", FieldType::Number, WhereOperator::IsGreater, json!(1));
    assert!(composite_agg_filter(&c).is_err());
  }

  #[test]
  fn composite_filter_reverses() {
    for op in [
      WhereOperator::Is,
      WhereOperator::IsNot,
      WhereOperator::Contains,
      WhereOperator::DoesNotContain,
      WhereOperator::StartsWith,
      WhereOperator::EndsWith,
    ] {
      let c = clause("region", FieldType::Keyword, op, json!("eu"));
      let filter = composite_agg_filter(&c).unwrap().unwrap();
      assert_eq!(where_from_composite_filter(&filter), Some(c), "{:?}", op);
    }
  }
}
