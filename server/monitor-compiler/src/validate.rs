//! Form validation rules applied before compiling.
//!
//! The compilers themselves assume well-formed input; these checks are what
//! callers run on submit.

use serde_json::Value;

use crate::config::Config;
use crate::enums::{AggregationType, MonitorType, ScheduleFrequency, SearchType};
use crate::error::CompileError;
use crate::operators;
use crate::query::extraction_query;
use crate::types::{MonitorFormValues, TriggerCondition, TriggerFormValues, WhereClause};

/// Check one bound of a range against the other.
///
/// `value` is the bound being edited; the start must not exceed the end and the
/// end must not fall below the start.
pub fn validate_range(value: f64, clause: &WhereClause) -> Result<(), CompileError> {
  if value.is_nan() {
    return Err(CompileError::validation("fieldRange", "required"));
  }
  if let Some(end) = clause.field_range_end {
    if value > end {
      return Err(CompileError::validation(
        "fieldRangeStart",
        "start must be less than end",
      ));
    }
  }
  if let Some(start) = clause.field_range_start {
    if value < start {
      return Err(CompileError::validation(
        "fieldRangeEnd",
        "end must be greater than start",
      ));
    }
  }
  Ok(())
}

fn value_is_empty(value: &Value) -> bool {
  match value {
    Value::Null => true,
    Value::String(s) => s.trim().is_empty(),
    _ => false,
  }
}

/// Where-clause invariants: at most one field, operator fits the field type,
/// ranges carry ordered bounds, null checks carry no value.
pub fn validate_where(clause: &WhereClause, config: &Config) -> Result<(), CompileError> {
  if clause.field_name.len() > config.max_where_filters {
    return Err(CompileError::validation(
      "where.fieldName",
      &format!("at most {} field(s)", config.max_where_filters),
    ));
  }
  let field = match clause.field() {
    Some(f) => f,
    None => return Ok(()),
  };
  if let Some(ty) = field.field_type {
    if !operators::is_valid(clause.operator, ty) {
      return Err(CompileError::validation(
        "where.operator",
        &format!(
          "{:?} is not available for {:?} fields",
          operators::spec(clause.operator).label,
          ty
        ),
      ));
    }
  }

  if clause.operator.is_range() {
    let (start, end) = match (clause.field_range_start, clause.field_range_end) {
      (Some(s), Some(e)) => (s, e),
      _ => return Err(CompileError::validation("where.fieldRange", "both bounds are required")),
    };
    validate_range(start, clause)?;
    validate_range(end, clause)?;
  } else if clause.operator.is_null_check() {
    if !value_is_empty(&clause.field_value) {
      return Err(CompileError::validation("where.fieldValue", "must be empty for null checks"));
    }
  } else if value_is_empty(&clause.field_value) {
    return Err(CompileError::validation("where.fieldValue", "required"));
  }
  Ok(())
}

/// Bucket-level condition list: capped length, no leading joiner, joiners after.
pub fn validate_trigger_conditions(
  conditions: &[TriggerCondition],
  config: &Config,
) -> Result<(), CompileError> {
  if conditions.is_empty() {
    return Err(CompileError::validation("triggerConditions", "at least one condition is required"));
  }
  if conditions.len() > config.max_trigger_conditions {
    return Err(CompileError::validation(
      "triggerConditions",
      &format!("at most {} conditions", config.max_trigger_conditions),
    ));
  }
  for (i, c) in conditions.iter().enumerate() {
    if c.query_metric.trim().is_empty() {
      return Err(CompileError::validation(
        &format!("triggerConditions[{}].queryMetric", i),
        "required",
      ));
    }
    match (i, c.and_or_condition) {
      (0, Some(_)) => {
        return Err(CompileError::validation(
          "triggerConditions[0].andOrCondition",
          "first condition cannot be joined",
        ))
      }
      (i, None) if i > 0 => {
        return Err(CompileError::validation(
          &format!("triggerConditions[{}].andOrCondition", i),
          "must be AND or OR",
        ))
      }
      _ => {}
    }
  }
  Ok(())
}

pub fn validate_extraction_query(text: &str) -> Result<Value, CompileError> {
  extraction_query(text)
}

/// Monitor form checks run on submit.
pub fn validate_monitor_form(values: &MonitorFormValues, config: &Config) -> Result<(), CompileError> {
  if values.name.trim().is_empty() {
    return Err(CompileError::validation("name", "required"));
  }
  if values.frequency == ScheduleFrequency::Weekly && values.schedule.weekly.selected().is_empty() {
    return Err(CompileError::validation("weekly", "select at least one day"));
  }
  let search = &values.search;
  match search.search_type {
    SearchType::Ad => {
      if search.detector_id.trim().is_empty() {
        return Err(CompileError::validation("detectorId", "required"));
      }
      return Ok(());
    }
    SearchType::Query => {
      validate_extraction_query(&values.query)?;
    }
    SearchType::Graph => {
      if search.time_field.trim().is_empty() {
        return Err(CompileError::validation("timeField", "required"));
      }
      if search.bucket_value == 0 {
        return Err(CompileError::validation("bucketValue", "must be positive"));
      }
      validate_where(&search.where_clause, config)?;
      match values.monitor_type {
        MonitorType::QueryLevelMonitor => {
          if search.aggregation_type != AggregationType::Count && search.field_name.is_empty() {
            return Err(CompileError::validation("fieldName", "required for this aggregation"));
          }
        }
        MonitorType::BucketLevelMonitor => {
          if search.group_by.is_empty() {
            return Err(CompileError::validation("groupBy", "at least one field is required"));
          }
          if search.aggregations.is_empty() {
            return Err(CompileError::validation("aggregations", "at least one metric is required"));
          }
        }
      }
    }
  }
  if values.index.is_empty() {
    return Err(CompileError::validation("index", "required"));
  }
  Ok(())
}

/// Trigger form checks run on submit, for the owning monitor's kind.
pub fn validate_trigger_form(
  trigger: &TriggerFormValues,
  monitor_type: MonitorType,
  search_type: SearchType,
  config: &Config,
) -> Result<(), CompileError> {
  if trigger.name.trim().is_empty() {
    return Err(CompileError::validation("name", "required"));
  }
  match (monitor_type, search_type) {
    (MonitorType::BucketLevelMonitor, SearchType::Query) => {
      crate::bucket_selector::raw_bucket_selector(&trigger.bucket_selector)?;
    }
    (MonitorType::BucketLevelMonitor, _) => {
      validate_trigger_conditions(&trigger.trigger_conditions, config)?;
      validate_where(&trigger.where_clause, config)?;
    }
    (MonitorType::QueryLevelMonitor, SearchType::Query) => {
      if trigger.script.source.trim().is_empty() {
        return Err(CompileError::validation("script.source", "required"));
      }
    }
    (MonitorType::QueryLevelMonitor, _) => {
      if !trigger.threshold_value.is_finite() {
        return Err(CompileError::validation("thresholdValue", "must be a number"));
      }
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::enums::{AndOr, FieldType, ThresholdEnum, WhereOperator};
  use crate::types::{FieldRef, SearchFields};
  use serde_json::json;

  fn range(start: f64, end: f64) -> WhereClause {
    WhereClause {
      field_name: vec![FieldRef::new("bytes", FieldType::Number)],
      operator: WhereOperator::InRange,
      field_range_start: Some(start),
      field_range_end: Some(end),
      ..WhereClause::default()
    }
  }

  fn cond(metric: &str, and_or: Option<AndOr>) -> TriggerCondition {
    TriggerCondition {
      query_metric: metric.into(),
      threshold_enum: ThresholdEnum::Above,
      threshold_value: 1.0,
      and_or_condition: and_or,
    }
  }

  #[test]
  fn range_start_after_end_is_rejected() {
    let err = validate_range(100.0, &range(100.0, 50.0)).unwrap_err();
    assert!(err.to_string().contains("start must be less than end"), "{}", err);
    assert!(validate_range(100.0, &range(100.0, 200.0)).is_ok());
  }

  #[test]
  fn end_before_start_is_rejected() {
    let clause = WhereClause {
      field_range_start: Some(10.0),
      field_range_end: None,
      ..range(0.0, 0.0)
    };
    assert!(validate_range(5.0, &clause).is_err());
  }

  #[test]
  fn where_operator_must_fit_type() {
    let mut clause = range(1.0, 2.0);
    clause.field_name = vec![FieldRef::new("ok", FieldType::Boolean)];
    assert!(validate_where(&clause, &Config::default()).is_err());
  }

  #[test]
  fn where_ranges_need_both_bounds() {
    let mut clause = range(1.0, 2.0);
    assert!(validate_where(&clause, &Config::default()).is_ok());
    clause.field_range_end = None;
    assert!(validate_where(&clause, &Config::default()).is_err());
  }

  #[test]
  fn null_checks_take_no_value() {
    let mut clause = WhereClause {
      field_name: vec![FieldRef::new("user", FieldType::Keyword)],
      operator: WhereOperator::IsNull,
      ..WhereClause::default()
    };
    assert!(validate_where(&clause, &Config::default()).is_ok());
    clause.field_value = json!("bob");
    assert!(validate_where(&clause, &Config::default()).is_err());
  }

  #[test]
  fn at_most_one_where_field() {
    let clause = WhereClause {
      field_name: vec![
        FieldRef::new("a", FieldType::Keyword),
        FieldRef::new("b", FieldType::Keyword),
      ],
      field_value: json!("x"),
      ..WhereClause::default()
    };
    assert!(validate_where(&clause, &Config::default()).is_err());
  }

  #[test]
  fn condition_cap_and_joiners() {
    let config = Config::default();
    let ok = vec![cond("a", None), cond("b", Some(AndOr::Or))];
    assert!(validate_trigger_conditions(&ok, &config).is_ok());

    let leading = vec![cond("a", Some(AndOr::And))];
    assert!(validate_trigger_conditions(&leading, &config).is_err());

    let missing = vec![cond("a", None), cond("b", None)];
    assert!(validate_trigger_conditions(&missing, &config).is_err());

    let mut six = vec![cond("a", None)];
    six.extend((0..5).map(|i| cond(&format!("m{}", i), Some(AndOr::And))));
    let err = validate_trigger_conditions(&six, &config).unwrap_err();
    assert!(err.to_string().contains("at most 5"));
  }

  #[test]
  fn monitor_form_requires_metric_field_for_non_count() {
    let mut values = MonitorFormValues {
      name: "errors".into(),
      index: vec!["logs-*".into()],
      search: SearchFields {
        time_field: "@timestamp".into(),
        aggregation_type: AggregationType::Avg,
        ..SearchFields::default()
      },
      ..MonitorFormValues::default()
    };
    assert!(validate_monitor_form(&values, &Config::default()).is_err());
    values.search.field_name = vec![FieldRef::untyped("latency")];
    assert!(validate_monitor_form(&values, &Config::default()).is_ok());
  }

  #[test]
  fn weekly_schedule_needs_a_day() {
    let mut values = MonitorFormValues {
      name: "weekly".into(),
      index: vec!["logs-*".into()],
      frequency: ScheduleFrequency::Weekly,
      search: SearchFields {
        time_field: "@timestamp".into(),
        ..SearchFields::default()
      },
      ..MonitorFormValues::default()
    };
    let err = validate_monitor_form(&values, &Config::default()).unwrap_err();
    assert!(matches!(err, CompileError::Validation { ref field, .. } if field == "weekly"));

    values.schedule.weekly.fri = true;
    assert!(validate_monitor_form(&values, &Config::default()).is_ok());
  }

  #[test]
  fn monitor_form_surfaces_query_syntax() {
    let values = MonitorFormValues {
      name: "raw".into(),
      index: vec!["logs-*".into()],
      query: "{ \"query\": ".into(),
      search: SearchFields { search_type: SearchType::Query, ..SearchFields::default() },
      ..MonitorFormValues::default()
    };
    assert!(matches!(
      validate_monitor_form(&values, &Config::default()).unwrap_err(),
      CompileError::InvalidQuerySyntax(_)
    ));
  }
}
