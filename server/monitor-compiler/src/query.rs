//! Aggregation query builder: metric fragment, persisted and preview queries.
//!
//! Persisted queries use `{{period_end}}` placeholders that the backend resolves
//! at execution time. Preview queries resolve the window against a caller-supplied
//! `now` and span `preview_bucket_count` buckets.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::enums::{AggregationType, MonitorType, SearchType};
use crate::error::CompileError;
use crate::types::{Input, MonitorFormValues, Period, SearchFields, SearchInput, COMPOSITE_AGG_NAME};
use crate::where_clause::compile_where;

pub const WHEN_AGG_NAME: &str = "when";
pub const OVER_AGG_NAME: &str = "over";
pub const MAX_ANOMALY_GRADE_AGG: &str = "max_anomaly_grade";

/// Time window of a query's range filter.
#[derive(Debug, Clone, Copy)]
enum Window {
  /// Relative to the backend's `{{period_end}}` placeholder.
  PeriodEnd { amount: u32, suffix: &'static str },
  /// Absolute, in epoch millis.
  Absolute { from: DateTime<Utc>, to: DateTime<Utc> },
}

fn time_filter(time_field: &str, window: Window) -> Value {
  let bounds = match window {
    Window::PeriodEnd { amount, suffix } => json!({
      "gte": format!("{{{{period_end}}}}||-{}{}", amount, suffix),
      "lte": "{{period_end}}",
      "format": "epoch_millis",
    }),
    Window::Absolute { from, to } => json!({
      "gte": from.timestamp_millis(),
      "lte": to.timestamp_millis(),
      "format": "epoch_millis",
    }),
  };
  let mut field = Map::new();
  field.insert(time_field.to_string(), bounds);
  json!({ "range": field })
}

fn filters(search: &SearchFields, window: Window) -> Vec<Value> {
  let mut filters = vec![time_filter(&search.time_field, window)];
  if let Some(where_fragment) = compile_where(&search.where_clause) {
    filters.push(where_fragment);
  }
  filters
}

fn period_end_window(search: &SearchFields) -> Window {
  Window::PeriodEnd {
    amount: search.bucket_value,
    suffix: search.bucket_unit_of_time.suffix(),
  }
}

fn preview_bounds(
  search: &SearchFields,
  now: DateTime<Utc>,
  config: &Config,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CompileError> {
  let span = i64::from(search.bucket_value) * i64::from(config.preview_bucket_count);
  let from = search
    .bucket_unit_of_time
    .duration(span)
    .and_then(|d| now.checked_sub_signed(d))
    .ok_or_else(|| CompileError::validation("bucketValue", "window out of range"))?;
  Ok((from, now))
}

fn preview_window(search: &SearchFields, now: DateTime<Utc>, config: &Config) -> Result<Window, CompileError> {
  let (from, to) = preview_bounds(search, now, config)?;
  Ok(Window::Absolute { from, to })
}

// ---------------------------------------------------------------------------
// Query-level (graph) queries
// ---------------------------------------------------------------------------

/// `{<type>: {field}}`, or `{}` for `count` or while no field is picked yet.
pub fn metric_aggregation(search: &SearchFields) -> Value {
  let field = match search.field_name.first() {
    Some(f) if search.aggregation_type != AggregationType::Count => f,
    _ => return json!({}),
  };
  let mut metric = Map::new();
  metric.insert(
    search.aggregation_type.as_str().to_string(),
    json!({ "field": field.label }),
  );
  Value::Object(metric)
}

/// The metric fragment under its `when` name (empty object when there is no metric).
pub fn when_aggregation(search: &SearchFields) -> Value {
  let metric = metric_aggregation(search);
  if metric.as_object().map_or(true, Map::is_empty) {
    return json!({});
  }
  json!({ WHEN_AGG_NAME: metric })
}

/// Persisted query of a query-level graph monitor.
pub fn graph_query(search: &SearchFields) -> Value {
  json!({
    "size": 0,
    "aggregations": when_aggregation(search),
    "query": { "bool": { "filter": filters(search, period_end_window(search)) } },
  })
}

/// Date histogram over the preview window, with the metric nested per bucket.
pub fn over_aggregation(
  search: &SearchFields,
  time_zone: &str,
  now: DateTime<Utc>,
  config: &Config,
) -> Result<Value, CompileError> {
  let (from, to) = preview_bounds(search, now, config)?;
  Ok(json!({
    OVER_AGG_NAME: {
      "date_histogram": {
        "field": search.time_field,
        "fixed_interval": format!("{}{}", search.bucket_value, search.bucket_unit_of_time.suffix()),
        "time_zone": time_zone,
        "min_doc_count": 0,
        "extended_bounds": {
          "min": from.timestamp_millis(),
          "max": to.timestamp_millis(),
        },
      },
      "aggregations": when_aggregation(search),
    }
  }))
}

/// Preview variant of `graph_query`; never persisted.
pub fn preview_graph_query(
  search: &SearchFields,
  time_zone: &str,
  now: DateTime<Utc>,
  config: &Config,
) -> Result<Value, CompileError> {
  Ok(json!({
    "size": 0,
    "aggregations": over_aggregation(search, time_zone, now, config)?,
    "query": { "bool": { "filter": filters(search, preview_window(search, now, config)?) } },
  }))
}

// ---------------------------------------------------------------------------
// Bucket-level (composite) queries
// ---------------------------------------------------------------------------

fn composite_aggregation(search: &SearchFields) -> Value {
  let sources: Vec<Value> = search
    .group_by
    .iter()
    .map(|field| {
      let mut source = Map::new();
      source.insert(field.clone(), json!({ "terms": { "field": field } }));
      Value::Object(source)
    })
    .collect();

  let mut metrics = Map::new();
  for metric in &search.aggregations {
    let mut body = Map::new();
    body.insert(
      metric.aggregation_type.composite_keyword().to_string(),
      json!({ "field": metric.field_name }),
    );
    metrics.insert(metric.name(), Value::Object(body));
  }

  json!({
    COMPOSITE_AGG_NAME: {
      "composite": { "sources": sources },
      "aggregations": metrics,
    }
  })
}

/// Persisted query of a bucket-level graph monitor.
pub fn composite_query(search: &SearchFields) -> Value {
  json!({
    "size": 0,
    "aggregations": composite_aggregation(search),
    "query": { "bool": { "filter": filters(search, period_end_window(search)) } },
  })
}

pub fn preview_composite_query(
  search: &SearchFields,
  now: DateTime<Utc>,
  config: &Config,
) -> Result<Value, CompileError> {
  Ok(json!({
    "size": 0,
    "aggregations": composite_aggregation(search),
    "query": { "bool": { "filter": filters(search, preview_window(search, now, config)?) } },
  }))
}

// ---------------------------------------------------------------------------
// Anomaly detector and extraction queries
// ---------------------------------------------------------------------------

/// Highest-graded anomaly result of a detector within the last period.
pub fn anomaly_query(detector_id: &str, period: &Period) -> Value {
  json!({
    "size": 1,
    "sort": [{ "anomaly_grade": "desc" }, { "confidence": "desc" }],
    "query": {
      "bool": {
        "filter": [
          {
            "range": {
              "execution_end_time": {
                "from": format!("{{{{period_end}}}}||-{}{}", period.interval, period.unit.date_math_suffix()),
                "to": "{{period_end}}",
                "include_lower": true,
                "include_upper": true,
              }
            }
          },
          { "term": { "detector_id": { "value": detector_id } } },
        ]
      }
    },
    "aggregations": { MAX_ANOMALY_GRADE_AGG: { "max": { "field": "anomaly_grade" } } },
  })
}

pub fn anomaly_search_input(detector_id: &str, period: &Period, config: &Config) -> Input {
  Input {
    search: SearchInput {
      indices: vec![config.anomaly_results_index.clone()],
      query: anomaly_query(detector_id, period),
    },
  }
}

/// Parse a user-authored query document as-is.
pub fn extraction_query(text: &str) -> Result<Value, CompileError> {
  serde_json::from_str(text).map_err(|e| CompileError::invalid_query(&e))
}

// ---------------------------------------------------------------------------
// Dispatch on monitor form state
// ---------------------------------------------------------------------------

/// Search input persisted on the monitor.
pub fn search_input(values: &MonitorFormValues, config: &Config) -> Result<Input, CompileError> {
  let search = &values.search;
  let query = match (search.search_type, values.monitor_type) {
    (SearchType::Query, _) => extraction_query(&values.query)?,
    (SearchType::Ad, _) => {
      return Ok(anomaly_search_input(
        &search.detector_id,
        &values.schedule.period,
        config,
      ))
    }
    (SearchType::Graph, MonitorType::QueryLevelMonitor) => graph_query(search),
    (SearchType::Graph, MonitorType::BucketLevelMonitor) => composite_query(search),
  };
  Ok(Input {
    search: SearchInput {
      indices: values.index.clone(),
      query,
    },
  })
}

/// Query used to render the form's preview; never persisted.
pub fn preview_query(
  values: &MonitorFormValues,
  now: DateTime<Utc>,
  config: &Config,
) -> Result<Value, CompileError> {
  let search = &values.search;
  let time_zone = values
    .schedule
    .timezone
    .as_deref()
    .unwrap_or(&config.preview_time_zone);
  Ok(match (search.search_type, values.monitor_type) {
    (SearchType::Query, _) => extraction_query(&values.query)?,
    (SearchType::Ad, _) => anomaly_query(&search.detector_id, &values.schedule.period),
    (SearchType::Graph, MonitorType::QueryLevelMonitor) => {
      preview_graph_query(search, time_zone, now, config)?
    }
    (SearchType::Graph, MonitorType::BucketLevelMonitor) => {
      preview_composite_query(search, now, config)?
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::enums::{BucketUnit, FieldType, PeriodUnit, WhereOperator};
  use crate::types::{FieldRef, MetricAggregation, WhereClause};
  use chrono::TimeZone;

  fn search(agg: AggregationType, field: Option<&str>) -> SearchFields {
    SearchFields {
      time_field: "@timestamp".into(),
      aggregation_type: agg,
      field_name: field.map(FieldRef::untyped).into_iter().collect(),
      ..SearchFields::default()
    }
  }

  #[test]
  fn count_has_no_metric() {
    assert_eq!(metric_aggregation(&search(AggregationType::Count, Some("bytes"))), json!({}));
    assert_eq!(when_aggregation(&search(AggregationType::Count, None)), json!({}));
  }

  #[test]
  fn incomplete_metric_degrades_to_empty() {
    assert_eq!(metric_aggregation(&search(AggregationType::Max, None)), json!({}));
  }

  #[test]
  fn metric_wraps_field() {
    let s = search(AggregationType::Avg, Some("latency"));
    assert_eq!(metric_aggregation(&s), json!({ "avg": { "field": "latency" } }));
    assert_eq!(when_aggregation(&s), json!({ "when": { "avg": { "field": "latency" } } }));
  }

  #[test]
  fn graph_query_uses_period_end_window() {
    let mut s = search(AggregationType::Max, Some("bytes"));
    s.bucket_value = 15;
    s.bucket_unit_of_time = BucketUnit::Minutes;
    assert_eq!(
      graph_query(&s),
      json!({
        "size": 0,
        "aggregations": { "when": { "max": { "field": "bytes" } } },
        "query": { "bool": { "filter": [
          { "range": { "@timestamp": {
            "gte": "{{period_end}}||-15m",
            "lte": "{{period_end}}",
            "format": "epoch_millis",
          } } }
        ] } },
      })
    );
  }

  #[test]
  fn graph_query_appends_where_filter() {
    let mut s = search(AggregationType::Count, None);
    s.where_clause = WhereClause {
      field_name: vec![FieldRef::new("status", FieldType::Number)],
      operator: WhereOperator::IsGreaterEqual,
      field_value: json!(500),
      ..WhereClause::default()
    };
    let q = graph_query(&s);
    let filter = q["query"]["bool"]["filter"].as_array().unwrap();
    assert_eq!(filter.len(), 2);
    assert_eq!(filter[1], json!({ "range": { "status": { "gte": 500 } } }));
  }

  #[test]
  fn preview_spans_five_buckets_before_now() {
    let config = Config::default();
    let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    let s = search(AggregationType::Sum, Some("bytes"));
    let q = preview_graph_query(&s, "UTC", now, &config).unwrap();

    let five_hours_ago = Utc.with_ymd_and_hms(2025, 1, 15, 7, 0, 0).unwrap();
    let range = &q["query"]["bool"]["filter"][0]["range"]["@timestamp"];
    assert_eq!(range["gte"], json!(five_hours_ago.timestamp_millis()));
    assert_eq!(range["lte"], json!(now.timestamp_millis()));

    let hist = &q["aggregations"]["over"]["date_histogram"];
    assert_eq!(hist["fixed_interval"], json!("1h"));
    assert_eq!(hist["extended_bounds"]["min"], json!(five_hours_ago.timestamp_millis()));
    assert_eq!(
      q["aggregations"]["over"]["aggregations"],
      json!({ "when": { "sum": { "field": "bytes" } } })
    );
  }

  #[test]
  fn oversized_preview_window_is_a_validation_error() {
    let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    let mut s = search(AggregationType::Count, None);
    s.bucket_value = 20_000_000;
    s.bucket_unit_of_time = BucketUnit::Days;

    let err = preview_graph_query(&s, "UTC", now, &Config::default()).unwrap_err();
    assert!(matches!(err, CompileError::Validation { ref field, .. } if field == "bucketValue"));
    assert!(preview_composite_query(&s, now, &Config::default()).is_err());

    let values = MonitorFormValues { search: s, ..MonitorFormValues::default() };
    assert!(preview_query(&values, now, &Config::default()).is_err());
  }

  #[test]
  fn composite_query_groups_and_names_metrics() {
    let s = SearchFields {
      time_field: "ts".into(),
      group_by: vec!["region".into()],
      aggregations: vec![
        MetricAggregation { aggregation_type: AggregationType::Avg, field_name: "latency".into() },
        MetricAggregation { aggregation_type: AggregationType::Count, field_name: "id".into() },
      ],
      ..SearchFields::default()
    };
    let q = composite_query(&s);
    assert_eq!(
      q["aggregations"],
      json!({ "composite_agg": {
        "composite": { "sources": [{ "region": { "terms": { "field": "region" } } }] },
        "aggregations": {
          "avg_latency": { "avg": { "field": "latency" } },
          "value_count_id": { "value_count": { "field": "id" } },
        },
      } })
    );
  }

  #[test]
  fn anomaly_query_targets_detector() {
    let period = Period { interval: 10, unit: PeriodUnit::Minutes };
    let input = anomaly_search_input("det-1", &period, &Config::default());
    assert_eq!(input.search.indices, vec![".opendistro-anomaly-results*".to_string()]);
    let filter = &input.search.query["query"]["bool"]["filter"];
    assert_eq!(filter[0]["range"]["execution_end_time"]["from"], json!("{{period_end}}||-10m"));
    assert_eq!(filter[1], json!({ "term": { "detector_id": { "value": "det-1" } } }));
  }

  #[test]
  fn malformed_extraction_query_is_invalid_syntax() {
    let err = extraction_query("{ \"size\": ").unwrap_err();
    assert!(matches!(err, CompileError::InvalidQuerySyntax(_)));
  }

  #[test]
  fn extraction_query_is_used_verbatim() {
    let values = MonitorFormValues {
      index: vec!["logs-*".into()],
      query: r#"{"size": 3, "query": {"match_all": {}}}"#.into(),
      search: SearchFields { search_type: SearchType::Query, ..SearchFields::default() },
      ..MonitorFormValues::default()
    };
    let config = Config::default();
    let input = search_input(&values, &config).unwrap();
    assert_eq!(input.search.query, json!({ "size": 3, "query": { "match_all": {} } }));
    let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
    assert_eq!(preview_query(&values, now, &config).unwrap(), input.search.query);
  }
}
