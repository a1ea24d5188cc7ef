//! Core types for the definition compiler (form state, sidecar, persisted documents).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::*;

pub const DEFAULT_SCRIPT_LANG: &str = "painless";
pub const DEFAULT_QUERY_LEVEL_SOURCE: &str = "ctx.results[0].hits.total.value > 0";
pub const DEFAULT_THRESHOLD_VALUE: f64 = 10000.0;
pub const DEFAULT_AD_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SEVERITY: &str = "1";
pub const DEFAULT_CRON_EXPRESSION: &str = "0 */1 * * *";
pub const COMPOSITE_AGG_NAME: &str = "composite_agg";

fn default_lang() -> String {
  DEFAULT_SCRIPT_LANG.to_string()
}

fn default_kind() -> String {
  "monitor".to_string()
}

// ---------------------------------------------------------------------------
// Field references
// ---------------------------------------------------------------------------

/// A field picked in the form: its dotted path and (for where-clauses) its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
  pub label: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub field_type: Option<FieldType>,
}

impl FieldRef {
  pub fn new(label: impl Into<String>, field_type: FieldType) -> Self {
    Self {
      label: label.into(),
      field_type: Some(field_type),
    }
  }

  pub fn untyped(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      field_type: None,
    }
  }
}

// ---------------------------------------------------------------------------
// Where-clause
// ---------------------------------------------------------------------------

/// Single field/operator/value filter. `field_name` is empty (no filter) or one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WhereClause {
  pub field_name: Vec<FieldRef>,
  pub operator: WhereOperator,
  pub field_value: Value,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field_range_start: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field_range_end: Option<f64>,
}

impl Default for WhereClause {
  fn default() -> Self {
    Self {
      field_name: Vec::new(),
      operator: WhereOperator::Is,
      field_value: Value::String(String::new()),
      field_range_start: None,
      field_range_end: None,
    }
  }
}

impl WhereClause {
  pub fn field(&self) -> Option<&FieldRef> {
    self.field_name.first()
  }

  /// Field value rendered as plain text (for wildcard/prefix patterns).
  pub fn value_text(&self) -> String {
    match &self.field_value {
      Value::String(s) => s.clone(),
      Value::Null => String::new(),
      other => other.to_string(),
    }
  }
}

// ---------------------------------------------------------------------------
// Schedule form fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Period {
  pub interval: u32,
  pub unit: PeriodUnit,
}

impl Default for Period {
  fn default() -> Self {
    Self {
      interval: 1,
      unit: PeriodUnit::Minutes,
    }
  }
}

/// Selected days of the week, in cron order Monday..Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Weekly {
  pub mon: bool,
  pub tue: bool,
  pub wed: bool,
  pub thu: bool,
  pub fri: bool,
  pub sat: bool,
  pub sun: bool,
}

impl Weekly {
  pub fn selected(&self) -> Vec<&'static str> {
    [
      (self.mon, "mon"),
      (self.tue, "tue"),
      (self.wed, "wed"),
      (self.thu, "thu"),
      (self.fri, "fri"),
      (self.sat, "sat"),
      (self.sun, "sun"),
    ]
    .into_iter()
    .filter_map(|(on, day)| on.then_some(day))
    .collect()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Monthly {
  #[serde(rename = "type")]
  pub kind: MonthlyType,
  pub day: u8,
}

impl Default for Monthly {
  fn default() -> Self {
    Self {
      kind: MonthlyType::Day,
      day: 1,
    }
  }
}

/// Everything the schedule builder reads, shared by the form and the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleFields {
  pub period: Period,
  /// Hour of day (0-23) for daily/weekly/monthly schedules.
  pub daily: u8,
  pub weekly: Weekly,
  pub monthly: Monthly,
  pub cron_expression: String,
  pub timezone: Option<String>,
}

impl Default for ScheduleFields {
  fn default() -> Self {
    Self {
      period: Period::default(),
      daily: 0,
      weekly: Weekly::default(),
      monthly: Monthly::default(),
      cron_expression: DEFAULT_CRON_EXPRESSION.to_string(),
      timezone: None,
    }
  }
}

// ---------------------------------------------------------------------------
// Search form fields
// ---------------------------------------------------------------------------

/// One metric of a bucket-level (composite) visual query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAggregation {
  pub aggregation_type: AggregationType,
  pub field_name: String,
}

impl MetricAggregation {
  /// Name of the sub-aggregation, referenced by bucket-level trigger conditions.
  pub fn name(&self) -> String {
    format!("{}_{}", self.aggregation_type.composite_keyword(), self.field_name)
  }
}

/// Everything the query builders read, shared by the form and the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFields {
  pub search_type: SearchType,
  pub time_field: String,
  pub aggregation_type: AggregationType,
  /// Metric field (empty for `count`).
  pub field_name: Vec<FieldRef>,
  pub bucket_value: u32,
  pub bucket_unit_of_time: BucketUnit,
  #[serde(rename = "where")]
  pub where_clause: WhereClause,
  pub aggregations: Vec<MetricAggregation>,
  pub group_by: Vec<String>,
  pub detector_id: String,
}

impl Default for SearchFields {
  fn default() -> Self {
    Self {
      search_type: SearchType::Graph,
      time_field: String::new(),
      aggregation_type: AggregationType::Count,
      field_name: Vec::new(),
      bucket_value: 1,
      bucket_unit_of_time: BucketUnit::Hours,
      where_clause: WhereClause::default(),
      aggregations: Vec::new(),
      group_by: Vec::new(),
      detector_id: String::new(),
    }
  }
}

// ---------------------------------------------------------------------------
// Monitor form state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorFormValues {
  pub name: String,
  pub disabled: bool,
  #[serde(rename = "monitor_type")]
  pub monitor_type: MonitorType,
  pub frequency: ScheduleFrequency,
  #[serde(flatten)]
  pub schedule: ScheduleFields,
  pub index: Vec<String>,
  /// Raw extraction query text (used when `search_type` is `query`).
  pub query: String,
  #[serde(flatten)]
  pub search: SearchFields,
}

impl Default for MonitorFormValues {
  fn default() -> Self {
    Self {
      name: String::new(),
      disabled: false,
      monitor_type: MonitorType::QueryLevelMonitor,
      frequency: ScheduleFrequency::Interval,
      schedule: ScheduleFields::default(),
      index: Vec::new(),
      query: default_query_text(),
      search: SearchFields::default(),
    }
  }
}

/// Initial text of the extraction query editor.
pub fn default_query_text() -> String {
  let query = serde_json::json!({ "size": 0, "query": { "match_all": {} } });
  serde_json::to_string_pretty(&query).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Trigger form state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
  #[serde(default = "default_lang")]
  pub lang: String,
  pub source: String,
}

impl Script {
  pub fn new(lang: &str, source: impl Into<String>) -> Self {
    Self {
      lang: lang.to_string(),
      source: source.into(),
    }
  }
}

impl Default for Script {
  fn default() -> Self {
    Self::new(DEFAULT_SCRIPT_LANG, DEFAULT_QUERY_LEVEL_SOURCE)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnomalyDetectorValues {
  pub anomaly_grade_threshold_value: f64,
  pub anomaly_grade_threshold_enum: ThresholdEnum,
  pub anomaly_confidence_threshold_value: f64,
  pub anomaly_confidence_threshold_enum: ThresholdEnum,
}

impl Default for AnomalyDetectorValues {
  fn default() -> Self {
    Self {
      anomaly_grade_threshold_value: DEFAULT_AD_THRESHOLD,
      anomaly_grade_threshold_enum: ThresholdEnum::Above,
      anomaly_confidence_threshold_value: DEFAULT_AD_THRESHOLD,
      anomaly_confidence_threshold_enum: ThresholdEnum::Above,
    }
  }
}

/// One bucket-level threshold. Only the first element of a list has no joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCondition {
  pub query_metric: String,
  pub threshold_enum: ThresholdEnum,
  pub threshold_value: f64,
  #[serde(
    default,
    deserialize_with = "empty_as_none",
    skip_serializing_if = "Option::is_none"
  )]
  pub and_or_condition: Option<AndOr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerFormValues {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub name: String,
  pub severity: String,
  /// Raw condition script (extraction-query monitors).
  pub script: Script,
  pub threshold_value: f64,
  pub threshold_enum: ThresholdEnum,
  pub anomaly_detector: AnomalyDetectorValues,
  /// Raw bucket selector JSON text (extraction-query bucket-level monitors).
  pub bucket_selector: String,
  pub trigger_conditions: Vec<TriggerCondition>,
  #[serde(rename = "where")]
  pub where_clause: WhereClause,
  pub actions: Vec<Value>,
}

impl Default for TriggerFormValues {
  fn default() -> Self {
    Self {
      id: None,
      name: String::new(),
      severity: DEFAULT_SEVERITY.to_string(),
      script: Script::default(),
      threshold_value: DEFAULT_THRESHOLD_VALUE,
      threshold_enum: ThresholdEnum::Above,
      anomaly_detector: AnomalyDetectorValues::default(),
      bucket_selector: String::new(),
      trigger_conditions: Vec::new(),
      where_clause: WhereClause::default(),
      actions: Vec::new(),
    }
  }
}

// ---------------------------------------------------------------------------
// Sidecar metadata (ui_metadata)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleUiMetadata {
  pub frequency: ScheduleFrequency,
  #[serde(flatten)]
  pub fields: ScheduleFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMetadata {
  pub value: f64,
  #[serde(rename = "enum")]
  pub threshold_enum: ThresholdEnum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdTriggerMetadata {
  pub anomaly_grade: ThresholdMetadata,
  pub anomaly_confidence: ThresholdMetadata,
}

/// Per-trigger sidecar entry, keyed by trigger name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerUiMetadata {
  pub value: f64,
  #[serde(rename = "enum")]
  pub threshold_enum: ThresholdEnum,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ad_trigger_metadata: Option<AdTriggerMetadata>,
  /// Structured bucket-level conditions; authoritative over the script text.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub conditions: Option<Vec<TriggerCondition>>,
  #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
  pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorUiMetadata {
  pub schedule: ScheduleUiMetadata,
  pub search: SearchFields,
  pub monitor_type: MonitorType,
  pub triggers: BTreeMap<String, TriggerUiMetadata>,
}

// ---------------------------------------------------------------------------
// Persisted documents (backend contract)
// ---------------------------------------------------------------------------

/// Exactly one of period or cron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
  Period(Period),
  Cron(Cron),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cron {
  pub expression: String,
  pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchInput {
  pub indices: Vec<String>,
  pub query: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
  pub search: SearchInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCondition {
  pub script: Script,
}

/// `composite_agg_filter`: field -> (include|exclude) -> pattern.
pub type CompositeAggFilter = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSelector {
  pub parent_bucket_path: String,
  pub buckets_path: BTreeMap<String, String>,
  pub script: Script,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub composite_agg_filter: Option<CompositeAggFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLevelTrigger {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub name: String,
  pub severity: String,
  pub condition: QueryCondition,
  #[serde(default)]
  pub actions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketLevelTrigger {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub name: String,
  pub severity: String,
  pub condition: BucketSelector,
  #[serde(default)]
  pub actions: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
  QueryLevelTrigger(QueryLevelTrigger),
  BucketLevelTrigger(BucketLevelTrigger),
}

impl Trigger {
  pub fn name(&self) -> &str {
    match self {
      Self::QueryLevelTrigger(t) => &t.name,
      Self::BucketLevelTrigger(t) => &t.name,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
  #[serde(rename = "type", default = "default_kind")]
  pub kind: String,
  pub name: String,
  #[serde(default)]
  pub monitor_type: MonitorType,
  pub enabled: bool,
  pub schedule: Schedule,
  pub inputs: Vec<Input>,
  #[serde(default)]
  pub triggers: Vec<Trigger>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ui_metadata: Option<MonitorUiMetadata>,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for rejected request lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }
}
