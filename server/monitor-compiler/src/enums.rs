//! Enumerations shared by the monitor and trigger halves of the compiler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CompileError;

// ---------------------------------------------------------------------------
// Field types
// ---------------------------------------------------------------------------

/// Where-clause field type. Index mapping types collapse onto these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  Number,
  Text,
  Keyword,
  Boolean,
}

impl FieldType {
  pub const ALL: [FieldType; 4] = [Self::Number, Self::Text, Self::Keyword, Self::Boolean];

  /// Map an index mapping type (`long`, `keyword`, ...) onto a where-clause type.
  pub fn from_mapping_type(mapping_type: &str) -> Option<Self> {
    match mapping_type {
      "long" | "integer" | "short" | "byte" | "double" | "float" | "half_float"
      | "scaled_float" | "unsigned_long" => Some(Self::Number),
      "text" => Some(Self::Text),
      "keyword" => Some(Self::Keyword),
      "boolean" => Some(Self::Boolean),
      _ => None,
    }
  }
}

// ---------------------------------------------------------------------------
// Where-clause operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhereOperator {
  #[default]
  Is,
  IsNot,
  IsNull,
  IsNotNull,
  IsGreater,
  IsGreaterEqual,
  IsLess,
  IsLessEqual,
  StartsWith,
  EndsWith,
  Contains,
  DoesNotContain,
  InRange,
  NotInRange,
}

impl WhereOperator {
  pub fn is_range(self) -> bool {
    matches!(self, Self::InRange | Self::NotInRange)
  }

  pub fn is_null_check(self) -> bool {
    matches!(self, Self::IsNull | Self::IsNotNull)
  }
}

// ---------------------------------------------------------------------------
// Metric aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
  #[default]
  Count,
  Avg,
  Sum,
  Min,
  Max,
}

impl AggregationType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Count => "count",
      Self::Avg => "avg",
      Self::Sum => "sum",
      Self::Min => "min",
      Self::Max => "max",
    }
  }

  /// Aggregation keyword inside a composite query (`count` counts values).
  pub fn composite_keyword(self) -> &'static str {
    match self {
      Self::Count => "value_count",
      other => other.as_str(),
    }
  }
}

// ---------------------------------------------------------------------------
// Threshold comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdEnum {
  #[default]
  Above,
  Below,
  Exactly,
}

impl ThresholdEnum {
  pub fn relational_op(self) -> &'static str {
    match self {
      Self::Above => ">",
      Self::Below => "<",
      Self::Exactly => "==",
    }
  }

  pub fn from_relational_op(token: &str) -> Option<Self> {
    match token {
      ">" => Some(Self::Above),
      "<" => Some(Self::Below),
      "==" => Some(Self::Exactly),
      _ => None,
    }
  }
}

// ---------------------------------------------------------------------------
// Logical joiners between bucket-level conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AndOr {
  And,
  Or,
}

impl AndOr {
  pub fn token(self) -> &'static str {
    match self {
      Self::And => "&&",
      Self::Or => "||",
    }
  }

  pub fn from_token(token: &str) -> Option<Self> {
    match token {
      "&&" => Some(Self::And),
      "||" => Some(Self::Or),
      _ => None,
    }
  }
}

/// Form state encodes "no joiner" as an empty string.
pub fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
  match raw {
    None | Some(serde_json::Value::Null) => Ok(None),
    Some(serde_json::Value::String(s)) if s.is_empty() => Ok(None),
    Some(value) => T::deserialize(value).map(Some).map_err(serde::de::Error::custom),
  }
}

// ---------------------------------------------------------------------------
// Monitor kinds
// ---------------------------------------------------------------------------

/// How the monitor's search is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
  /// Visual builder (metric + time field + where-clause).
  #[default]
  Graph,
  /// Raw extraction query authored by the user.
  Query,
  /// Anomaly detector results.
  Ad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
  #[default]
  QueryLevelMonitor,
  BucketLevelMonitor,
}

// ---------------------------------------------------------------------------
// Schedules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleFrequency {
  #[default]
  Interval,
  Daily,
  Weekly,
  Monthly,
  CronExpression,
}

impl ScheduleFrequency {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Interval => "interval",
      Self::Daily => "daily",
      Self::Weekly => "weekly",
      Self::Monthly => "monthly",
      Self::CronExpression => "cronExpression",
    }
  }
}

impl FromStr for ScheduleFrequency {
  type Err = CompileError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "interval" => Ok(Self::Interval),
      "daily" => Ok(Self::Daily),
      "weekly" => Ok(Self::Weekly),
      "monthly" => Ok(Self::Monthly),
      "cronExpression" => Ok(Self::CronExpression),
      other => Err(CompileError::UnsupportedScheduleType(other.to_string())),
    }
  }
}

impl fmt::Display for ScheduleFrequency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodUnit {
  #[default]
  Minutes,
  Hours,
  Days,
}

impl PeriodUnit {
  /// Date-math suffix used in query time windows.
  pub fn date_math_suffix(self) -> &'static str {
    match self {
      Self::Minutes => "m",
      Self::Hours => "h",
      Self::Days => "d",
    }
  }
}

/// Bucket size unit of the visual query, serialized as date-math suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BucketUnit {
  #[serde(rename = "m")]
  Minutes,
  #[default]
  #[serde(rename = "h")]
  Hours,
  #[serde(rename = "d")]
  Days,
}

impl BucketUnit {
  pub fn suffix(self) -> &'static str {
    match self {
      Self::Minutes => "m",
      Self::Hours => "h",
      Self::Days => "d",
    }
  }

  /// `None` when `amount` units do not fit in a `TimeDelta`.
  pub fn duration(self, amount: i64) -> Option<chrono::TimeDelta> {
    match self {
      Self::Minutes => chrono::TimeDelta::try_minutes(amount),
      Self::Hours => chrono::TimeDelta::try_hours(amount),
      Self::Days => chrono::TimeDelta::try_days(amount),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonthlyType {
  #[default]
  Day,
  LastDay,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_ops_invert() {
    for t in [ThresholdEnum::Above, ThresholdEnum::Below, ThresholdEnum::Exactly] {
      assert_eq!(ThresholdEnum::from_relational_op(t.relational_op()), Some(t));
    }
    assert_eq!(ThresholdEnum::from_relational_op(">="), None);
  }

  #[test]
  fn and_or_tokens_invert() {
    assert_eq!(AndOr::from_token(AndOr::And.token()), Some(AndOr::And));
    assert_eq!(AndOr::from_token(AndOr::Or.token()), Some(AndOr::Or));
    assert_eq!(AndOr::from_token("and"), None);
  }

  #[test]
  fn unknown_schedule_frequency_is_an_error() {
    assert_eq!("weekly".parse::<ScheduleFrequency>().unwrap(), ScheduleFrequency::Weekly);
    let err = "fortnightly".parse::<ScheduleFrequency>().unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedScheduleType(s) if s == "fortnightly"));
  }

  #[test]
  fn mapping_types_collapse() {
    assert_eq!(FieldType::from_mapping_type("long"), Some(FieldType::Number));
    assert_eq!(FieldType::from_mapping_type("scaled_float"), Some(FieldType::Number));
    assert_eq!(FieldType::from_mapping_type("keyword"), Some(FieldType::Keyword));
    assert_eq!(FieldType::from_mapping_type("date"), None);
  }

  #[test]
  fn serde_names_match_form_values() {
    assert_eq!(serde_json::to_string(&ThresholdEnum::Exactly).unwrap(), "\"EXACTLY\"");
    assert_eq!(serde_json::to_string(&WhereOperator::IsGreaterEqual).unwrap(), "\"is_greater_equal\"");
    assert_eq!(serde_json::to_string(&ScheduleFrequency::CronExpression).unwrap(), "\"cronExpression\"");
    assert_eq!(serde_json::to_string(&BucketUnit::Minutes).unwrap(), "\"m\"");
    assert_eq!(serde_json::to_string(&MonitorType::BucketLevelMonitor).unwrap(), "\"bucket_level_monitor\"");
  }
}
