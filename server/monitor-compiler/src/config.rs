//! Compiler configuration with sane defaults.

use serde::Deserialize;

/// Tunables for query, script and validation output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Number of buckets shown by the preview query (window = bucket size * count).
  pub preview_bucket_count: u32,
  /// Max bucket-level trigger conditions per trigger.
  pub max_trigger_conditions: usize,
  /// Max where-filter fields per monitor/trigger.
  pub max_where_filters: usize,
  /// Wrap chained bucket conditions in explicit left-to-right parentheses.
  pub parenthesize_bucket_conditions: bool,
  /// Script language for generated conditions.
  pub script_lang: String,
  /// Time zone used by the preview date histogram when the monitor has none.
  pub preview_time_zone: String,
  /// Index pattern holding anomaly detector results.
  pub anomaly_results_index: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      preview_bucket_count: 5,
      max_trigger_conditions: 5,
      max_where_filters: 1,
      parenthesize_bucket_conditions: false,
      script_lang: "painless".to_string(),
      preview_time_zone: "UTC".to_string(),
      anomaly_results_index: ".opendistro-anomaly-results*".to_string(),
    }
  }
}
