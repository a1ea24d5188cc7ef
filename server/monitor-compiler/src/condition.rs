//! Query-level condition compiler: threshold form fields -> painless condition script.

use crate::config::Config;
use crate::enums::{AggregationType, SearchType};
use crate::query::{MAX_ANOMALY_GRADE_AGG, WHEN_AGG_NAME};
use crate::types::{AnomalyDetectorValues, QueryCondition, Script, SearchFields, TriggerFormValues};

pub const HITS_TOTAL_PATH: &str = "ctx.results[0].hits.total.value";

pub fn agg_value_path() -> String {
  format!("ctx.results[0].aggregations.{}.value", WHEN_AGG_NAME)
}

/// Path the threshold is compared against: hit count for `count`, metric value otherwise.
pub fn results_path(aggregation_type: AggregationType) -> String {
  match aggregation_type {
    AggregationType::Count => HITS_TOTAL_PATH.to_string(),
    _ => agg_value_path(),
  }
}

/// `<path> <op> <value>`; non-count metrics are null-guarded since empty buckets carry no value.
pub fn graph_condition_source(trigger: &TriggerFormValues, aggregation_type: AggregationType) -> String {
  let path = results_path(aggregation_type);
  let comparison = format!(
    "{} {} {}",
    path,
    trigger.threshold_enum.relational_op(),
    trigger.threshold_value
  );
  match aggregation_type {
    AggregationType::Count => comparison,
    _ => format!("return {} == null ? false : {}", path, comparison),
  }
}

/// Conjunctive anomaly grade/confidence check, guarded so every dereferenced path exists.
pub fn anomaly_condition_source(ad: &AnomalyDetectorValues) -> String {
  let grade_agg = format!("ctx.results[0].aggregations.{}", MAX_ANOMALY_GRADE_AGG);
  let source_doc = "ctx.results[0].hits.hits[0]._source";
  let guards = [
    "ctx.results != null".to_string(),
    "ctx.results.length > 0".to_string(),
    "ctx.results[0].aggregations != null".to_string(),
    format!("{} != null", grade_agg),
    format!("{} > 0", HITS_TOTAL_PATH),
    format!("{} != null", source_doc),
    format!("{}.detector_id != null", source_doc),
    format!("{}.value != null", grade_agg),
  ];
  let checks = [
    format!(
      "{}.value {} {}",
      grade_agg,
      ad.anomaly_grade_threshold_enum.relational_op(),
      ad.anomaly_grade_threshold_value
    ),
    format!(
      "{}.confidence {} {}",
      source_doc,
      ad.anomaly_confidence_threshold_enum.relational_op(),
      ad.anomaly_confidence_threshold_value
    ),
  ];
  format!("return {}", guards.iter().chain(checks.iter()).cloned().collect::<Vec<_>>().join(" && "))
}

/// Compile the trigger's condition for the monitor's search type.
///
/// Raw-query monitors pass the user's script through untouched.
pub fn form_to_condition(trigger: &TriggerFormValues, search: &SearchFields, config: &Config) -> QueryCondition {
  let script = match search.search_type {
    SearchType::Query => trigger.script.clone(),
    SearchType::Ad => Script::new(&config.script_lang, anomaly_condition_source(&trigger.anomaly_detector)),
    SearchType::Graph => Script::new(
      &config.script_lang,
      graph_condition_source(trigger, search.aggregation_type),
    ),
  };
  QueryCondition { script }
}
