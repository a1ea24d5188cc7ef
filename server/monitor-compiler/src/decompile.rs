//! Reverse parser: persisted trigger conditions -> structured form conditions.
//!
//! Structured sidecar entries are authoritative. Script text is only tokenized
//! for documents that predate the structured entry or were written directly
//! against the backend.

use crate::error::CompileError;
use crate::script::Chain;
use crate::types::{
  AnomalyDetectorValues, BucketSelector, MonitorUiMetadata, TriggerCondition, TriggerFormValues,
  TriggerUiMetadata, WhereClause,
};
use crate::where_clause::where_from_composite_filter;

/// Sidecar entry of a trigger, by name.
pub fn sidecar_entry<'a>(
  name: &str,
  ui_metadata: Option<&'a MonitorUiMetadata>,
) -> Result<&'a TriggerUiMetadata, CompileError> {
  ui_metadata
    .and_then(|ui| ui.triggers.get(name))
    .ok_or_else(|| CompileError::MissingSidecarMetadata(name.to_string()))
}

/// Ordered bucket-level conditions, from the sidecar or else from the script text.
pub fn bucket_conditions(
  selector: &BucketSelector,
  sidecar: Option<&TriggerUiMetadata>,
) -> Result<Vec<TriggerCondition>, CompileError> {
  if let Some(conditions) = sidecar.and_then(|s| s.conditions.as_ref()) {
    return Ok(conditions.clone());
  }
  let chain = Chain::parse(&selector.script.source)?;
  Ok(chain.to_conditions())
}

/// Where-clause of a bucket-level trigger, from the sidecar or else from its composite filter.
pub fn bucket_where(selector: &BucketSelector, sidecar: Option<&TriggerUiMetadata>) -> WhereClause {
  if let Some(where_clause) = sidecar.and_then(|s| s.where_clause.as_ref()) {
    return where_clause.clone();
  }
  selector
    .composite_agg_filter
    .as_ref()
    .and_then(where_from_composite_filter)
    .unwrap_or_default()
}

/// Copy stored threshold settings onto query-level form values.
pub fn apply_threshold_sidecar(values: &mut TriggerFormValues, entry: &TriggerUiMetadata) {
  values.threshold_value = entry.value;
  values.threshold_enum = entry.threshold_enum;
  if let Some(ad) = &entry.ad_trigger_metadata {
    values.anomaly_detector = AnomalyDetectorValues {
      anomaly_grade_threshold_value: ad.anomaly_grade.value,
      anomaly_grade_threshold_enum: ad.anomaly_grade.threshold_enum,
      anomaly_confidence_threshold_value: ad.anomaly_confidence.value,
      anomaly_confidence_threshold_enum: ad.anomaly_confidence.threshold_enum,
    };
  }
}
