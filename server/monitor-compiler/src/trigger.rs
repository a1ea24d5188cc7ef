//! Trigger assembler: trigger form state <-> persisted trigger plus its sidecar entry.

use serde::Serialize;

use crate::bucket_selector::{form_to_bucket_selector, raw_bucket_selector};
use crate::condition::form_to_condition;
use crate::config::Config;
use crate::decompile::{apply_threshold_sidecar, bucket_conditions, bucket_where, sidecar_entry};
use crate::enums::{MonitorType, SearchType};
use crate::error::CompileError;
use crate::types::{
  AdTriggerMetadata, BucketLevelTrigger, Monitor, MonitorFormValues, MonitorUiMetadata,
  QueryLevelTrigger, ThresholdMetadata, Trigger, TriggerFormValues, TriggerUiMetadata,
};

/// Compile one trigger for the monitor it belongs to.
pub fn form_to_trigger(
  trigger: &TriggerFormValues,
  monitor: &MonitorFormValues,
  config: &Config,
) -> Result<Trigger, CompileError> {
  let compiled = match monitor.monitor_type {
    MonitorType::QueryLevelMonitor => Trigger::QueryLevelTrigger(QueryLevelTrigger {
      id: trigger.id.clone(),
      name: trigger.name.clone(),
      severity: trigger.severity.clone(),
      condition: form_to_condition(trigger, &monitor.search, config),
      actions: trigger.actions.clone(),
    }),
    MonitorType::BucketLevelMonitor => {
      let condition = match monitor.search.search_type {
        SearchType::Query => raw_bucket_selector(&trigger.bucket_selector)?,
        _ => form_to_bucket_selector(trigger, config)?,
      };
      Trigger::BucketLevelTrigger(BucketLevelTrigger {
        id: trigger.id.clone(),
        name: trigger.name.clone(),
        severity: trigger.severity.clone(),
        condition,
        actions: trigger.actions.clone(),
      })
    }
  };
  tracing::debug!(trigger = %trigger.name, monitor_type = ?monitor.monitor_type, "compiled trigger");
  Ok(compiled)
}

/// Sidecar entry stored under the trigger's name.
pub fn trigger_ui_metadata(trigger: &TriggerFormValues, monitor: &MonitorFormValues) -> TriggerUiMetadata {
  let search_type = monitor.search.search_type;
  let ad_trigger_metadata = (search_type == SearchType::Ad).then(|| {
    let ad = &trigger.anomaly_detector;
    AdTriggerMetadata {
      anomaly_grade: ThresholdMetadata {
        value: ad.anomaly_grade_threshold_value,
        threshold_enum: ad.anomaly_grade_threshold_enum,
      },
      anomaly_confidence: ThresholdMetadata {
        value: ad.anomaly_confidence_threshold_value,
        threshold_enum: ad.anomaly_confidence_threshold_enum,
      },
    }
  });
  let visual_buckets =
    monitor.monitor_type == MonitorType::BucketLevelMonitor && search_type != SearchType::Query;

  TriggerUiMetadata {
    value: trigger.threshold_value,
    threshold_enum: trigger.threshold_enum,
    ad_trigger_metadata,
    conditions: visual_buckets.then(|| trigger.trigger_conditions.clone()),
    where_clause: visual_buckets.then(|| trigger.where_clause.clone()),
  }
}

/// Rebuild trigger form state. A missing sidecar entry is recovered with defaults.
pub fn trigger_to_form(
  trigger: &Trigger,
  ui_metadata: Option<&MonitorUiMetadata>,
) -> Result<TriggerFormValues, CompileError> {
  decompile(trigger, ui_metadata).map(|(values, _)| values)
}

fn decompile(
  trigger: &Trigger,
  ui_metadata: Option<&MonitorUiMetadata>,
) -> Result<(TriggerFormValues, Option<CompileError>), CompileError> {
  let mut values = base_form(trigger);
  let (entry, warning) = match sidecar_entry(trigger.name(), ui_metadata) {
    Ok(entry) => (Some(entry), None),
    Err(err) => {
      tracing::warn!(trigger = %trigger.name(), "{}; using defaults", err);
      (None, Some(err))
    }
  };
  // Documents without any sidecar were authored against the backend; treat them as raw.
  let search_type = ui_metadata.map_or(SearchType::Query, |ui| ui.search.search_type);

  match trigger {
    Trigger::QueryLevelTrigger(_) => {
      if let Some(entry) = entry {
        apply_threshold_sidecar(&mut values, entry);
      }
    }
    Trigger::BucketLevelTrigger(t) => {
      if let Some(entry) = entry {
        apply_threshold_sidecar(&mut values, entry);
      }
      match bucket_conditions(&t.condition, entry) {
        Ok(conditions) => values.trigger_conditions = conditions,
        Err(err) if search_type == SearchType::Query => {
          tracing::debug!(trigger = %t.name, "{}; keeping raw selector only", err);
        }
        Err(err) => return Err(err),
      }
      values.where_clause = bucket_where(&t.condition, entry);
    }
  }
  tracing::debug!(trigger = %trigger.name(), "decompiled trigger");
  Ok((values, warning))
}

/// Identity, actions and raw condition text: everything editable without a structured parse.
fn base_form(trigger: &Trigger) -> TriggerFormValues {
  let mut values = TriggerFormValues::default();
  match trigger {
    Trigger::QueryLevelTrigger(t) => {
      values.id = t.id.clone();
      values.name = t.name.clone();
      values.severity = t.severity.clone();
      values.actions = t.actions.clone();
      values.script = t.condition.script.clone();
    }
    Trigger::BucketLevelTrigger(t) => {
      values.id = t.id.clone();
      values.name = t.name.clone();
      values.severity = t.severity.clone();
      values.actions = t.actions.clone();
      values.bucket_selector = serde_json::to_string_pretty(&t.condition).unwrap_or_default();
    }
  }
  values
}

/// A trigger that could not be decompiled, with a form state for raw editing.
#[derive(Debug, Serialize)]
pub struct TriggerFailure {
  pub name: String,
  #[serde(serialize_with = "as_message")]
  pub error: CompileError,
  pub fallback: TriggerFormValues,
}

#[derive(Debug, Default, Serialize)]
pub struct TriggerReconstruction {
  pub triggers: Vec<TriggerFormValues>,
  pub failures: Vec<TriggerFailure>,
  #[serde(serialize_with = "as_messages")]
  pub warnings: Vec<CompileError>,
}

fn as_message<S: serde::Serializer>(err: &CompileError, s: S) -> Result<S::Ok, S::Error> {
  s.collect_str(err)
}

fn as_messages<S: serde::Serializer>(errs: &[CompileError], s: S) -> Result<S::Ok, S::Error> {
  s.collect_seq(errs.iter().map(|e| e.to_string()))
}

/// Decompile every trigger of a monitor. One bad trigger never hides the others.
pub fn triggers_to_form(monitor: &Monitor) -> TriggerReconstruction {
  let mut out = TriggerReconstruction::default();
  let ui_metadata = monitor.ui_metadata.as_ref();

  for trigger in &monitor.triggers {
    match decompile(trigger, ui_metadata) {
      Ok((values, warning)) => {
        out.triggers.push(values);
        out.warnings.extend(warning);
      }
      Err(error) => {
        tracing::warn!(trigger = %trigger.name(), %error, "falling back to raw editing");
        out.failures.push(TriggerFailure {
          name: trigger.name().to_string(),
          error,
          fallback: base_form(trigger),
        });
      }
    }
  }
  out
}
