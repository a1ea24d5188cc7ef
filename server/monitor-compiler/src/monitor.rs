//! Monitor assembler: monitor form state <-> persisted monitor document.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::enums::{ScheduleFrequency, SearchType};
use crate::error::CompileError;
use crate::query;
use crate::schedule::{schedule_for, schedule_to_fields};
use crate::types::{
  Monitor, MonitorFormValues, MonitorUiMetadata, Schedule, ScheduleUiMetadata, SearchFields,
};

/// Compile form state into a monitor document (without triggers).
pub fn form_to_monitor(values: &MonitorFormValues, config: &Config) -> Result<Monitor, CompileError> {
  let schedule = schedule_for(values.frequency, &values.schedule);
  let input = query::search_input(values, config)?;

  let ui_metadata = MonitorUiMetadata {
    schedule: ScheduleUiMetadata {
      frequency: values.frequency,
      fields: values.schedule.clone(),
    },
    search: values.search.clone(),
    monitor_type: values.monitor_type,
    triggers: BTreeMap::new(),
  };

  tracing::debug!(
    monitor = %values.name,
    frequency = %values.frequency,
    search_type = ?values.search.search_type,
    "compiled monitor"
  );

  Ok(Monitor {
    kind: "monitor".to_string(),
    name: values.name.clone(),
    monitor_type: values.monitor_type,
    enabled: !values.disabled,
    schedule,
    inputs: vec![input],
    triggers: Vec::new(),
    ui_metadata: Some(ui_metadata),
  })
}

/// Rebuild editable form state from a persisted monitor.
///
/// The document's schedule and input are authoritative; the sidecar fills in
/// whatever they cannot express (schedule frequency, visual query fields).
pub fn monitor_to_form(monitor: &Monitor) -> MonitorFormValues {
  let mut values = MonitorFormValues {
    name: monitor.name.clone(),
    disabled: !monitor.enabled,
    monitor_type: monitor.monitor_type,
    ..MonitorFormValues::default()
  };

  match &monitor.ui_metadata {
    Some(ui) => {
      values.frequency = ui.schedule.frequency;
      values.schedule = ui.schedule.fields.clone();
      values.search = ui.search.clone();
    }
    None => {
      tracing::warn!(monitor = %monitor.name, "no ui_metadata; editing as extraction query");
      let recovered = schedule_to_fields(&monitor.schedule);
      values.frequency = recovered.frequency;
      values.schedule = recovered.fields;
      values.search = SearchFields {
        search_type: SearchType::Query,
        ..SearchFields::default()
      };
    }
  }

  match &monitor.schedule {
    Schedule::Cron(cron) => {
      values.schedule.timezone = cron.timezone.clone();
      if values.frequency == ScheduleFrequency::CronExpression {
        values.schedule.cron_expression = cron.expression.clone();
      }
    }
    Schedule::Period(period) => {
      if values.frequency == ScheduleFrequency::Interval {
        values.schedule.period = *period;
      }
    }
  }

  if let Some(input) = monitor.inputs.first() {
    if values.search.search_type != SearchType::Ad {
      values.index = input.search.indices.clone();
    }
    values.query = serde_json::to_string_pretty(&input.search.query).unwrap_or_default();
  }

  values
}
