//! Compiler facade: holds configuration and runs the full save/edit pipelines.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::CompileError;
use crate::monitor;
use crate::query;
use crate::trigger::{self, TriggerReconstruction};
use crate::types::*;
use crate::validate;

/// Form state rebuilt from a persisted monitor.
#[derive(Debug, Serialize)]
pub struct DecompiledMonitor {
  pub monitor: MonitorFormValues,
  pub triggers: TriggerReconstruction,
}

/// The monitor definition compiler. Stateless apart from its configuration.
pub struct Compiler {
  config: Config,
}

impl Compiler {
  pub fn new(config: Config) -> Self {
    Self { config }
  }

  pub fn with_defaults() -> Self {
    Self::new(Config::default())
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn form_to_monitor(&self, values: &MonitorFormValues) -> Result<Monitor, CompileError> {
    monitor::form_to_monitor(values, &self.config)
  }

  pub fn monitor_to_form(&self, monitor: &Monitor) -> MonitorFormValues {
    monitor::monitor_to_form(monitor)
  }

  pub fn form_to_trigger(
    &self,
    trigger: &TriggerFormValues,
    monitor: &MonitorFormValues,
  ) -> Result<Trigger, CompileError> {
    trigger::form_to_trigger(trigger, monitor, &self.config)
  }

  pub fn trigger_to_form(
    &self,
    trigger: &Trigger,
    ui_metadata: Option<&MonitorUiMetadata>,
  ) -> Result<TriggerFormValues, CompileError> {
    trigger::trigger_to_form(trigger, ui_metadata)
  }

  /// Validate and compile a monitor together with its triggers.
  ///
  /// Trigger names key the sidecar, so they must be unique within a monitor.
  pub fn compile_monitor(
    &self,
    values: &MonitorFormValues,
    triggers: &[TriggerFormValues],
  ) -> Result<Monitor, CompileError> {
    validate::validate_monitor_form(values, &self.config)?;

    let mut seen = BTreeSet::new();
    for t in triggers {
      validate::validate_trigger_form(t, values.monitor_type, values.search.search_type, &self.config)?;
      if !seen.insert(t.name.as_str()) {
        return Err(CompileError::validation(
          "triggers.name",
          &format!("duplicate trigger name {:?}", t.name),
        ));
      }
    }

    let mut doc = self.form_to_monitor(values)?;
    for t in triggers {
      doc.triggers.push(self.form_to_trigger(t, values)?);
      if let Some(ui) = doc.ui_metadata.as_mut() {
        ui.triggers.insert(t.name.clone(), trigger::trigger_ui_metadata(t, values));
      }
    }

    tracing::debug!(monitor = %doc.name, triggers = doc.triggers.len(), "compiled monitor document");
    Ok(doc)
  }

  pub fn decompile_monitor(&self, doc: &Monitor) -> DecompiledMonitor {
    DecompiledMonitor {
      monitor: self.monitor_to_form(doc),
      triggers: trigger::triggers_to_form(doc),
    }
  }

  pub fn preview_query(&self, values: &MonitorFormValues, now: DateTime<Utc>) -> Result<Value, CompileError> {
    query::preview_query(values, now, &self.config)
  }
}
