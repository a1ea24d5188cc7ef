//! Binary entrypoint: read JSON request lines from stdin, write JSON lines to stdout.
//!
//! Each input line is a request tagged by `op`. Each produces exactly one
//! output line: the compiled/decompiled artifact, or an ErrorOutput.
//! Logs go to stderr (`RUST_LOG` controls the level).

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use monitor_compiler::types::{ErrorOutput, ScheduleFields, WhereClause};
use monitor_compiler::{schedule, where_clause};
use monitor_compiler::{CompileError, Compiler, Config, Monitor, MonitorFormValues, TriggerFormValues};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request {
  CompileMonitor {
    monitor: MonitorFormValues,
    #[serde(default)]
    triggers: Vec<TriggerFormValues>,
    #[serde(default)]
    config: Option<Config>,
  },
  DecompileMonitor {
    monitor: Monitor,
  },
  CompileWhere {
    #[serde(rename = "where")]
    where_clause: WhereClause,
  },
  BuildSchedule {
    schedule_type: String,
    #[serde(default)]
    fields: ScheduleFields,
  },
  PreviewQuery {
    monitor: MonitorFormValues,
    now: DateTime<Utc>,
  },
}

fn handle(compiler: &Compiler, request: Request) -> Result<Value, CompileError> {
  let out = match request {
    Request::CompileMonitor { monitor, triggers, config } => {
      let doc = match config {
        Some(config) => Compiler::new(config).compile_monitor(&monitor, &triggers)?,
        None => compiler.compile_monitor(&monitor, &triggers)?,
      };
      serde_json::to_value(doc)?
    }
    Request::DecompileMonitor { monitor } => serde_json::to_value(compiler.decompile_monitor(&monitor))?,
    Request::CompileWhere { where_clause: clause } => {
      where_clause::compile_where(&clause).unwrap_or(Value::Null)
    }
    Request::BuildSchedule { schedule_type, fields } => {
      serde_json::to_value(schedule::build_schedule(&schedule_type, &fields))?
    }
    Request::PreviewQuery { monitor, now } => compiler.preview_query(&monitor, now)?,
  };
  Ok(out)
}

fn write_line<T: serde::Serialize>(out: &mut impl Write, value: &T) {
  let _ = serde_json::to_writer(&mut *out, value);
  let _ = writeln!(out);
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
    )
    .with_writer(io::stderr)
    .init();

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  let compiler = Compiler::with_defaults();

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        tracing::error!("read error: {}", e);
        std::process::exit(1);
      }
    };

    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let request: Request = match serde_json::from_str(trimmed) {
      Ok(r) => r,
      Err(e) => {
        write_line(&mut out, &ErrorOutput::new(format!("json parse: {}", e)));
        continue;
      }
    };

    match handle(&compiler, request) {
      Ok(value) => write_line(&mut out, &value),
      Err(e) => {
        let err = match &e {
          CompileError::Validation { field, reason } => {
            ErrorOutput::new(reason.clone()).with_field(field.clone())
          }
          _ => ErrorOutput::new(e.to_string()),
        };
        write_line(&mut out, &err);
      }
    }
  }

  let _ = out.flush();
}
