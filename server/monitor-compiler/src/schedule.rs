//! Schedule builder: schedule form fields -> persisted period or cron schedule.

use crate::enums::{MonthlyType, ScheduleFrequency};
use crate::types::{Cron, Schedule, ScheduleFields, ScheduleUiMetadata};

/// Build a schedule from a frequency name such as `"weekly"`.
///
/// Unrecognized frequencies produce no schedule; callers guard on `None`.
pub fn build_schedule(schedule_type: &str, fields: &ScheduleFields) -> Option<Schedule> {
  match schedule_type.parse::<ScheduleFrequency>() {
    Ok(frequency) => Some(schedule_for(frequency, fields)),
    Err(e) => {
      tracing::warn!(error = %e, "no schedule produced");
      None
    }
  }
}

pub fn schedule_for(frequency: ScheduleFrequency, fields: &ScheduleFields) -> Schedule {
  let hour = fields.daily;
  let expression = match frequency {
    ScheduleFrequency::Interval => return Schedule::Period(fields.period),
    ScheduleFrequency::Daily => format!("0 {} * * *", hour),
    ScheduleFrequency::Weekly => {
      let days = fields
        .weekly
        .selected()
        .iter()
        .map(|d| d.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(",");
      format!("0 {} * * {}", hour, days)
    }
    ScheduleFrequency::Monthly => {
      // "Last day" has no portable day-of-month token; `?` leaves it unspecified.
      let day_of_month = match fields.monthly.kind {
        MonthlyType::Day => fields.monthly.day.to_string(),
        MonthlyType::LastDay => "?".to_string(),
      };
      format!("0 {} {} */1 *", hour, day_of_month)
    }
    ScheduleFrequency::CronExpression => fields.cron_expression.clone(),
  };
  Schedule::Cron(Cron {
    expression,
    timezone: fields.timezone.clone(),
  })
}

/// Recover schedule form fields when the sidecar is missing.
///
/// Periods come back as `interval`; any cron comes back as a raw expression.
pub fn schedule_to_fields(schedule: &Schedule) -> ScheduleUiMetadata {
  let mut fields = ScheduleFields::default();
  let frequency = match schedule {
    Schedule::Period(period) => {
      fields.period = *period;
      ScheduleFrequency::Interval
    }
    Schedule::Cron(cron) => {
      fields.cron_expression = cron.expression.clone();
      fields.timezone = cron.timezone.clone();
      ScheduleFrequency::CronExpression
    }
  };
  ScheduleUiMetadata { frequency, fields }
}
