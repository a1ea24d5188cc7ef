//! Bucket selector script expressions.
//!
//! Conditions are kept as a small AST and rendered to script text only at the
//! document boundary. `Chain::parse` is the single place that reads structure
//! back out of text, for persisted documents that carry no structured sidecar.

use std::collections::BTreeSet;

use crate::enums::{AndOr, ThresholdEnum};
use crate::error::CompileError;
use crate::types::TriggerCondition;

pub const PARAMS_PREFIX: &str = "params.";

/// `params.<metric> <op> <value>`
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
  pub metric: String,
  pub op: ThresholdEnum,
  pub value: f64,
}

impl Clause {
  pub fn render(&self) -> String {
    format!(
      "{}{} {} {}",
      PARAMS_PREFIX,
      self.metric,
      self.op.relational_op(),
      self.value
    )
  }
}

/// Clauses joined by logical operators; `joiners[i]` sits between clause i and i+1.
///
/// Only built through `from_conditions` and `parse`, which keep exactly one
/// joiner fewer than clauses.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chain {
  clauses: Vec<Clause>,
  joiners: Vec<AndOr>,
}

impl Chain {
  pub fn clauses(&self) -> &[Clause] {
    &self.clauses
  }

  pub fn joiners(&self) -> &[AndOr] {
    &self.joiners
  }

  /// Build from form conditions. The first joiner is ignored; later ones are required.
  pub fn from_conditions(conditions: &[TriggerCondition]) -> Result<Self, CompileError> {
    let mut chain = Chain::default();
    for (i, c) in conditions.iter().enumerate() {
      if i > 0 {
        let joiner = c.and_or_condition.ok_or_else(|| {
          CompileError::validation(
            &format!("triggerConditions[{}].andOrCondition", i),
            "must be AND or OR",
          )
        })?;
        chain.joiners.push(joiner);
      }
      chain.clauses.push(Clause {
        metric: c.query_metric.clone(),
        op: c.threshold_enum,
        value: c.threshold_value,
      });
    }
    Ok(chain)
  }

  pub fn to_conditions(&self) -> Vec<TriggerCondition> {
    self
      .clauses
      .iter()
      .enumerate()
      .map(|(i, clause)| TriggerCondition {
        query_metric: clause.metric.clone(),
        threshold_enum: clause.op,
        threshold_value: clause.value,
        and_or_condition: if i == 0 { None } else { self.joiners.get(i - 1).copied() },
      })
      .collect()
  }

  /// Distinct metrics referenced by the chain, sorted.
  pub fn metrics(&self) -> BTreeSet<&str> {
    self.clauses.iter().map(|c| c.metric.as_str()).collect()
  }

  /// Flat rendering: clauses and joiners separated by single spaces, no grouping.
  pub fn render(&self) -> String {
    let mut out = String::new();
    for (i, clause) in self.clauses.iter().enumerate() {
      if i > 0 {
        out.push(' ');
        out.push_str(self.joiners[i - 1].token());
        out.push(' ');
      }
      out.push_str(&clause.render());
    }
    out
  }

  /// Rendering with explicit left-to-right grouping: `(a && b) || c`.
  pub fn render_grouped(&self) -> String {
    let mut out = String::new();
    for (i, clause) in self.clauses.iter().enumerate() {
      match i {
        0 => out = clause.render(),
        1 => out = format!("{} {} {}", out, self.joiners[0].token(), clause.render()),
        _ => out = format!("({}) {} {}", out, self.joiners[i - 1].token(), clause.render()),
      }
    }
    out
  }

  /// Re-tokenize a generated script: 3 tokens for the first clause, 4 for each later one.
  ///
  /// Grouping parentheses emitted by `render_grouped` are ignored.
  pub fn parse(source: &str) -> Result<Self, CompileError> {
    let tokens: Vec<&str> = source
      .split_whitespace()
      .map(|t| t.trim_start_matches('(').trim_end_matches(')'))
      .filter(|t| !t.is_empty())
      .collect();

    if tokens.len() < 3 || (tokens.len() - 3) % 4 != 0 {
      return Err(CompileError::reverse_parse(
        source,
        format!("{} tokens do not form 3 + 4n clause tokens", tokens.len()),
      ));
    }

    let mut chain = Chain {
      clauses: vec![parse_clause(source, &tokens[0..3])?],
      joiners: Vec::new(),
    };
    for group in tokens[3..].chunks(4) {
      let joiner = AndOr::from_token(group[0]).ok_or_else(|| {
        CompileError::reverse_parse(source, format!("unknown logical operator {:?}", group[0]))
      })?;
      chain.joiners.push(joiner);
      chain.clauses.push(parse_clause(source, &group[1..4])?);
    }
    Ok(chain)
  }
}

fn parse_clause(source: &str, tokens: &[&str]) -> Result<Clause, CompileError> {
  let metric = tokens[0].strip_prefix(PARAMS_PREFIX).ok_or_else(|| {
    CompileError::reverse_parse(source, format!("expected params.<metric>, got {:?}", tokens[0]))
  })?;
  let op = ThresholdEnum::from_relational_op(tokens[1]).ok_or_else(|| {
    CompileError::reverse_parse(source, format!("unknown relational operator {:?}", tokens[1]))
  })?;
  let value = tokens[2]
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .ok_or_else(|| {
      CompileError::reverse_parse(source, format!("threshold {:?} is not a finite number", tokens[2]))
    })?;
  Ok(Clause {
    metric: metric.to_string(),
    op,
    value,
  })
}
