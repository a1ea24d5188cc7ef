//! Bucket-level condition compiler: ordered threshold list -> composite bucket selector.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::CompileError;
use crate::script::Chain;
use crate::types::{BucketSelector, Script, TriggerFormValues, WhereClause, COMPOSITE_AGG_NAME};
use crate::where_clause::composite_agg_filter;

/// Assemble a bucket selector from an already-built condition chain.
pub fn bucket_selector_for(
  chain: &Chain,
  where_clause: &WhereClause,
  config: &Config,
) -> Result<BucketSelector, CompileError> {
  // Self-referential names; the backend resolves them against the composite aggregation.
  let buckets_path: BTreeMap<String, String> = chain
    .metrics()
    .into_iter()
    .map(|m| (m.to_string(), m.to_string()))
    .collect();

  let source = if config.parenthesize_bucket_conditions {
    chain.render_grouped()
  } else {
    chain.render()
  };

  Ok(BucketSelector {
    parent_bucket_path: COMPOSITE_AGG_NAME.to_string(),
    buckets_path,
    script: Script::new(&config.script_lang, source),
    composite_agg_filter: composite_agg_filter(where_clause)?,
  })
}

/// Compile the trigger's visual conditions and where-filter.
pub fn form_to_bucket_selector(
  trigger: &TriggerFormValues,
  config: &Config,
) -> Result<BucketSelector, CompileError> {
  let chain = Chain::from_conditions(&trigger.trigger_conditions)?;
  bucket_selector_for(&chain, &trigger.where_clause, config)
}

/// Parse a user-authored bucket selector as-is.
pub fn raw_bucket_selector(text: &str) -> Result<BucketSelector, CompileError> {
  serde_json::from_str(text).map_err(|e| CompileError::invalid_query(&e))
}
