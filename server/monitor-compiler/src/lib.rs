//! Monitor definition compiler.
//!
//! Turns alerting-monitor form state (visual query builder, thresholds, where
//! filters, schedule pickers) into backend monitor documents, and rebuilds form
//! state from persisted documents for editing.
//!
//! Pure and synchronous: no I/O, no shared state.

pub mod bucket_selector;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod decompile;
pub mod enums;
pub mod error;
pub mod mappings;
pub mod monitor;
pub mod operators;
pub mod query;
pub mod schedule;
pub mod script;
pub mod trigger;
pub mod types;
pub mod validate;
pub mod where_clause;

pub use compiler::{Compiler, DecompiledMonitor};
pub use config::Config;
pub use error::CompileError;
pub use trigger::TriggerReconstruction;
pub use types::{Monitor, MonitorFormValues, Trigger, TriggerFormValues};
