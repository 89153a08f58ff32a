// src/params/mod.rs

//! Parameter resolution.
//!
//! - [`resolver`] merges global, local and schedule-time parameters and
//!   substitutes `${name}` / `$[expr]` tokens into a payload template.
//! - [`time`] computes business-date parameters and evaluates `$[expr]`
//!   date expressions.

pub mod resolver;
pub mod time;

pub use resolver::{merge, substitute, ParameterSet, ScheduleContext};
