// src/params/resolver.rs

//! Parameter merging and placeholder substitution.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime};
use regex::{Captures, Regex};

use crate::params::time::{self, PARAMETER_DATETIME};
use crate::task::definition::{ExecutionContext, Property};
use crate::types::CommandType;

/// Matches `${name}` (group 1) and `$[expr]` (group 2).
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^{}]*)\}|\$\[([^\[\]]*)\]").expect("placeholder pattern is valid")
});

/// Insertion-ordered map from parameter name to its final string value.
///
/// Re-inserting an existing name replaces the value but keeps the position of
/// the first definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<(String, String)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Insert `name` only if it is not defined yet.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !self.contains(&name) {
            self.entries.push((name, value.into()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Inputs for schedule-time parameter values.
#[derive(Debug, Clone)]
pub struct ScheduleContext {
    pub command_type: CommandType,
    pub schedule_time: Option<NaiveDateTime>,
    /// Fallback when there is no schedule time.
    pub now: NaiveDateTime,
    /// Parameters supplied when the run was started.
    pub defined_params: BTreeMap<String, String>,
}

impl ScheduleContext {
    pub fn new(command_type: CommandType, schedule_time: Option<NaiveDateTime>) -> Self {
        Self {
            command_type,
            schedule_time,
            now: Local::now().naive_local(),
            defined_params: BTreeMap::new(),
        }
    }

    pub fn from_execution(context: &ExecutionContext, defined_params: &BTreeMap<String, String>) -> Self {
        Self {
            defined_params: defined_params.clone(),
            ..Self::new(context.command_type, context.schedule_time)
        }
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Business-time values with the defined parameters layered on top.
    fn time_params(&self) -> ParameterSet {
        let mut set: ParameterSet =
            time::business_time(self.command_type, self.schedule_time, self.now)
                .into_iter()
                .collect();
        for (name, value) in &self.defined_params {
            set.insert(name.as_str(), value.as_str());
        }
        set
    }
}

/// Merge global and local parameters and add schedule-time values.
///
/// - local values override same-named global values (position of the first
///   definition is kept);
/// - a value starting with `$` is resolved once against the schedule-time
///   values and the global parameters;
/// - schedule-time values are appended last and never override an explicit
///   parameter.
pub fn merge(user_defined: &[Property], local: &[Property], schedule: &ScheduleContext) -> ParameterSet {
    let time_params = schedule.time_params();

    let mut lookup = time_params.clone();
    for prop in user_defined {
        lookup.insert(prop.name.as_str(), prop.value.as_str());
    }

    let mut merged = ParameterSet::new();
    for prop in user_defined.iter().chain(local) {
        let value = if prop.value.starts_with('$') {
            substitute(&prop.value, &lookup)
        } else {
            prop.value.clone()
        };
        merged.insert(prop.name.as_str(), value);
    }

    for (name, value) in time_params.iter() {
        merged.insert_if_absent(name, value);
    }

    merged
}

/// Replace placeholder tokens in `template` with values from `params`.
///
/// Single pass: substituted values are not scanned again. Tokens without a
/// matching parameter, and `$[...]` expressions that do not parse, are kept
/// verbatim.
///
/// Applying the result again is a no-op only while no value contains token
/// syntax. A value starting with `{` or `[` can join a literal `$` in front
/// of its token into a new token (`$${a}` with `a = "{b}"` yields `${b}`).
pub fn substitute(template: &str, params: &ParameterSet) -> String {
    if !template.contains('$') {
        return template.to_string();
    }

    let base = params
        .get(PARAMETER_DATETIME)
        .and_then(time::parse_datetime)
        .unwrap_or_else(|| Local::now().naive_local());

    TOKEN_RE
        .replace_all(template, |caps: &Captures| {
            if let Some(name) = caps.get(1) {
                return match params.get(name.as_str()) {
                    Some(value) => value.to_string(),
                    None => caps[0].to_string(),
                };
            }
            caps.get(2)
                .and_then(|expr| time::evaluate(expr.as_str(), base))
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
