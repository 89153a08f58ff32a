// src/params/time.rs

//! Schedule-time parameters and `$[...]` date expressions.
//!
//! Business-date rules:
//! - `COMPLEMENT_DATA` runs use the schedule time itself as the business date.
//! - every other command type uses the day before the schedule time.
//!
//! Expressions use letter-run date patterns (`yyyy`, `yy`, `MM`, `dd`, `HH`,
//! `mm`, `ss`):
//!
//! - `$[yyyyMMdd]`, `$[yyyy-MM-dd-1]`, `$[yyyyMMdd+7]` (day offsets)
//! - `$[HHmmss-1/24]` (hour offset), `$[HHmmss+30/24/60]` (minute offset)
//! - `$[add_months(yyyyMMdd,-1)]`, `$[this_day(yyyy-MM-dd)]`,
//!   `$[last_day(yyyy-MM-dd)]`, `$[month_begin(yyyyMMdd,0)]`,
//!   `$[month_end(yyyyMMdd,-1)]`, `$[week_begin(yyyyMMdd,0)]`,
//!   `$[week_end(yyyyMMdd,1)]`

use chrono::{Datelike, Months, NaiveDateTime, TimeDelta};

use crate::types::CommandType;

pub const PARAMETER_DATETIME: &str = "system.datetime";
pub const PARAMETER_BUSINESS_DATE: &str = "system.biz.date";
pub const PARAMETER_CURRENT_DATE: &str = "system.biz.curdate";

const DATE_FORMAT: &str = "%Y%m%d";
const DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Compute the `system.*` business-time parameters.
///
/// `now` is used when no schedule time is known, or when the schedule time is
/// too close to the calendar bounds to shift by a day.
pub fn business_time(
    command_type: CommandType,
    schedule_time: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Vec<(String, String)> {
    let (business, current) = schedule_time
        .and_then(|at| business_dates(command_type, at))
        .or_else(|| business_dates(command_type, now))
        .unwrap_or((now, now));

    vec![
        (
            PARAMETER_CURRENT_DATE.to_string(),
            current.format(DATE_FORMAT).to_string(),
        ),
        (
            PARAMETER_BUSINESS_DATE.to_string(),
            business.format(DATE_FORMAT).to_string(),
        ),
        (
            PARAMETER_DATETIME.to_string(),
            current.format(DATETIME_FORMAT).to_string(),
        ),
    ]
}

/// Business date and the day after it, for a run at `run_time`.
fn business_dates(
    command_type: CommandType,
    run_time: NaiveDateTime,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let one_day = TimeDelta::days(1);
    let business = match command_type {
        CommandType::ComplementData => run_time,
        _ => run_time.checked_sub_signed(one_day)?,
    };
    let current = business.checked_add_signed(one_day)?;
    Some((business, current))
}

/// Parse a `system.datetime` value back into a timestamp.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok()
}

/// Evaluate the body of a `$[...]` expression relative to `base`.
///
/// Returns `None` for anything that is not a recognised expression, so the
/// caller can leave the token untouched.
pub fn evaluate(expr: &str, base: NaiveDateTime) -> Option<String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return None;
    }

    if let Some(result) = evaluate_function(expr, base) {
        return result;
    }

    let (pattern, offset) = split_offset(expr);
    let at = match offset {
        Some(delta) => base.checked_add_signed(delta)?,
        None => base,
    };
    format_pattern(at, pattern)
}

/// Returns `Some(..)` if `expr` has function-call syntax, with the inner
/// option carrying the evaluation result.
fn evaluate_function(expr: &str, base: NaiveDateTime) -> Option<Option<String>> {
    let open = expr.find('(')?;
    if !expr.ends_with(')') {
        return None;
    }
    let name = &expr[..open];
    let args: Vec<&str> = expr[open + 1..expr.len() - 1]
        .split(',')
        .map(str::trim)
        .collect();

    let pattern = args.first().copied().unwrap_or_default();
    let count = match args.get(1) {
        Some(raw) => match raw.parse::<i32>() {
            Ok(n) => n,
            Err(_) => return Some(None),
        },
        None => 0,
    };

    let at = match name.trim() {
        "add_months" => add_months(base, count),
        "this_day" => Some(base),
        "last_day" => base.checked_sub_signed(TimeDelta::days(1)),
        "month_begin" => month_begin(base, count),
        "month_end" => month_begin(base, count.saturating_add(1))
            .and_then(|next| next.checked_sub_signed(TimeDelta::days(1))),
        "week_begin" => week_begin(base, count),
        "week_end" => week_begin(base, count)
            .and_then(|monday| monday.checked_add_signed(TimeDelta::days(6))),
        _ => return Some(None),
    };

    Some(at.and_then(|at| format_pattern(at, pattern)))
}

fn add_months(at: NaiveDateTime, count: i32) -> Option<NaiveDateTime> {
    let months = Months::new(count.unsigned_abs());
    if count >= 0 {
        at.checked_add_months(months)
    } else {
        at.checked_sub_months(months)
    }
}

fn month_begin(at: NaiveDateTime, count: i32) -> Option<NaiveDateTime> {
    let first = at.date().with_day(1)?.and_time(at.time());
    add_months(first, count)
}

fn week_begin(at: NaiveDateTime, count: i32) -> Option<NaiveDateTime> {
    let back = i64::from(at.weekday().num_days_from_monday());
    let monday = at.checked_sub_signed(TimeDelta::try_days(back)?)?;
    monday.checked_add_signed(TimeDelta::try_weeks(i64::from(count))?)
}

/// Split `pattern(+|-)N[/24[/60]]` into the pattern and its offset.
///
/// Only the right-most sign is considered, so `yyyy-MM-dd` keeps its dashes.
fn split_offset(expr: &str) -> (&str, Option<TimeDelta>) {
    let Some(idx) = expr.rfind(['+', '-']) else {
        return (expr, None);
    };

    match parse_offset(&expr[idx + 1..]) {
        Some(delta) if expr.as_bytes()[idx] == b'-' => (&expr[..idx], Some(-delta)),
        Some(delta) => (&expr[..idx], Some(delta)),
        None => (expr, None),
    }
}

fn parse_offset(raw: &str) -> Option<TimeDelta> {
    let parts: Vec<&str> = raw.split('/').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }
    let amount: i64 = parts[0].parse().ok()?;

    match parts.as_slice() {
        [_] => TimeDelta::try_days(amount),
        [_, "24"] => TimeDelta::try_hours(amount),
        [_, "24", "60"] => TimeDelta::try_minutes(amount),
        _ => None,
    }
}

/// Format `at` with a `yyyyMMdd`-style pattern.
///
/// Any letter that is not part of a known pattern token makes the whole
/// pattern invalid.
fn format_pattern(at: NaiveDateTime, pattern: &str) -> Option<String> {
    const TOKENS: [(&str, &str); 7] = [
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut spec = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;
    let mut saw_token = false;

    'outer: while let Some(ch) = rest.chars().next() {
        for (token, chrono_spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                spec.push_str(chrono_spec);
                rest = tail;
                saw_token = true;
                continue 'outer;
            }
        }

        if ch.is_ascii_alphabetic() {
            return None;
        }
        if ch == '%' {
            spec.push_str("%%");
        } else {
            spec.push(ch);
        }
        rest = &rest[ch.len_utf8()..];
    }

    saw_token.then(|| at.format(&spec).to_string())
}
