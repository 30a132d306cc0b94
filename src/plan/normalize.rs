use serde_json::{Map, Value};

use super::{Day, Difficulty, Plan, Summary, Task};
use crate::errors::PlanError;

const DEFAULT_DURATION: i64 = 30;
const UNTITLED_TASK: &str = "Untitled task";
const TITLE_PREFIX_CHARS: usize = 40;

/// Title stem derived from the user's own words, used when the model omits a
/// plan title.
pub fn title_prefix(user_input: &str) -> String {
    let prefix: String = user_input.trim().chars().take(TITLE_PREFIX_CHARS).collect();
    if prefix.is_empty() {
        "Focused".to_string()
    } else {
        prefix
    }
}

/// Coerce an arbitrarily shaped decoded value into a schema-conformant [`Plan`].
///
/// Structural deviations are repaired, never reported. The only failure is a
/// root that is neither an object nor an array.
pub fn normalize(raw: Value, title_prefix: &str) -> Result<Plan, PlanError> {
    let mut root = match raw {
        Value::Object(map) => map,
        Value::Array(days) => {
            let mut map = Map::new();
            map.insert("days".into(), Value::Array(days));
            map
        }
        _ => return Err(PlanError::InvalidPlanFormat),
    };

    let plan_title = match root.remove("plan_title") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => format!("{title_prefix} Plan"),
    };

    let raw_days = match root.remove("days") {
        Some(Value::Array(days)) => days,
        Some(day @ Value::Object(_)) => vec![day],
        _ => match root.remove("tasks") {
            Some(tasks @ Value::Array(_)) => {
                let mut day = Map::new();
                day.insert("day_title".into(), Value::String("Day 1".into()));
                day.insert("tasks".into(), tasks);
                vec![Value::Object(day)]
            }
            _ => Vec::new(),
        },
    };

    let days: Vec<Day> = raw_days
        .into_iter()
        .enumerate()
        .map(|(idx, d)| normalize_day(d, idx + 1))
        .collect();

    let notes = match root.remove("summary") {
        Some(Value::Object(mut summary)) => match summary.remove("notes") {
            Some(Value::Array(items)) => items.into_iter().filter_map(text_of).collect(),
            _ => Summary::default_notes(),
        },
        _ => Summary::default_notes(),
    };

    let summary = Summary::compute(&days, notes);
    Ok(Plan { plan_title, days, summary })
}

fn normalize_day(raw: Value, number: usize) -> Day {
    let mut day = match raw {
        Value::Object(map) => map,
        Value::Array(tasks) => {
            let mut map = Map::new();
            map.insert("tasks".into(), Value::Array(tasks));
            map
        }
        _ => Map::new(),
    };

    let day_title = day
        .remove("day_title")
        .and_then(text_of)
        .unwrap_or_else(|| format!("Day {number}"));

    let tasks = match day.remove("tasks") {
        Some(Value::Array(tasks)) => tasks.into_iter().map(normalize_task).collect(),
        _ => Vec::new(),
    };

    Day { day_title, tasks }
}

fn normalize_task(raw: Value) -> Task {
    let mut task = match raw {
        Value::Object(map) => map,
        // a bare string is the model listing titles only
        Value::String(title) => {
            let mut map = Map::new();
            map.insert("title".into(), Value::String(title));
            map
        }
        _ => Map::new(),
    };

    let title = task
        .remove("title")
        .and_then(text_of)
        .unwrap_or_else(|| UNTITLED_TASK.to_string());

    let duration = match task.remove("duration") {
        Some(Value::Number(n)) => number_of(&n),
        Some(Value::String(s)) => parse_leading_int(&s),
        _ => None,
    }
    .unwrap_or(DEFAULT_DURATION);

    let difficulty = match task.remove("difficulty") {
        Some(Value::String(s)) => Difficulty::from_label(&s),
        _ => None,
    }
    .unwrap_or(Difficulty::Easy);

    // explicit numeric xp is trusted even when it disagrees with difficulty
    let xp = match task.remove("xp") {
        Some(Value::Number(n)) => number_of(&n),
        _ => None,
    }
    .unwrap_or_else(|| difficulty.xp());

    let steps = match task.remove("steps") {
        Some(Value::Array(items)) => items.into_iter().filter_map(text_of).collect(),
        _ => Vec::new(),
    };

    let time_slot = match task.remove("time_slot") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    };

    let estimation = match task.remove("estimation") {
        Some(v @ Value::Object(_)) => Some(v),
        _ => None,
    };

    Task { title, time_slot, duration, difficulty, xp, steps, estimation }
}

/// Non-empty strings as-is, numbers in their JSON spelling, anything else dropped.
fn text_of(v: Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(n: &serde_json::Number) -> Option<i64> {
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.round() as i64)
    })
}

/// Leading decimal integer of `s`, after optional whitespace and sign:
/// `"45 min"` -> 45, `"abc"` -> None.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits: &str = &rest[..rest.bytes().take_while(u8::is_ascii_digit).count()];
    digits.parse::<i64>().ok().map(|n| sign * n)
}
