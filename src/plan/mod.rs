use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::PlanError;

mod normalize;

pub use normalize::{normalize, title_prefix};

/// ========================================
/// Plan request
/// ========================================

/// Daily time window, reused identically for every day of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, PlanError> {
        if start == end {
            return Err(PlanError::InvalidRequest(
                "time window start and end must differ".into(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse `"9:00 am - 11:30 am"`, `"9am-11am"` or `"09:00 - 11:30"`.
    pub fn parse(s: &str) -> Result<Self, PlanError> {
        let (a, b) = s
            .split_once(|c: char| c == '-' || c == '–')
            .or_else(|| s.split_once(" to "))
            .ok_or_else(|| {
                PlanError::InvalidRequest(format!("time window '{s}' must look like '9:00 am - 11:00 am'"))
            })?;
        Self::new(parse_clock(a)?, parse_clock(b)?)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%-I:%M %P"), self.end.format("%-I:%M %P"))
    }
}

fn parse_clock(raw: &str) -> Result<NaiveTime, PlanError> {
    let mut compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_lowercase();
    // "9am" -> "9:00am", "15" -> "15:00"
    if !compact.contains(':') {
        let digits = compact.chars().take_while(char::is_ascii_digit).count();
        compact.insert_str(digits, ":00");
    }
    ["%I:%M%p", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&compact, fmt).ok())
        .ok_or_else(|| PlanError::InvalidRequest(format!("unrecognised time '{}'", raw.trim())))
}

/// Everything the user supplies for one plan generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub user_input: String,
    pub day_count: u32,
    pub window: TimeWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

impl PlanRequest {
    pub fn new(
        user_input: impl Into<String>,
        day_count: u32,
        window: TimeWindow,
        mood: Option<String>,
    ) -> Result<Self, PlanError> {
        if day_count == 0 {
            return Err(PlanError::InvalidRequest("day count must be at least 1".into()));
        }
        Ok(Self {
            user_input: user_input.into(),
            day_count,
            window,
            mood: mood.filter(|m| !m.trim().is_empty()),
        })
    }

    /// Human phrasing of the plan length, e.g. "3 days".
    pub fn duration_label(&self) -> String {
        match self.day_count {
            1 => "1 day".to_string(),
            n => format!("{n} days"),
        }
    }

    pub fn mood_label(&self) -> &str {
        self.mood.as_deref().unwrap_or("neutral")
    }
}

/// ========================================
/// Plan model
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn xp(self) -> i64 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Case-insensitive match against the three labels.
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|d| d.label().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    /// Minutes.
    pub duration: i64,
    pub difficulty: Difficulty,
    pub xp: i64,
    pub steps: Vec<String>,
    /// Optional sizing rationale the model may attach; passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimation: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub day_title: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tasks: usize,
    pub difficulty_breakdown: BTreeMap<Difficulty, usize>,
    pub total_xp: i64,
    /// Minutes of task time; breaks between tasks are not counted.
    pub total_time: i64,
    pub notes: Vec<String>,
}

impl Summary {
    pub fn default_notes() -> Vec<String> {
        vec![
            "Auto-generated by TruFlo AI".to_string(),
            "Includes realistic breaks between each task by difficulty, the breaks must be 5-20 mins atmost; total time may exclude breaks.".to_string(),
        ]
    }

    /// Aggregate over every task of every day.
    pub fn compute(days: &[Day], notes: Vec<String>) -> Self {
        let mut difficulty_breakdown = BTreeMap::new();
        let mut total_tasks = 0;
        let mut total_xp = 0;
        let mut total_time = 0;
        for task in days.iter().flat_map(|d| d.tasks.iter()) {
            total_tasks += 1;
            total_xp = i64::saturating_add(total_xp, task.xp);
            total_time = i64::saturating_add(total_time, task.duration);
            *difficulty_breakdown.entry(task.difficulty).or_insert(0) += 1;
        }
        Self { total_tasks, difficulty_breakdown, total_xp, total_time, notes }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_title: String,
    pub days: Vec<Day>,
    pub summary: Summary,
}

impl Plan {
    /// Keep only the first `n` days, in order. The summary is recomputed so it
    /// keeps describing exactly the days returned.
    pub fn truncate_days(&mut self, n: usize) {
        if self.days.len() > n {
            self.days.truncate(n);
            let notes = std::mem::take(&mut self.summary.notes);
            self.summary = Summary::compute(&self.days, notes);
        }
    }
}

/// One item of a task breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(rename = "estMinutes")]
    pub est_minutes: i64,
    /// 1 (light) to 3 (hard).
    pub difficulty: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn time_window_parses_twelve_and_twenty_four_hour_forms() {
        let w = TimeWindow::parse("3:00 pm - 5:30 pm").unwrap();
        assert_eq!(w, TimeWindow { start: t(15, 0), end: t(17, 30) });
        assert_eq!(TimeWindow::parse("15:00-17:30").unwrap(), w);
        assert_eq!(TimeWindow::parse("3pm – 5:30PM").unwrap(), w);
        assert_eq!(TimeWindow::parse("9 a.m. to 11 a.m.").unwrap().start, t(9, 0));
    }

    #[test]
    fn time_window_renders_in_twelve_hour_clock() {
        let w = TimeWindow::parse("09:05 - 13:00").unwrap();
        assert_eq!(w.to_string(), "9:05 am - 1:00 pm");
    }

    #[test]
    fn time_window_rejects_garbage_and_empty_ranges() {
        assert!(TimeWindow::parse("whenever").is_err());
        assert!(TimeWindow::parse("25:00 - 26:00").is_err());
        assert!(TimeWindow::parse("9am - 9am").is_err());
    }

    #[test]
    fn plan_request_requires_positive_day_count() {
        let w = TimeWindow::parse("9am - 11am").unwrap();
        assert!(PlanRequest::new("x", 0, w, None).is_err());
        let r = PlanRequest::new("x", 45, w, Some("  ".into())).unwrap();
        assert_eq!(r.day_count, 45);
        assert_eq!(r.mood, None);
        assert_eq!(r.mood_label(), "neutral");
        assert_eq!(r.duration_label(), "45 days");
    }

    #[test]
    fn difficulty_labels_and_xp() {
        assert_eq!(Difficulty::from_label(" medium "), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_label("Extreme"), None);
        assert_eq!(Difficulty::Hard.xp(), 30);
        let breakdown: BTreeMap<Difficulty, usize> = [(Difficulty::Hard, 2)].into();
        assert_eq!(serde_json::to_string(&breakdown).unwrap(), r#"{"Hard":2}"#);
    }
}
