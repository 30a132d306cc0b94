use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::plan::PlanRequest;

/// The three artifacts sent to the model for one plan generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBundle {
    pub system: String,
    pub prompt: String,
    pub schema: Value,
}

impl PromptBundle {
    /// Prompt text with the schema appended, as the raw upstream request wants it.
    pub fn prompt_with_schema(&self) -> String {
        append_schema(&self.prompt, &self.schema.to_string())
    }
}

pub fn append_schema(prompt: &str, schema: &str) -> String {
    format!("{prompt}\n\nJSON Schema (enforce strictly):\n{schema}")
}

/// Build everything the model needs for `req`. Pure: same request, same output.
pub fn build(req: &PlanRequest) -> PromptBundle {
    PromptBundle {
        system: system_prompt_plan().to_string(),
        prompt: user_prompt_plan(req),
        schema: plan_schema(),
    }
}

pub fn system_prompt_plan() -> &'static str {
r#"You are a TruFlo productivity coach for 16–35 year olds. Craft realistic, motivating daily plans that convert intentions into measurable outputs.
Voice & Ethos
- Energetic, concise, encouraging. Gamify with XP, streaks, and milestone nudges.

Cadence & Structure
- 2–4 tasks/day. Cadence: Easy → Medium → Hard; never 3 of the same in a row.
- Always finish with a light/reflection task to avoid fatigue.
- Each task is 10–90 minutes. Insert 5–10 minute breaks after every 40–60 minutes of work. No overlaps; stay within the window.

XP System (Universal)
- Easy=10 XP (setup/review/reflection/light). Medium=20 XP (main practice/build). Hard=30 XP (deep work/problem-solving).
- Log daily XP earned.

Task Design Rules
- Concrete & Measurable: every step produces outputs (flashcards, notes, commits, sets/reps, drafts, etc.).
- Context-Specific Vocabulary: adapt steps to the domain (study=flashcards, coding=commits, fitness=sets/reps, creative=drafts/sketches).
- No filler (e.g., "study harder").

Mood & Energy Adaptation
- If stress/low energy → start with Easy win; sprinkle micro-nudges (breath, micro-celebration, reflection).
- If high energy/flow → begin with Medium, ramp to Hard.

Realism & Flexibility
- Setup/config tasks usually need 20–30 min (not 10-min installs).
- Complex tasks should include debug/troubleshoot/revision time.
- Final day is lighter: confidence review, wrap-up, and celebration.

Engagement & Gamification
- Show daily XP totals and streak day number.
- Milestones: Day 3 → "Halfway there 🚀"; Final Day → "Boss Fight / Wrap-Up Challenge".

Verification Policy
- Core/Deep tasks → include a verification step (test run, commit, self-quiz).
- Closure task → always verified (reflection, XP log, or artifact)."#
}

pub fn user_prompt_plan(req: &PlanRequest) -> String {
    let window = req.window.to_string();
    let n = req.day_count;
    format!(
"You are planning inside the TruFlo app. Given the user input: \"{input}\", generate a focused plan for {duration} that fits entirely within {window}.
Mood context: {mood} (adapt the starting task as per rules).
Create exactly {n} day entries (days.length === {n}). Each day uses the same time window.

Planning rules (TruFlo flow):
1) Daily cadence: Easy → Medium → Hard (never 3 of the same in a row). End with a light/reflection task.
2) Per day, 2–4 total tasks. Insert 5–10 minute breaks between all tasks. Each task is 10–90 minutes.
3) Each task MUST include:
  - title (actionable and specific),
  - time_slot (12-hour \"h:mm am/pm - h:mm am/pm\"),
  - duration (minutes, 10–90),
  - difficulty (Easy/Medium/Hard),
  - xp (10/20/30 per mapping),
  - steps (5–7 bullet steps).
4) Steps must be concrete, measurable, and tied to visible outputs/artifacts (flashcards, commits, sets/reps, drafts, links, etc.).
   Include micro-nudges where helpful (breath cue, mini-celebration, reflection).
5) Estimate durations from step scope at an average-person pace; optionally include estimation rationale; add a 15–25% buffer; round to 5 minutes.
6) Do not set duration from difficulty; choose difficulty based on cognitive load/ambiguity.
7) Ensure scheduled minutes + breaks fit strictly within the time window. Do not overlap.
8) Return ONLY JSON matching the schema (no extra keys, no explanations).",
        input = req.user_input,
        duration = req.duration_label(),
        mood = req.mood_label(),
    )
}

/// Structural contract the model is asked to honour.
pub fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "plan_title": { "type": "string", "minLength": 8 },
            "days": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "day_title": { "type": "string", "minLength": 3 },
                        "tasks": {
                            "type": "array",
                            "minItems": 2,
                            "maxItems": 4,
                            "items": {
                                "type": "object",
                                "properties": {
                                    "title": { "type": "string", "minLength": 8 },
                                    "time_slot": {
                                        "type": "string",
                                        "pattern": r"^(0?[1-9]|1[0-2]):[0-5][0-9]\s?(am|pm)\s?-\s?(0?[1-9]|1[0-2]):[0-5][0-9]\s?(am|pm)$"
                                    },
                                    "duration": { "type": "integer", "minimum": 10, "maximum": 90 },
                                    "difficulty": { "type": "string", "enum": ["Easy", "Medium", "Hard"] },
                                    "xp": { "type": "integer", "enum": [10, 20, 30] },
                                    "steps": {
                                        "type": "array",
                                        "minItems": 5,
                                        "maxItems": 7,
                                        "items": { "type": "string", "minLength": 12 }
                                    },
                                    "estimation": {
                                        "type": "object",
                                        "properties": {
                                            "rationale": { "type": "string", "minLength": 16 },
                                            "base_units": { "type": "string" },
                                            "unit_count": { "type": "integer", "minimum": 1 },
                                            "minutes_per_unit": { "type": "integer", "minimum": 1 },
                                            "computed_minutes": { "type": "integer", "minimum": 5 }
                                        },
                                        "required": ["rationale", "computed_minutes"]
                                    }
                                },
                                "required": ["title", "time_slot", "duration", "difficulty", "xp", "steps"]
                            }
                        }
                    },
                    "required": ["day_title", "tasks"]
                }
            },
            "summary": {
                "type": "object",
                "properties": {
                    "total_tasks": { "type": "integer" },
                    "difficulty_breakdown": { "type": "object" },
                    "total_xp": { "type": "integer" },
                    "total_time": { "type": "integer" },
                    "notes": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["total_tasks", "difficulty_breakdown", "total_xp", "total_time", "notes"]
            }
        },
        "required": ["plan_title", "days", "summary"]
    })
}

/// Prompt asking for a flat breakdown of one task.
pub fn subtask_prompt(task_description: &str, focus_minutes: u32) -> String {
    format!(
        "Break down this task into smaller subtasks: \"{task_description}\". Each subtask should be 15-45 minutes. \
Return ONLY a JSON array of objects with exact keys: title (string), estMinutes (number), difficulty (1,2,3). \
Consider user focus length: {focus_minutes} minutes."
    )
}
