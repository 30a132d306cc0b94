use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?[ \t]*\r?\n(.*?)```").expect("fence regex"));
static LOOSE_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array regex"));
static LOOSE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("object regex"));

/// Recover the first JSON value embedded in free-form model output.
///
/// Attempts, first success wins:
/// 1. interior of the first fenced block (or the whole text when unfenced),
///    parsed directly after trimming;
/// 2. the first balanced `{...}` / `[...]` span that parses;
/// 3. the greedy outermost `[...]`, then `{...}` span.
pub fn extract_json(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }

    let raw = FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    if let Ok(v) = serde_json::from_str::<Value>(raw.trim()) {
        return Some(v);
    }

    if let Some(v) = find_balanced(raw) {
        return Some(v);
    }

    for re in [&*LOOSE_ARRAY, &*LOOSE_OBJECT] {
        if let Some(m) = re.find(raw) {
            if let Ok(v) = serde_json::from_str::<Value>(m.as_str()) {
                return Some(v);
            }
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    Escaped,
}

/// Scan for the first balanced span that also parses as JSON.
///
/// Only the bracket type that opened the span counts toward depth; the other
/// type is ignored. Quoted strings (with backslash escapes) are skipped so
/// brackets inside string values never move the depth.
fn find_balanced(s: &str) -> Option<Value> {
    let bytes = s.as_bytes();
    for (start, &open) in bytes.iter().enumerate() {
        let close = match open {
            b'{' => b'}',
            b'[' => b']',
            _ => continue,
        };
        if let Some(v) = scan_from(s, start, open, close) {
            return Some(v);
        }
    }
    None
}

fn scan_from(s: &str, start: usize, open: u8, close: u8) -> Option<Value> {
    let bytes = s.as_bytes();
    let mut state = ScanState::Normal;
    let mut depth: i64 = 0;

    for (j, &c) in bytes.iter().enumerate().skip(start) {
        state = match state {
            ScanState::Escaped => ScanState::InString,
            ScanState::InString => match c {
                b'\\' => ScanState::Escaped,
                b'"' => ScanState::Normal,
                _ => ScanState::InString,
            },
            ScanState::Normal => {
                if c == b'"' {
                    ScanState::InString
                } else {
                    if c == open {
                        depth += 1;
                    } else if c == close {
                        depth -= 1;
                        if depth == 0 {
                            // brackets are ASCII, so both ends sit on char boundaries
                            if let Ok(v) = serde_json::from_str::<Value>(&s[start..=j]) {
                                return Some(v);
                            }
                        }
                    }
                    ScanState::Normal
                }
            }
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn samples() -> Vec<Value> {
        vec![
            json!({"plan_title": "Learn Rust", "days": []}),
            json!([1, 2, 3]),
            json!({"nested": {"list": [{"a": "}{"}, {"b": "]["}]}}),
            json!([{"title": "quote \" and \\ backslash"}]),
        ]
    }

    #[test]
    fn fenced_bare_and_prose_wrapped_values_extract_identically() {
        for v in samples() {
            let ser = serde_json::to_string_pretty(&v).unwrap();
            let fenced = format!("Here you go:\n```json\n{ser}\n```\nEnjoy!");
            let untagged = format!("```\n{ser}\n```");
            let prose = format!("Sure! The plan is {ser} -- let me know.");
            assert_eq!(extract_json(&ser), Some(v.clone()));
            assert_eq!(extract_json(&fenced), Some(v.clone()));
            assert_eq!(extract_json(&untagged), Some(v.clone()));
            assert_eq!(extract_json(&prose), Some(v));
        }
    }

    #[test]
    fn fenced_array_extracts() {
        assert_eq!(extract_json("```json\n[1,2,3]\n```"), Some(json!([1, 2, 3])));
    }

    #[test]
    fn braces_inside_strings_do_not_end_the_span() {
        let text = r#"prefix {"a":"}{"} suffix"#;
        assert_eq!(extract_json(text), Some(json!({"a": "}{"})));
    }

    #[test]
    fn escaped_quotes_keep_string_state() {
        let text = r#"noise {"a":"say \"}\" now","b":1} trailing }"#;
        assert_eq!(extract_json(text), Some(json!({"a": "say \"}\" now", "b": 1})));
    }

    #[test]
    fn opposite_bracket_type_is_ignored_while_scanning() {
        let text = r#"result: {"list": [1, {"x": 2}], "y": "]"} done"#;
        assert_eq!(
            extract_json(text),
            Some(json!({"list": [1, {"x": 2}], "y": "]"}))
        );
    }

    #[test]
    fn unterminated_quote_does_not_produce_a_false_match() {
        assert_eq!(scan_from(r#"{"a": "open}"#, 0, b'{', b'}'), None);
        assert_eq!(extract_json(r#"{"a": "open}"#), None);
    }

    #[test]
    fn skips_unparseable_spans_and_finds_later_value() {
        let text = "first {not json} then {\"ok\": true}";
        assert_eq!(extract_json(text), Some(json!({"ok": true})));
    }

    #[test]
    fn array_preferred_when_it_opens_first() {
        let text = "items: [{\"t\": 1}] and {\"other\": 2}";
        assert_eq!(extract_json(text), Some(json!([{"t": 1}])));
    }

    #[test]
    fn no_json_reports_none() {
        assert_eq!(extract_json(""), None);
        assert_eq!(extract_json("   "), None);
        assert_eq!(extract_json("just some words { and [ broken"), None);
    }

    #[test]
    fn direct_parse_accepts_scalars() {
        assert_eq!(extract_json("  42 "), Some(json!(42)));
    }
}
