//! Parsing model output back into test-case candidates
//!
//! Strict JSON first; on failure a fixed sequence of punctuation repairs is
//! applied and the text is parsed once more. Repairs never touch characters
//! inside double-quoted strings.

use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum MalformedGenerationError {
    #[error("model output is not valid JSON even after repair: {source}")]
    InvalidJson {
        source: serde_json::Error,
        repaired: String,
    },
    #[error("model output is JSON but the top level is {found}, not an array")]
    NotAnArray { found: &'static str, repaired: String },
}

impl MalformedGenerationError {
    /// The text that was handed to the final parse attempt.
    #[must_use]
    pub fn repaired_text(&self) -> &str {
        match self {
            Self::InvalidJson { repaired, .. } | Self::NotAnArray { repaired, .. } => repaired,
        }
    }
}

/// Punctuation fixes for common model slips, applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairRule {
    /// Drop lines that are entirely a `//` or `#` comment.
    StripLineComments,
    /// `'value'` → `"value"`; apostrophes inside `"..."` are left alone.
    NormalizeQuotes,
    /// `"a" "b"` → `"a", "b"`
    CommaBetweenStrings,
    /// `} {` / `] {` → `}, {` / `], {`
    CommaBetweenObjects,
    /// `,}` / `,]` → `}` / `]`
    StripTrailingCommas,
}

impl RepairRule {
    pub const ORDERED: [Self; 5] = [
        Self::StripLineComments,
        Self::NormalizeQuotes,
        Self::CommaBetweenStrings,
        Self::CommaBetweenObjects,
        Self::StripTrailingCommas,
    ];

    #[must_use]
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::StripLineComments => strip_line_comments(text),
            Self::NormalizeQuotes => normalize_quotes(text),
            Self::CommaBetweenStrings => comma_between_strings(text),
            Self::CommaBetweenObjects => comma_between_objects(text),
            Self::StripTrailingCommas => strip_trailing_commas(text),
        }
    }
}

/// Parse raw model output into a list of candidate objects.
///
/// # Errors
///
/// Returns [`MalformedGenerationError`] when neither the strict parse nor the
/// repaired parse yields a top-level JSON array.
pub fn parse_test_cases(raw: &str) -> Result<Vec<Value>, MalformedGenerationError> {
    let text = strip_fences(raw);

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) {
        return Ok(items);
    }

    let repaired = repair(text);
    debug!(bytes = repaired.len(), "strict parse failed, retrying repaired output");

    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(other) => Err(MalformedGenerationError::NotAnArray {
            found: json_type(&other),
            repaired,
        }),
        Err(source) => Err(MalformedGenerationError::InvalidJson { source, repaired }),
    }
}

/// Apply every [`RepairRule`] in order.
#[must_use]
pub fn repair(text: &str) -> String {
    RepairRule::ORDERED
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

/// Trim whitespace, a leading code fence with optional `json` tag, and a
/// trailing fence.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start();
        if let Some(rest) = text.strip_prefix("json") {
            text = rest;
        }
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Outside,
    Opening,
    Inside,
    Closing,
}

/// Tracks double-quoted string boundaries one character at a time.
#[derive(Default)]
struct StringTracker {
    in_string: bool,
    escaped: bool,
}

impl StringTracker {
    fn step(&mut self, c: char) -> Position {
        if !self.in_string {
            if c == '"' {
                self.in_string = true;
                return Position::Opening;
            }
            return Position::Outside;
        }
        if self.escaped {
            self.escaped = false;
            return Position::Inside;
        }
        match c {
            '\\' => {
                self.escaped = true;
                Position::Inside
            }
            '"' => {
                self.in_string = false;
                Position::Closing
            }
            _ => Position::Inside,
        }
    }
}

fn next_significant(chars: &[char], from: usize) -> Option<char> {
    chars.get(from..)?.iter().copied().find(|c| !c.is_whitespace())
}

fn strip_line_comments(text: &str) -> String {
    text.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !(trimmed.starts_with("//") || trimmed.starts_with('#'))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            escaped = false;
            // `\'` is not a JSON escape
            if in_single && c == '\'' {
                out.pop();
            }
            out.push(c);
            continue;
        }
        match c {
            '\\' if in_double || in_single => {
                escaped = true;
                out.push(c);
            }
            '"' if in_single => out.push_str("\\\""),
            '"' => {
                in_double = !in_double;
                out.push(c);
            }
            '\'' if in_single => {
                in_single = false;
                out.push('"');
            }
            '\'' if !in_double => {
                in_single = true;
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    out
}

fn comma_between_strings(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut tracker = StringTracker::default();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let pos = tracker.step(c);
        out.push(c);
        if pos == Position::Closing && next_significant(&chars, i + 1) == Some('"') {
            out.push(',');
        }
    }
    out
}

fn comma_between_objects(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut tracker = StringTracker::default();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let pos = tracker.step(c);
        out.push(c);
        if pos == Position::Outside
            && matches!(c, '}' | ']')
            && next_significant(&chars, i + 1) == Some('{')
        {
            out.push(',');
        }
    }
    out
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut tracker = StringTracker::default();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let pos = tracker.step(c);
        if pos == Position::Outside
            && c == ','
            && matches!(next_significant(&chars, i + 1), Some('}' | ']'))
        {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn strict_array_passes_through() {
        let out = parse_test_cases(r#"[{"Test Case Name": "a"}]"#).unwrap();
        assert_eq!(out, vec![json!({"Test Case Name": "a"})]);
    }

    #[test]
    fn strips_fences_with_language_tag() {
        let raw = "```json\n[{\"a\": 1}]\n```";
        assert_eq!(parse_test_cases(raw).unwrap(), vec![json!({"a": 1})]);
        let raw = "  ```\n[]\n```  ";
        assert!(parse_test_cases(raw).unwrap().is_empty());
    }

    #[test]
    fn repairs_trailing_comma() {
        let out = parse_test_cases(r#"[{"a": 1,}, ]"#).unwrap();
        assert_eq!(out, vec![json!({"a": 1})]);
    }

    #[test]
    fn repairs_single_quotes() {
        let out = parse_test_cases("[{'Method': 'GET', 'Expected Status Code': 200}]").unwrap();
        assert_eq!(out[0]["Method"], "GET");
        assert_eq!(out[0]["Expected Status Code"], 200);
    }

    #[test]
    fn object_is_not_an_array() {
        let err = parse_test_cases(r#"{"a": 1}"#).unwrap_err();
        assert!(matches!(err, MalformedGenerationError::NotAnArray { found: "an object", .. }));
        assert_eq!(err.repaired_text(), r#"{"a": 1}"#);
    }

    #[test]
    fn garbage_keeps_parse_error_and_text() {
        let err = parse_test_cases("Sure! Here are your test cases:").unwrap_err();
        match &err {
            MalformedGenerationError::InvalidJson { repaired, .. } => {
                assert_eq!(repaired, "Sure! Here are your test cases:");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn combined_slips_are_repaired() {
        let raw = r#"```json
[
  // first case
  {
    "Test Case Name": "Happy path"
    "Method": 'POST',
    "Expected Status Code": 200,
  }
  {
    # second case
    "Test Case Name": "Missing name",
    "Method": "POST",
    "Expected Status Code": 405,
  },
]
```"#;
        let out = parse_test_cases(raw).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["Method"], "POST");
        assert_eq!(out[1]["Expected Status Code"], 405);
    }

    #[test]
    fn repairs_leave_string_contents_alone() {
        let raw = r#"[{"Description": "it's // not, a comment #1 ,} 'quoted' "   "x": 1,}]"#;
        let out = parse_test_cases(raw).unwrap();
        assert_eq!(out[0]["Description"], "it's // not, a comment #1 ,} 'quoted' ");
        assert_eq!(out[0]["x"], 1);
    }

    #[test]
    fn rule_strip_line_comments() {
        let text = "[\n  // note\n  # also\n  1\n]";
        assert_eq!(RepairRule::StripLineComments.apply(text), "[\n  1\n]");
    }

    #[test]
    fn rule_normalize_quotes() {
        assert_eq!(
            RepairRule::NormalizeQuotes.apply(r#"{'a': 'say "hi"', "b": "don't"}"#),
            r#"{"a": "say \"hi\"", "b": "don't"}"#
        );
        assert_eq!(RepairRule::NormalizeQuotes.apply(r"['it\'s']"), r#"["it's"]"#);
    }

    #[test]
    fn rule_comma_between_strings() {
        assert_eq!(
            RepairRule::CommaBetweenStrings.apply("{\"a\": \"x\"\n \"b\": \"y\"}"),
            "{\"a\": \"x\",\n \"b\": \"y\"}"
        );
        assert_eq!(RepairRule::CommaBetweenStrings.apply(r#"["a", "b"]"#), r#"["a", "b"]"#);
    }

    #[test]
    fn rule_comma_between_objects() {
        assert_eq!(RepairRule::CommaBetweenObjects.apply("[{} {}]"), "[{}, {}]");
        assert_eq!(RepairRule::CommaBetweenObjects.apply("[[1]\n{}]"), "[[1],\n{}]");
        assert_eq!(RepairRule::CommaBetweenObjects.apply(r#"["} {"]"#), r#"["} {"]"#);
    }

    #[test]
    fn rule_strip_trailing_commas() {
        assert_eq!(RepairRule::StripTrailingCommas.apply("[1, 2,\n]"), "[1, 2\n]");
        assert_eq!(RepairRule::StripTrailingCommas.apply(r#"{"a": ",}",}"#), r#"{"a": ",}"}"#);
    }

    fn arb_case() -> impl Strategy<Value = Value> {
        ("[a-zA-Z ']{0,20}", "[A-Z]{3,6}", 100u16..600).prop_map(|(name, method, code)| {
            json!({
                "Test Case Name": name,
                "Method": method,
                "Expected Status Code": code,
                "Request Body": {"note": "a, b // c"}
            })
        })
    }

    proptest! {
        #[test]
        fn well_formed_output_round_trips(cases in prop::collection::vec(arb_case(), 0..6), fenced: bool) {
            let body = serde_json::to_string_pretty(&cases).unwrap();
            let raw = if fenced { format!("```json\n{body}\n```") } else { body };
            prop_assert_eq!(parse_test_cases(&raw).unwrap(), cases);
        }

        #[test]
        fn repair_is_identity_on_valid_json(cases in prop::collection::vec(arb_case(), 0..6)) {
            let body = serde_json::to_string(&cases).unwrap();
            let repaired: Value = serde_json::from_str(&repair(&body)).unwrap();
            prop_assert_eq!(repaired, Value::Array(cases));
        }
    }
}
