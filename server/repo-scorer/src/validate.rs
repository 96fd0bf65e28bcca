//! Response validator: untrusted model text -> EvaluationResult.
//!
//! Repair policy, applied the same way to every response:
//! - fatal: no JSON object; `score` missing, non-numeric, fractional or
//!   outside 0..=100; `summary` missing or blank; `roadmap` missing or empty
//!   after dropping blank entries.
//! - repaired (and recorded): numeric-string score; `level`/`medal` missing,
//!   unknown or inconsistent with score (re-derived from score); roadmap given
//!   as a single string; non-string or blank roadmap entries; roadmap longer
//!   than the configured maximum (truncated).

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::types::*;

pub struct Validator {
  roadmap_max_steps: usize,
}

impl Validator {
  pub fn new(roadmap_max_steps: usize) -> Self {
    Self {
      roadmap_max_steps: roadmap_max_steps.max(1),
    }
  }

  pub fn validate(&self, raw: &str) -> Result<Validated, SchemaError> {
    let object = extract_object(raw)
      .ok_or_else(|| SchemaError::new("$", "no JSON object found in response"))?;
    let mut repairs = Vec::new();

    let score = read_score(&object, &mut repairs)?;

    let level = Level::from_score(score);
    match object.get("level").and_then(Value::as_str) {
      Some(s) => match Level::from_str_loose(s) {
        Some(given) if given == level => {}
        Some(given) => repairs.push(Repair::new(
          "level",
          format!("{} inconsistent with score {}; using {}", given.as_str(), score, level.as_str()),
        )),
        None => repairs.push(Repair::new(
          "level",
          format!("unknown level {:?}; using {}", s, level.as_str()),
        )),
      },
      None => repairs.push(Repair::new(
        "level",
        format!("missing; derived {} from score", level.as_str()),
      )),
    }

    let medal = Medal::from_score(score);
    match object.get("medal").and_then(Value::as_str) {
      Some(s) => match Medal::from_str_loose(s) {
        Some(given) if given == medal => {}
        Some(given) => repairs.push(Repair::new(
          "medal",
          format!("{} inconsistent with score {}; using {}", given.as_str(), score, medal.as_str()),
        )),
        None => repairs.push(Repair::new(
          "medal",
          format!("unknown medal {:?}; using {}", s, medal.as_str()),
        )),
      },
      None => repairs.push(Repair::new(
        "medal",
        format!("missing; derived {} from score", medal.as_str()),
      )),
    }

    let summary = match object.get("summary") {
      Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
      Some(Value::String(_)) => return Err(SchemaError::new("summary", "must not be empty")),
      Some(_) => return Err(SchemaError::new("summary", "expected a string")),
      None => return Err(SchemaError::new("summary", "missing")),
    };

    let mut roadmap = match object.get("roadmap") {
      Some(Value::Array(items)) => string_entries("roadmap", items, &mut repairs),
      Some(Value::String(s)) => {
        repairs.push(Repair::new("roadmap", "single string wrapped into a list"));
        string_entries("roadmap", &[Value::String(s.clone())], &mut repairs)
      }
      Some(_) => return Err(SchemaError::new("roadmap", "expected an array of strings")),
      None => return Err(SchemaError::new("roadmap", "missing")),
    };
    if roadmap.is_empty() {
      return Err(SchemaError::new("roadmap", "no non-empty steps"));
    }
    if roadmap.len() > self.roadmap_max_steps {
      repairs.push(Repair::new(
        "roadmap",
        format!("truncated from {} to {} steps", roadmap.len(), self.roadmap_max_steps),
      ));
      roadmap.truncate(self.roadmap_max_steps);
    }

    let strengths = optional_list("strengths", &object, &mut repairs);
    let improvements = optional_list("improvements", &object, &mut repairs);

    Ok(Validated {
      result: EvaluationResult {
        score,
        level,
        medal,
        summary,
        roadmap,
        strengths,
        improvements,
      },
      repairs,
    })
  }
}

fn read_score(object: &Map<String, Value>, repairs: &mut Vec<Repair>) -> Result<u8, SchemaError> {
  let value = match object.get("score") {
    Some(Value::Number(n)) => n
      .as_f64()
      .ok_or_else(|| SchemaError::new("score", "not a finite number"))?,
    Some(Value::String(s)) => {
      let parsed: f64 = s
        .trim()
        .parse()
        .map_err(|_| SchemaError::new("score", format!("not a number: {:?}", s)))?;
      repairs.push(Repair::new("score", format!("string {:?} coerced to number", s)));
      parsed
    }
    Some(_) => return Err(SchemaError::new("score", "expected an integer")),
    None => return Err(SchemaError::new("score", "missing")),
  };

  if value.fract() != 0.0 {
    return Err(SchemaError::new("score", format!("{} is not an integer", value)));
  }
  if !(0.0..=100.0).contains(&value) {
    return Err(SchemaError::new("score", format!("{} outside 0..=100", value)));
  }
  Ok(value as u8)
}

/// Keep trimmed non-empty strings; note anything dropped.
fn string_entries(field: &str, items: &[Value], repairs: &mut Vec<Repair>) -> Vec<String> {
  let mut out = Vec::with_capacity(items.len());
  let mut dropped = 0usize;
  for item in items {
    match item.as_str().map(str::trim) {
      Some(s) if !s.is_empty() => out.push(s.to_string()),
      _ => dropped += 1,
    }
  }
  if dropped > 0 {
    repairs.push(Repair::new(field, format!("dropped {} empty or non-string entries", dropped)));
  }
  out
}

fn optional_list(field: &str, object: &Map<String, Value>, repairs: &mut Vec<Repair>) -> Vec<String> {
  match object.get(field) {
    Some(Value::Array(items)) => string_entries(field, items, repairs),
    Some(Value::Null) | None => Vec::new(),
    Some(_) => {
      repairs.push(Repair::new(field, "not an array; ignored"));
      Vec::new()
    }
  }
}

/// Find the first well-formed JSON object in `raw`, skipping any surrounding
/// prose or code fences.
pub fn extract_object(raw: &str) -> Option<Map<String, Value>> {
  if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
    return Some(map);
  }

  let bytes = raw.as_bytes();
  let mut start = 0;
  while let Some(offset) = raw[start..].find('{') {
    let open = start + offset;
    if let Some(close) = matching_brace(bytes, open) {
      if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&raw[open..=close]) {
        return Some(map);
      }
    }
    start = open + 1;
  }
  None
}

/// Index of the `}` closing the `{` at `open`, honoring JSON string escapes.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;
  for (i, &b) in bytes.iter().enumerate().skip(open) {
    if in_string {
      if escaped {
        escaped = false;
      } else if b == b'\\' {
        escaped = true;
      } else if b == b'"' {
        in_string = false;
      }
      continue;
    }
    match b {
      b'"' => in_string = true,
      b'{' => depth += 1,
      b'}' => {
        depth -= 1;
        if depth == 0 {
          return Some(i);
        }
      }
      _ => {}
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  const VALID: &str = r#"{
    "score": 82,
    "level": "Advanced",
    "medal": "Silver",
    "summary": "Well structured CLI with clear docs.",
    "strengths": ["Clear README", "Active history"],
    "improvements": ["Add CI"],
    "roadmap": ["Add unit tests", "Set up CI", "Tag releases"]
  }"#;

  fn validator() -> Validator {
    Validator::new(5)
  }

  #[test]
  fn valid_response_passes_unchanged() {
    let v = validator().validate(VALID).unwrap();
    assert!(v.repairs.is_empty(), "{:?}", v.repairs);
    assert_eq!(v.result.score, 82);
    assert_eq!(v.result.level, Level::Advanced);
    assert_eq!(v.result.medal, Medal::Silver);
    assert_eq!(v.result.roadmap.len(), 3);
    assert_eq!(v.result.strengths.len(), 2);
  }

  #[test]
  fn code_fenced_and_chatty_responses_are_extracted() {
    let fenced = format!("```json\n{}\n```", VALID);
    assert_eq!(validator().validate(&fenced).unwrap().result.score, 82);

    let chatty = format!("Sure! Here is my evaluation:\n{}\nHope this helps {{:}}", VALID);
    assert_eq!(validator().validate(&chatty).unwrap().result.score, 82);
  }

  #[test]
  fn braces_inside_strings_do_not_confuse_extraction() {
    let raw = r#"note {not json} then {"score": 10, "level": "Beginner", "medal": "None",
      "summary": "Uses {braces} and \"quotes\"", "roadmap": ["Write a README }"]}"#;
    let v = validator().validate(raw).unwrap();
    assert_eq!(v.result.summary, "Uses {braces} and \"quotes\"");
    assert_eq!(v.result.roadmap, vec!["Write a README }"]);
  }

  #[test]
  fn no_object_is_malformed() {
    let err = validator().validate("I cannot evaluate this repository.").unwrap_err();
    assert_eq!(err.field, "$");
    assert!(validator().validate("{\"score\": 5,").is_err());
  }

  #[test]
  fn missing_roadmap_is_fatal() {
    let raw = r#"{"score": 50, "level": "Intermediate", "medal": "Bronze", "summary": "ok"}"#;
    let err = validator().validate(raw).unwrap_err();
    assert_eq!(err.field, "roadmap");
  }

  #[test]
  fn blank_roadmap_entries_are_dropped_and_all_blank_is_fatal() {
    let raw = r#"{"score": 50, "level": "Intermediate", "medal": "Bronze", "summary": "ok",
      "roadmap": ["  ", "Add tests", "", 3]}"#;
    let v = validator().validate(raw).unwrap();
    assert_eq!(v.result.roadmap, vec!["Add tests"]);
    assert!(v.repairs.iter().any(|r| r.field == "roadmap"));

    let raw = r#"{"score": 50, "summary": "ok", "roadmap": ["  ", ""]}"#;
    assert_eq!(validator().validate(raw).unwrap_err().field, "roadmap");
  }

  #[test]
  fn out_of_range_or_fractional_score_is_fatal() {
    for score in ["150", "-1", "72.5", "\"high\"", "null", "[80]"] {
      let raw = format!(r#"{{"score": {}, "summary": "ok", "roadmap": ["a"]}}"#, score);
      let err = validator().validate(&raw).unwrap_err();
      assert_eq!(err.field, "score", "score {}", score);
    }
    let err = validator().validate(r#"{"summary": "ok", "roadmap": ["a"]}"#).unwrap_err();
    assert_eq!(err.field, "score");
  }

  #[test]
  fn inconsistent_level_and_medal_are_rederived() {
    let raw = r#"{"score": 95, "level": "Beginner", "medal": "Bronze",
      "summary": "Excellent.", "roadmap": ["Keep going"]}"#;
    let v = validator().validate(raw).unwrap();
    assert_eq!(v.result.level, Level::Expert);
    assert_eq!(v.result.medal, Medal::Gold);
    let fields: Vec<_> = v.repairs.iter().map(|r| r.field.as_str()).collect();
    assert_eq!(fields, vec!["level", "medal"]);
  }

  #[test]
  fn missing_or_unknown_tiers_are_derived() {
    let raw = r#"{"score": 30, "medal": "Platinum", "summary": "Early.", "roadmap": ["Add README"]}"#;
    let v = validator().validate(raw).unwrap();
    assert_eq!(v.result.level, Level::Beginner);
    assert_eq!(v.result.medal, Medal::None);
    assert_eq!(v.repairs.len(), 2);
  }

  #[test]
  fn minor_format_deviations_are_coerced() {
    let raw = r#"{"score": "64", "level": "intermediate", "medal": "bronze",
      "summary": "  Decent start.  ", "roadmap": "Add tests", "strengths": "n/a"}"#;
    let v = validator().validate(raw).unwrap();
    assert_eq!(v.result.score, 64);
    assert_eq!(v.result.level, Level::Intermediate);
    assert_eq!(v.result.medal, Medal::Bronze);
    assert_eq!(v.result.summary, "Decent start.");
    assert_eq!(v.result.roadmap, vec!["Add tests"]);
    assert!(v.result.strengths.is_empty());
    let fields: Vec<_> = v.repairs.iter().map(|r| r.field.as_str()).collect();
    assert_eq!(fields, vec!["score", "roadmap", "strengths"]);

    // 80.0 is an integer value.
    let raw = r#"{"score": 80.0, "level": "Advanced", "medal": "Silver", "summary": "ok", "roadmap": ["a"]}"#;
    assert_eq!(validator().validate(raw).unwrap().result.score, 80);
  }

  #[test]
  fn long_roadmap_is_truncated() {
    let raw = r#"{"score": 75, "level": "Advanced", "medal": "Silver", "summary": "ok",
      "roadmap": ["1", "2", "3", "4", "5", "6", "7"]}"#;
    let v = Validator::new(5).validate(raw).unwrap();
    assert_eq!(v.result.roadmap, vec!["1", "2", "3", "4", "5"]);
    assert!(v.repairs[0].note.contains("truncated"));
  }

  #[test]
  fn summary_is_required() {
    let raw = r#"{"score": 75, "summary": "   ", "roadmap": ["a"]}"#;
    assert_eq!(validator().validate(raw).unwrap_err().field, "summary");
    let raw = r#"{"score": 75, "summary": 7, "roadmap": ["a"]}"#;
    assert_eq!(validator().validate(raw).unwrap_err().field, "summary");
  }
}
