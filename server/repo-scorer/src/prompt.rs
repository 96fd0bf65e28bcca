//! Prompt builder: FeatureRecord -> EvaluationRequest.
//!
//! Pure and deterministic. The same record and persona always render the same
//! text; the output schema is spelled out in full so the model has no room to
//! improvise field names or values.

use serde_json::{json, Value};

use crate::types::*;

/// Bumped whenever the requested output schema changes.
pub const SCHEMA_VERSION: &str = "repo-eval/v1";

const DIMENSIONS: [&str; 4] = [
  "Code quality and readability",
  "Project structure",
  "Documentation",
  "Real-world relevance and practical usefulness",
];

pub struct PromptBuilder {
  persona: String,
  roadmap_max_steps: usize,
}

impl PromptBuilder {
  pub fn new(persona: impl Into<String>, roadmap_max_steps: usize) -> Self {
    Self {
      persona: persona.into(),
      roadmap_max_steps: roadmap_max_steps.max(1),
    }
  }

  pub fn build(&self, features: &FeatureRecord) -> EvaluationRequest {
    let mut out = String::with_capacity(2048);

    out.push_str(self.persona.trim());
    out.push_str("\n\n");

    out.push_str("Evaluate the repository on these dimensions:\n");
    for (i, dim) in DIMENSIONS.iter().enumerate() {
      out.push_str(&format!("{}. {}\n", i + 1, dim));
    }
    out.push('\n');

    out.push_str("Repository data:\n");
    out.push_str(&format!("- Name: {}\n", features.name));
    out.push_str(&format!("- Description: {}\n", features.description));
    out.push_str(&format!("- URL: {}\n", features.html_url));
    out.push_str(&format!("- Stars: {}\n", features.stars));
    out.push_str(&format!("- Forks: {}\n", features.forks));
    out.push_str(&format!("- Primary language: {}\n", features.language));
    out.push_str(&format!(
      "- Commits among the 50 most recent (activity sample, not lifetime total): {}\n",
      features.recent_commits
    ));
    out.push_str(&format!(
      "- README: {}\n",
      if features.has_readme { "present" } else { "not found" }
    ));
    let topics = if features.topics.is_empty() {
      "None".to_string()
    } else {
      features.topics.join(", ")
    };
    out.push_str(&format!("- Topics: {}\n\n", topics));

    out.push_str(&self.schema_section());

    EvaluationRequest::new(out, SCHEMA_VERSION)
  }

  fn schema_section(&self) -> String {
    let levels = Level::ALL.map(Level::as_str).join(", ");
    let medals = Medal::ALL.map(Medal::as_str).join(", ");
    let min_steps = 3.min(self.roadmap_max_steps);

    let mut s = String::new();
    s.push_str(&format!("Output schema ({}):\n", SCHEMA_VERSION));
    s.push_str("Respond with exactly one JSON object and nothing else. Fields:\n");
    s.push_str("- \"score\": integer from 0 to 100\n");
    s.push_str(&format!("- \"level\": one of {}\n", levels));
    s.push_str(&format!("- \"medal\": one of {}\n", medals));
    s.push_str("- \"summary\": string, 2-3 sentences of honest feedback on quality, structure and potential\n");
    s.push_str("- \"strengths\": array of short strings\n");
    s.push_str("- \"improvements\": array of short strings\n");
    s.push_str(&format!(
      "- \"roadmap\": array of {} to {} short, specific, actionable steps the student can follow \
       right away, focused on documentation, testing and Git practice\n",
      min_steps, self.roadmap_max_steps
    ));
    s.push_str(
      "Level and medal must follow the score: 0-39 Beginner/None, 40-69 Intermediate/Bronze, \
       70-89 Advanced/Silver, 90-100 Expert/Gold.\n",
    );
    s.push_str("Be critical but fair. Do not wrap the JSON in code fences.\n");
    s
  }
}

/// Machine-readable schema for the model's structured output mode.
pub fn response_schema() -> Value {
  let string_array = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
  json!({
    "type": "OBJECT",
    "properties": {
      "score": { "type": "INTEGER" },
      "level": { "type": "STRING", "enum": Level::ALL.map(Level::as_str) },
      "medal": { "type": "STRING", "enum": Medal::ALL.map(Medal::as_str) },
      "summary": { "type": "STRING" },
      "strengths": string_array,
      "improvements": string_array,
      "roadmap": string_array,
    },
    "required": ["score", "level", "medal", "summary", "roadmap"],
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DEFAULT_PERSONA;

  fn features() -> FeatureRecord {
    FeatureRecord {
      name: "hello".into(),
      description: "A tiny CLI".into(),
      html_url: "https://github.com/octo/hello".into(),
      stars: 120,
      forks: 5,
      language: "Go".into(),
      recent_commits: 50,
      has_readme: true,
      topics: vec!["cli".into(), "networking".into()],
    }
  }

  #[test]
  fn build_is_deterministic() {
    let builder = PromptBuilder::new(DEFAULT_PERSONA, 5);
    let a = builder.build(&features());
    let b = builder.build(&features());
    assert_eq!(a, b);
    assert_eq!(a.text(), b.text());
    assert_eq!(a.digest(), b.digest());
    assert_eq!(a.schema_version(), SCHEMA_VERSION);
  }

  #[test]
  fn request_embeds_persona_features_and_schema() {
    let req = PromptBuilder::new("You are a mentor.", 5).build(&features());
    let text = req.text();
    assert!(text.starts_with("You are a mentor."));
    assert!(text.contains("- Stars: 120"));
    assert!(text.contains("- Primary language: Go"));
    assert!(text.contains("not lifetime total): 50"));
    assert!(text.contains("- README: present"));
    assert!(text.contains("- Topics: cli, networking"));
    for dim in DIMENSIONS {
      assert!(text.contains(dim));
    }
    for field in ["\"score\"", "\"level\"", "\"medal\"", "\"summary\"", "\"roadmap\""] {
      assert!(text.contains(field), "missing {}", field);
    }
    assert!(text.contains("Beginner, Intermediate, Advanced, Expert"));
    assert!(text.contains("None, Bronze, Silver, Gold"));
    assert!(text.contains("3 to 5"));
  }

  #[test]
  fn different_features_give_different_requests() {
    let builder = PromptBuilder::new(DEFAULT_PERSONA, 5);
    let mut other = features();
    other.topics.clear();
    other.has_readme = false;
    let req = builder.build(&other);
    assert!(req.text().contains("- Topics: None"));
    assert!(req.text().contains("- README: not found"));
    assert_ne!(req.digest(), builder.build(&features()).digest());
  }

  #[test]
  fn schema_requires_core_fields() {
    let schema = response_schema();
    let required: Vec<&str> = schema["required"]
      .as_array()
      .unwrap()
      .iter()
      .map(|v| v.as_str().unwrap())
      .collect();
    assert_eq!(required, vec!["score", "level", "medal", "summary", "roadmap"]);
    assert_eq!(schema["properties"]["medal"]["enum"][0], "None");
  }
}
