//! Parse user input into a RepositoryReference.
//!
//! Accepts `owner/name` or a github.com URL (`https://github.com/owner/name`,
//! optional `.git`, trailing slash, or a deeper path such as `/tree/main`).

use crate::error::ReferenceError;
use crate::types::RepositoryReference;

const OWNER_MAX: usize = 39;
const NAME_MAX: usize = 100;

impl RepositoryReference {
  /// Build from already-split segments, validating both.
  pub fn new(owner: &str, name: &str) -> Result<Self, ReferenceError> {
    let name = name.strip_suffix(".git").unwrap_or(name);
    validate_owner(owner)?;
    validate_name(name)?;
    Ok(Self {
      owner: owner.to_string(),
      name: name.to_string(),
    })
  }

  pub fn parse(input: &str) -> Result<Self, ReferenceError> {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
      return Err(ReferenceError::Empty);
    }

    let (path, from_url) = match strip_host(trimmed) {
      Some(rest) => (rest, true),
      None => (trimmed, false),
    };

    let segments: Vec<&str> = path.split('/').collect();
    let shape_ok = if from_url {
      segments.len() >= 2
    } else {
      segments.len() == 2
    };
    if !shape_ok {
      return Err(ReferenceError::Shape(input.trim().to_string()));
    }

    Self::new(segments[0], segments[1])
  }
}

/// Strip scheme and `github.com/` host, if present.
fn strip_host(s: &str) -> Option<&str> {
  let no_scheme = s
    .strip_prefix("https://")
    .or_else(|| s.strip_prefix("http://"))
    .unwrap_or(s);
  let no_www = no_scheme.strip_prefix("www.").unwrap_or(no_scheme);
  no_www.strip_prefix("github.com/")
}

fn validate_owner(owner: &str) -> Result<(), ReferenceError> {
  let ok = !owner.is_empty()
    && owner.len() <= OWNER_MAX
    && !owner.starts_with('-')
    && !owner.ends_with('-')
    && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
  if ok {
    Ok(())
  } else {
    Err(ReferenceError::Segment {
      segment: "owner",
      value: owner.to_string(),
    })
  }
}

fn validate_name(name: &str) -> Result<(), ReferenceError> {
  let ok = !name.is_empty()
    && name.len() <= NAME_MAX
    && name != "."
    && name != ".."
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
  if ok {
    Ok(())
  } else {
    Err(ReferenceError::Segment {
      segment: "name",
      value: name.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_slug_and_urls() {
    for input in [
      "rust-lang/cargo",
      "https://github.com/rust-lang/cargo",
      "https://github.com/rust-lang/cargo/",
      "http://www.github.com/rust-lang/cargo.git",
      "github.com/rust-lang/cargo/tree/master/src",
      "  rust-lang/cargo  ",
    ] {
      let r = RepositoryReference::parse(input).unwrap();
      assert_eq!(r.owner(), "rust-lang", "input {:?}", input);
      assert_eq!(r.name(), "cargo", "input {:?}", input);
    }
  }

  #[test]
  fn rejects_bad_shapes() {
    assert_eq!(RepositoryReference::parse("  "), Err(ReferenceError::Empty));
    assert!(matches!(
      RepositoryReference::parse("just-a-name"),
      Err(ReferenceError::Shape(_))
    ));
    assert!(matches!(
      RepositoryReference::parse("a/b/c"),
      Err(ReferenceError::Shape(_))
    ));
    assert!(matches!(
      RepositoryReference::parse("https://github.com/only-owner"),
      Err(ReferenceError::Shape(_))
    ));
  }

  #[test]
  fn rejects_invalid_segments() {
    assert!(matches!(
      RepositoryReference::parse("-bad/repo"),
      Err(ReferenceError::Segment { segment: "owner", .. })
    ));
    assert!(matches!(
      RepositoryReference::parse("owner/re po"),
      Err(ReferenceError::Segment { segment: "name", .. })
    ));
    assert!(matches!(
      RepositoryReference::parse("owner/.."),
      Err(ReferenceError::Segment { segment: "name", .. })
    ));
    assert!(RepositoryReference::new(&"a".repeat(40), "x").is_err());
  }

  #[test]
  fn slug_round_trips_display() {
    let r = RepositoryReference::new("octo", "hello.world").unwrap();
    assert_eq!(r.slug(), "octo/hello.world");
    assert_eq!(r.to_string(), "octo/hello.world");
  }
}
