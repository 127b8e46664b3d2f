pub mod history;
pub mod redirect;
pub mod refresh;
pub mod retrieve;

use hoplink_core::Triple;
use serde::Deserialize;

use crate::error::Error;

pub(super) const MISSING_TRIPLE: &str = "Missing keyword, src, or creative";

/// Query string shared by every endpoint that takes a triple.
#[derive(Debug, Default, Deserialize)]
pub struct TripleParams {
  pub keyword:  Option<String>,
  pub src:      Option<String>,
  pub creative: Option<String>,
}

impl TripleParams {
  /// All three fields are required; an empty value counts as missing.
  pub fn into_triple(self) -> Result<Triple, Error> {
    let present = |v: Option<String>| v.filter(|s| !s.is_empty());
    match (present(self.keyword), present(self.src), present(self.creative)) {
      (Some(keyword), Some(src), Some(creative)) => {
        Ok(Triple::new(keyword, src, creative))
      }
      _ => Err(Error::BadRequest(MISSING_TRIPLE.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(k: Option<&str>, s: Option<&str>, c: Option<&str>) -> TripleParams {
    TripleParams {
      keyword:  k.map(str::to_owned),
      src:      s.map(str::to_owned),
      creative: c.map(str::to_owned),
    }
  }

  #[test]
  fn complete_params_make_a_triple() {
    let t = params(Some("shoes"), Some("google"), Some("ad1"))
      .into_triple()
      .unwrap();
    assert_eq!(t, Triple::new("shoes", "google", "ad1"));
  }

  #[test]
  fn missing_or_empty_fields_are_rejected() {
    for p in [
      params(None, Some("google"), Some("ad1")),
      params(Some("shoes"), None, Some("ad1")),
      params(Some("shoes"), Some("google"), None),
      params(Some(""), Some("google"), Some("ad1")),
    ] {
      assert!(matches!(p.into_triple(), Err(Error::BadRequest(_))));
    }
  }
}
