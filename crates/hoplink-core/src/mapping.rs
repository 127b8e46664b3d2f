//! Mapping types — the triple a caller supplies, the param that stands in for
//! it, and the stored record that ties the two together.
//!
//! Records are immutable. Refreshing a triple appends a new record with the
//! next version number; earlier versions stay resolvable forever.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Triple ──────────────────────────────────────────────────────────────────

/// The caller-supplied identity of a mapping.
///
/// All three fields are opaque and compared byte-for-byte; no trimming or
/// case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
  pub keyword:  String,
  #[serde(rename = "src")]
  pub source:   String,
  pub creative: String,
}

impl Triple {
  pub fn new(
    keyword: impl Into<String>,
    source: impl Into<String>,
    creative: impl Into<String>,
  ) -> Self {
    Self {
      keyword:  keyword.into(),
      source:   source.into(),
      creative: creative.into(),
    }
  }
}

// ─── Param ───────────────────────────────────────────────────────────────────

/// The opaque identifier handed out in place of a triple.
///
/// Params minted by [`crate::param::generate`] are always
/// [`crate::param::PARAM_LEN`] base-62 characters, but any string read back
/// from storage or received from a caller is accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Param(String);

impl Param {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Param {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for Param {
  fn from(value: String) -> Self { Self(value) }
}

impl AsRef<str> for Param {
  fn as_ref(&self) -> &str { &self.0 }
}

// ─── Mapping ─────────────────────────────────────────────────────────────────

/// A persisted mapping record. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
  /// Store-assigned surrogate key; increases with insertion order.
  pub id:             i64,
  #[serde(flatten)]
  pub triple:         Triple,
  #[serde(rename = "our_param")]
  pub param:          Param,
  /// Starts at 1 for a triple and grows by exactly 1 per refresh.
  pub version:        u32,
  /// The param of the preceding version; `None` for version 1.
  pub previous_param: Option<Param>,
  pub created_at:     DateTime<Utc>,
}

// ─── Refreshed ───────────────────────────────────────────────────────────────

/// Result of [`crate::store::MappingStore::refresh`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refreshed {
  pub new_param:      Param,
  pub version:        u32,
  pub previous_param: Option<Param>,
}
