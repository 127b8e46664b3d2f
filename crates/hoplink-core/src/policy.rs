//! What a refresh does when its candidate params keep colliding.

use serde::{Deserialize, Serialize};

/// Attempt bound used when no policy is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Behaviour once every attempt has collided.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Exhaustion {
  /// Insert the last candidate anyway. The uniqueness constraint still
  /// rejects a true duplicate, which then fails the request.
  #[default]
  Proceed,
  /// Fail the refresh without writing anything.
  Fail,
}

/// Retry bound and exhaustion behaviour for refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionPolicy {
  pub max_attempts:  u32,
  pub on_exhaustion: Exhaustion,
}

impl Default for CollisionPolicy {
  fn default() -> Self {
    Self {
      max_attempts:  DEFAULT_MAX_ATTEMPTS,
      on_exhaustion: Exhaustion::default(),
    }
  }
}

impl CollisionPolicy {
  /// The number of candidates to try; a configured zero still tries once.
  pub fn attempts(&self) -> u32 { self.max_attempts.max(1) }
}
