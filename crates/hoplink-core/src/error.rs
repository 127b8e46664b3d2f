//! Error types for `hoplink-core`.

use thiserror::Error;

use crate::mapping::Param;

#[derive(Debug, Error)]
pub enum Error {
  /// Every refresh candidate collided and the policy says to give up.
  #[error("no unique param found after {attempts} attempts")]
  CollisionExhausted { attempts: u32 },

  /// The param is already owned by another record.
  #[error("param {0} is already in use")]
  ParamCollision(Param),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
