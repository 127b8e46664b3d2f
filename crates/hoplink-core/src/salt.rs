//! Salt sources for refresh.
//!
//! Every refresh attempt mixes a fresh salt into [`crate::param::generate`]
//! so that a new version never reuses the deterministic version-1 param. The
//! source is a trait so tests can script the salts a store will see.

use rand_core::{OsRng, RngCore};

/// Number of random bytes behind each [`OsSalt`] draw.
const SALT_BYTES: usize = 8;

/// Supplies salts for refresh attempts. Each call must return a fresh value.
pub trait SaltSource: Send + Sync {
  fn draw(&self) -> String;
}

/// Hex-encoded bytes from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsSalt;

impl SaltSource for OsSalt {
  fn draw(&self) -> String {
    let mut bytes = [0u8; SALT_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn os_salt_is_hex_of_expected_length() {
    let salt = OsSalt.draw();
    assert_eq!(salt.len(), SALT_BYTES * 2);
    assert!(salt.bytes().all(|b| b.is_ascii_hexdigit()));
  }

  #[test]
  fn os_salt_draws_differ() {
    assert_ne!(OsSalt.draw(), OsSalt.draw());
  }
}
