//! Deterministic param derivation.
//!
//! A param is the SHA-256 digest of `source:creative:keyword:salt`, read as a
//! 256-bit big-endian integer and written as its [`PARAM_LEN`]
//! least-significant base-62 digits. The result is always exactly
//! [`PARAM_LEN`] characters: small digests are zero-padded rather than
//! coming out short.

use sha2::{Digest, Sha256};

use crate::mapping::{Param, Triple};

/// Length of every generated param.
pub const PARAM_LEN: usize = 16;

/// Digits, then lowercase, then uppercase.
pub const ALPHABET: &[u8; 62] =
  b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Derive the param for `triple` mixed with `salt`.
///
/// Pure: the same inputs always give the same param. Version 1 of a triple
/// uses an empty salt.
pub fn generate(triple: &Triple, salt: &str) -> Param {
  let digest = Sha256::digest(canonical(triple, salt).as_bytes());
  let mut value = [0u8; 32];
  value.copy_from_slice(&digest);
  Param::new(encode_base62(value))
}

fn canonical(triple: &Triple, salt: &str) -> String {
  format!(
    "{}:{}:{}:{salt}",
    triple.source, triple.creative, triple.keyword
  )
}

/// Write the low [`PARAM_LEN`] base-62 digits of `value`, most significant
/// first.
fn encode_base62(mut value: [u8; 32]) -> String {
  let mut digits = [ALPHABET[0]; PARAM_LEN];
  for slot in digits.iter_mut().rev() {
    *slot = ALPHABET[usize::from(divmod62(&mut value))];
  }
  digits.iter().map(|&b| char::from(b)).collect()
}

/// Divide the big-endian integer in `value` by 62 in place and return the
/// remainder.
fn divmod62(value: &mut [u8; 32]) -> u8 {
  let mut rem: u32 = 0;
  for byte in value.iter_mut() {
    let acc = (rem << 8) | u32::from(*byte);
    // acc < 62 * 256, so the quotient always fits in a byte.
    *byte = (acc / 62) as u8;
    rem = acc % 62;
  }
  rem as u8
}
