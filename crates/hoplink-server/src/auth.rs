//! Shared-secret API key extractor and standalone verifier.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use hoplink_core::store::MappingStore;
use sha2::{Digest, Sha256};

use crate::{AppState, error::Error};

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Zero-size marker: present in the handler means the request carried the
/// configured API key.
pub struct Authorized;

/// Check the `x-api-key` header against `expected`.
///
/// Both sides are hashed before comparison so the time taken does not depend
/// on how long a matching prefix the caller guessed. An empty configured key
/// authorises nobody.
pub fn verify_api_key(headers: &HeaderMap, expected: &str) -> Result<(), Error> {
  let provided = headers
    .get(API_KEY_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Forbidden)?;

  if expected.is_empty()
    || Sha256::digest(provided.as_bytes()) != Sha256::digest(expected.as_bytes())
  {
    return Err(Error::Forbidden);
  }

  Ok(())
}

impl<S> FromRequestParts<AppState<S>> for Authorized
where
  S: MappingStore + Clone + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_api_key(&parts.headers, &state.config.api_key)?;
    Ok(Authorized)
  }
}
