//! `GET /` — resolve a triple to its param and redirect to the destination.

use axum::{
  extract::{Query, State, rejection::QueryRejection},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use hoplink_core::{Param, store::MappingStore};

use crate::{AppState, error::Error, handlers::TripleParams};

/// `GET /?keyword=..&src=..&creative=..` → 302 to `<destination>?our_param=..`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<TripleParams>, QueryRejection>,
) -> Result<Response, Error>
where
  S: MappingStore + Clone + 'static,
{
  let Query(params) = params?;
  let triple = params.into_triple()?;

  let param = state
    .store
    .get_or_create(triple)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  let location = destination_with_param(&state.config.destination_url, &param);
  Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// Append `our_param` to `destination`, respecting any query it already has.
pub fn destination_with_param(destination: &str, param: &Param) -> String {
  let sep = match destination.find('?') {
    None => "?",
    Some(_) if destination.ends_with(['?', '&']) => "",
    Some(_) => "&",
  };
  format!("{destination}{sep}our_param={param}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn appends_query() {
    let p = Param::new("abc");
    assert_eq!(
      destination_with_param("https://shop.example/landing", &p),
      "https://shop.example/landing?our_param=abc"
    );
    assert_eq!(
      destination_with_param("https://shop.example/?ref=7", &p),
      "https://shop.example/?ref=7&our_param=abc"
    );
    assert_eq!(
      destination_with_param("https://shop.example/?", &p),
      "https://shop.example/?our_param=abc"
    );
  }
}
