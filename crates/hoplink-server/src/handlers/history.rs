//! `GET /history` — every recorded version of a triple.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use hoplink_core::{Mapping, store::MappingStore};

use crate::{
  AppState, auth::Authorized, error::Error, handlers::TripleParams,
};

/// `GET /history?keyword=..&src=..&creative=..` with `x-api-key`; oldest
/// version first, empty for an unknown triple.
pub async fn handler<S>(
  _auth: Authorized,
  State(state): State<AppState<S>>,
  params: Result<Query<TripleParams>, QueryRejection>,
) -> Result<Json<Vec<Mapping>>, Error>
where
  S: MappingStore + Clone + 'static,
{
  let Query(params) = params?;
  let triple = params.into_triple()?;

  let history = state
    .store
    .history(triple)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  Ok(Json(history))
}
