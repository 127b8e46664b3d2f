//! `POST /refresh` — mint a new param version for a triple.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use hoplink_core::{Refreshed, store::MappingStore};

use crate::{
  AppState, auth::Authorized, error::Error, handlers::TripleParams,
};

/// `POST /refresh?keyword=..&src=..&creative=..` with `x-api-key`.
///
/// The key is checked before the query, so an unauthorised caller learns
/// nothing about which fields were missing.
pub async fn handler<S>(
  _auth: Authorized,
  State(state): State<AppState<S>>,
  params: Result<Query<TripleParams>, QueryRejection>,
) -> Result<Json<Refreshed>, Error>
where
  S: MappingStore + Clone + 'static,
{
  let Query(params) = params?;
  let triple = params.into_triple()?;

  let refreshed = state
    .store
    .refresh(triple)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  tracing::info!(
    param = %refreshed.new_param,
    version = refreshed.version,
    "mapping refreshed",
  );
  Ok(Json(refreshed))
}
