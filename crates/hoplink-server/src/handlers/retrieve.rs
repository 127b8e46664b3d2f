//! `GET /retrieve_original` — reverse a param back to its triple.
//!
//! Without `our_param` the most recent mapping is returned together with a
//! warning, as a diagnostic aid.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
  response::{IntoResponse, Response},
};
use hoplink_core::{Param, Triple, store::MappingStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::Error};

pub const MOST_RECENT_WARNING: &str =
  "No our_param provided. Returning most recent mapping.";

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
  pub our_param: Option<String>,
}

/// Body of the no-param fallback.
#[derive(Debug, Serialize)]
pub struct MostRecent {
  pub warning:   &'static str,
  #[serde(flatten)]
  pub triple:    Triple,
  pub our_param: Param,
}

/// `GET /retrieve_original[?our_param=<param>]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  params: Result<Query<RetrieveParams>, QueryRejection>,
) -> Result<Response, Error>
where
  S: MappingStore + Clone + 'static,
{
  let Query(params) = params?;
  match params.our_param.filter(|p| !p.is_empty()) {
    Some(p) => {
      let triple = state
        .store
        .get_by_param(Param::new(p))
        .await
        .map_err(|e| Error::Store(Box::new(e)))?
        .ok_or_else(|| Error::NotFound("Mapping not found".to_string()))?;
      Ok(Json(triple).into_response())
    }
    None => {
      let mapping = state
        .store
        .get_most_recent()
        .await
        .map_err(|e| Error::Store(Box::new(e)))?
        .ok_or_else(|| Error::NotFound("No mappings found".to_string()))?;
      Ok(
        Json(MostRecent {
          warning:   MOST_RECENT_WARNING,
          triple:    mapping.triple,
          our_param: mapping.param,
        })
        .into_response(),
      )
    }
  }
}
