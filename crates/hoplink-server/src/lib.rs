//! HTTP layer for hoplink.
//!
//! Exposes an axum [`Router`] with the redirect, reverse-lookup, refresh and
//! history endpoints, backed by any [`MappingStore`].
//!
//! | Method | Path | Auth | Notes |
//! |--------|------|------|-------|
//! | `GET`  | `/` | — | `?keyword&src&creative`; 302 to the destination |
//! | `GET`  | `/retrieve_original` | — | `?our_param`; most recent mapping if omitted |
//! | `POST` | `/refresh` | `x-api-key` | `?keyword&src&creative`; new version |
//! | `GET`  | `/history` | `x-api-key` | `?keyword&src&creative`; all versions |

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use hoplink_core::{policy::CollisionPolicy, store::MappingStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{history, redirect, refresh, retrieve};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `HOPLINK_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Base URL every redirect points at; `our_param` is appended to it.
  pub destination_url: String,
  /// Shared secret expected in `x-api-key` on protected routes.
  pub api_key:         String,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  #[serde(default)]
  pub collision:       CollisionPolicy,
}

fn default_host() -> String { "0.0.0.0".to_string() }

fn default_port() -> u16 { 3000 }

fn default_store_path() -> PathBuf { PathBuf::from("db/database.sqlite") }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: MappingStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MappingStore + Clone + 'static,
{
  Router::new()
    .route("/",                  get(redirect::handler::<S>))
    .route("/retrieve_original", get(retrieve::handler::<S>))
    .route("/refresh",           post(refresh::handler::<S>))
    .route("/history",           get(history::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
