//! The `MappingStore` trait.
//!
//! Implemented by storage backends (e.g. `hoplink-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::mapping::{Mapping, Param, Refreshed, Triple};

/// Abstraction over a mapping store backend.
///
/// The mapping table is append-only: refreshing a triple inserts a new
/// version, it never rewrites an old one. Params are unique across every
/// record of every triple.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MappingStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the latest param for `triple`, minting version 1 with
  /// [`crate::param::generate`] and an empty salt if the triple is new.
  ///
  /// Idempotent: repeated calls for the same triple return the same param
  /// and insert at most one record between them.
  fn get_or_create(
    &self,
    triple: Triple,
  ) -> impl Future<Output = Result<Param, Self::Error>> + Send + '_;

  /// Mint a new version of `triple` under a freshly salted param.
  ///
  /// Always inserts exactly one record. The new version links back to the
  /// previous head through `previous_param`.
  fn refresh(
    &self,
    triple: Triple,
  ) -> impl Future<Output = Result<Refreshed, Self::Error>> + Send + '_;

  /// Resolve a param (of any version) back to its triple.
  fn get_by_param(
    &self,
    param: Param,
  ) -> impl Future<Output = Result<Option<Triple>, Self::Error>> + Send + '_;

  /// The most recently created record, or `None` if the store is empty.
  fn get_most_recent(
    &self,
  ) -> impl Future<Output = Result<Option<Mapping>, Self::Error>> + Send + '_;

  /// Every version recorded for `triple`, oldest first.
  fn history(
    &self,
    triple: Triple,
  ) -> impl Future<Output = Result<Vec<Mapping>, Self::Error>> + Send + '_;
}
