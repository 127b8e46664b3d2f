//! Core types and trait definitions for the hoplink redirect tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! parameter generation and the [`store::MappingStore`] abstraction that
//! storage backends implement.

// Native `async fn` in traits; implementors return `Send` futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod mapping;
pub mod param;
pub mod policy;
pub mod salt;
pub mod store;

pub use error::{Error, Result};
pub use mapping::{Mapping, Param, Refreshed, Triple};
