#![doc = "keepa-core: core logic library for keepa."]

//! This crate contains the upload pipeline and the retention engine. Concrete storage
//! clients, configuration files and the CLI live in the `keepa` crate.
//!
//! # Usage
//! Implement [`contract::ObjectStore`] for a backend, then call
//! [`synchronise::synchronise`] with the configured entries.

pub mod collect;
pub mod config;
pub mod contract;
pub mod error;
pub mod naming;
pub mod retention;
pub mod synchronise;
pub mod upload;

pub use config::Entry;
pub use contract::{ObjectStore, ObjectSummary, StoreError};
pub use error::{CollectError, RetentionError};
