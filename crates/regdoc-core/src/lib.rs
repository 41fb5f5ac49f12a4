//! regdoc-core
//!
//! Domain types, capability traits, configuration, chunking and the ingestion
//! registry shared by the lexical, dense and hybrid crates.

pub mod chunker;
pub mod config;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
