//! Domain layer for Lodestar
//!
//! Contains the core vocabulary shared by the aggregation and streaming
//! layers: cache keys, source links, chat messages and stream events.
//! This layer has no I/O and defines the ubiquitous language.

pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::*;
pub use errors::DomainError;
pub use value_objects::*;
