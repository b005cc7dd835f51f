//! Application layer - Use cases and orchestration
//!
//! Contains the aggregation and streaming services and the port definitions
//! they depend on. Infrastructure adapters implement the ports.

pub mod coalescer;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
mod testing;

pub use coalescer::RequestCoalescer;
pub use error::ApplicationError;
pub use ports::*;
pub use services::*;
