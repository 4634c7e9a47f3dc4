//! Shared types for the OIF solver.
//!
//! Everything that crosses a crate boundary lives here: the canonical order
//! model produced by discovery and consumed by the dispatcher, the chain
//! vocabulary used by event sources and fill adapters, and the schema helpers
//! used to validate configuration tables.

pub mod chains;
pub mod order;
pub mod validation;

pub use chains::*;
pub use order::*;
pub use validation::*;
