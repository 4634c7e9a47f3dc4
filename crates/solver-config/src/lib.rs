//! Configuration for the OIF solver.
//!
//! Configuration is read once at startup into an immutable [`SolverConfig`]
//! that is handed to each component at construction. Any missing or invalid
//! value is fatal.

use solver_types::ValidationError;
use thiserror::Error;

pub mod loader;
pub mod serde_helpers;
pub mod types;

pub use loader::{ChainConfigSchema, ConfigLoader};
pub use types::{
	ChainConfig, DispatchConfig, SolverConfig, SolverSettings, StorageBackend, StorageConfig,
};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("Schema error: {0}")]
	Schema(#[from] ValidationError),

	#[error("Validation error: {0}")]
	Validation(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}
