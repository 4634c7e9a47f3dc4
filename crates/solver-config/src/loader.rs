//! Configuration loading from files and environment.

use crate::types::{ChainConfig, SolverConfig};
use crate::ConfigError;
use regex::Regex;
use solver_types::{http_url, ChainFamily, ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of the environment variables that override config values.
const ENV_PREFIX: &str = "SOLVER_";

/// Configuration loader with environment variable substitution.
///
/// `${VAR}` placeholders are replaced from the environment before parsing,
/// every `[chains.<name>]` table is checked against [`ChainConfigSchema`],
/// and cross-field rules run on the typed result.
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self { file_path: None }
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub async fn load(&self) -> Result<SolverConfig, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;
		info!("Loading configuration from {}", file_path.display());

		let content = match tokio::fs::read_to_string(file_path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(file_path.display().to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		self.parse(&content)
	}

	/// Parses and validates configuration text.
	pub fn parse(&self, content: &str) -> Result<SolverConfig, ConfigError> {
		let substituted = self.substitute_env_vars(content)?;

		let raw: toml::Value =
			toml::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))?;
		validate_chain_tables(&raw)?;

		let mut config: SolverConfig =
			toml::from_str(&substituted).map_err(|e| ConfigError::Parse(e.to_string()))?;

		self.apply_env_overrides(&mut config);
		validate_config(&config)?;

		Ok(config)
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Parse(e.to_string()))?;
		let mut result = content.to_string();

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut SolverConfig) {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", ENV_PREFIX)) {
			debug!("Overriding log level from environment");
			config.solver.log_level = Some(log_level);
		}
	}
}

/// Schema every `[chains.<name>]` table must satisfy.
pub struct ChainConfigSchema;

impl ConfigSchema for ChainConfigSchema {
	fn validate(&self, scope: &str, config: &toml::Value) -> Result<(), ValidationError> {
		let non_negative = || FieldType::Integer {
			min: Some(0),
			max: None,
		};
		let positive = || FieldType::Integer {
			min: Some(1),
			max: None,
		};

		let schema = Schema::new(
			vec![
				Field::new("family", FieldType::OneOf(&["evm", "starknet"])),
				Field::new("chain_id", positive()),
				Field::new("rpc_url", FieldType::String).with_validator(http_url),
				Field::new("settler_address", FieldType::Hex { max_bytes: 32 }),
			],
			vec![
				Field::new("confirmation_blocks", non_negative()),
				Field::new("max_block_range", positive()),
				Field::new("poll_interval_ms", positive()),
				Field::new("start_block", non_negative()),
				Field::new("listen", FieldType::Boolean),
				Field::new("relayer_url", FieldType::String).with_validator(http_url),
			],
		);

		schema.validate(scope, config)
	}
}

fn validate_chain_tables(raw: &toml::Value) -> Result<(), ConfigError> {
	let chains = raw
		.get("chains")
		.and_then(|c| c.as_table())
		.ok_or_else(|| ConfigError::Validation("At least one chain must be configured".into()))?;

	for (name, table) in chains {
		ChainConfigSchema.validate(&format!("chains.{}", name), table)?;
	}
	Ok(())
}

fn validate_config(config: &SolverConfig) -> Result<(), ConfigError> {
	if config.chains.is_empty() {
		return Err(ConfigError::Validation(
			"At least one chain must be configured".to_string(),
		));
	}

	let mut seen = HashSet::new();
	for (name, chain) in &config.chains {
		if !seen.insert(chain.chain_id) {
			return Err(ConfigError::Validation(format!(
				"Chain id {} of '{}' is configured more than once",
				chain.chain_id, name
			)));
		}
	}

	if config.listened_chains().next().is_none() {
		return Err(ConfigError::Validation(
			"At least one chain must have listen = true".to_string(),
		));
	}

	if config
		.chains
		.values()
		.any(|chain: &ChainConfig| chain.family == ChainFamily::Evm)
	{
		let key = config.solver.private_key.as_deref().ok_or_else(|| {
			ConfigError::Validation("solver.private_key is required for EVM chains".to_string())
		})?;
		validate_private_key(key)?;
	}

	Ok(())
}

fn validate_private_key(key: &str) -> Result<(), ConfigError> {
	let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);

	if key_without_prefix.len() != 64 {
		return Err(ConfigError::Validation(
			"Private key must be 64 hex characters (32 bytes)".to_string(),
		));
	}

	if hex::decode(key_without_prefix).is_err() {
		return Err(ConfigError::Validation(
			"Private key must be valid hexadecimal".to_string(),
		));
	}

	Ok(())
}
