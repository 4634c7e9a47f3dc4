//! Configuration types for the solver.

use crate::serde_helpers::{deserialize_word, serialize_word};
use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use solver_types::{ChainFamily, ChainId};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Complete solver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverConfig {
	/// Solver identity and credentials
	pub solver: SolverSettings,
	/// Checkpoint storage
	#[serde(default)]
	pub storage: StorageConfig,
	/// Fill dispatch settings
	#[serde(default)]
	pub dispatch: DispatchConfig,
	/// Chains by configured name
	pub chains: BTreeMap<String, ChainConfig>,
}

impl SolverConfig {
	/// Chains that run an event listener.
	pub fn listened_chains(&self) -> impl Iterator<Item = (&str, &ChainConfig)> {
		self.chains
			.iter()
			.filter(|(_, chain)| chain.listen)
			.map(|(name, chain)| (name.as_str(), chain))
	}
}

/// Solver identity and credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverSettings {
	/// Solver name/identifier
	pub name: String,
	/// Hex-encoded EVM signing key. Required when any EVM chain is configured.
	#[serde(default)]
	pub private_key: Option<String>,
	/// Log filter directive, overridable via `SOLVER_LOG_LEVEL`
	#[serde(default)]
	pub log_level: Option<String>,
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
	#[default]
	File,
	Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	#[serde(default)]
	pub backend: StorageBackend,
	#[serde(default = "default_storage_path")]
	pub path: PathBuf,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			backend: StorageBackend::default(),
			path: default_storage_path(),
		}
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
	/// Upper bound on waiting for a fill receipt
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
}

impl DispatchConfig {
	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_secs)
	}
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			confirmation_timeout_secs: default_confirmation_timeout_secs(),
		}
	}
}

/// Chain-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Architecture family, selects codec and execution adapter
	pub family: ChainFamily,
	pub chain_id: ChainId,
	/// RPC endpoint URL
	pub rpc_url: String,
	/// Settlement contract: Open-event emitter and fill target
	#[serde(deserialize_with = "deserialize_word", serialize_with = "serialize_word")]
	pub settler_address: B256,
	/// Blocks behind head treated as safe from reorgs
	#[serde(default)]
	pub confirmation_blocks: u64,
	/// Maximum blocks per event query
	#[serde(default = "default_max_block_range")]
	pub max_block_range: u64,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// First block to scan when no checkpoint is stored
	#[serde(default)]
	pub start_block: Option<u64>,
	/// Whether to run a listener on this chain
	#[serde(default = "default_listen")]
	pub listen: bool,
	/// Account relayer used to submit Starknet fills
	#[serde(default)]
	pub relayer_url: Option<String>,
}

impl ChainConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

fn default_storage_path() -> PathBuf {
	PathBuf::from("./data/checkpoints")
}

fn default_confirmation_timeout_secs() -> u64 {
	600
}

fn default_max_block_range() -> u64 {
	500
}

fn default_poll_interval_ms() -> u64 {
	3000
}

fn default_listen() -> bool {
	true
}
