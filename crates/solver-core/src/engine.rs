// solver-core/src/engine.rs

use crate::dispatcher::{ConfigAdapterFactory, FillDispatcher};
use crate::error::CoreError;
use crate::lifecycle::LifecycleManager;
use solver_account::{create_account, AccountService};
use solver_config::{ChainConfig, SolverConfig, StorageBackend, StorageConfig};
use solver_discovery::{create_event_source, ChainListener, ListenerSettings};
use solver_storage::implementations::{file::FileStorage, memory::MemoryStorage};
use solver_storage::{CheckpointStore, StorageCheckpointStore, StorageService};
use solver_types::ChainFamily;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Builds the storage service selected in the configuration.
pub fn create_storage(config: &StorageConfig) -> StorageService {
	match config.backend {
		StorageBackend::File => {
			info!(path = %config.path.display(), "Using file storage");
			StorageService::new(Box::new(FileStorage::new(config.path.clone())))
		}
		StorageBackend::Memory => {
			info!("Using in-memory storage, checkpoints will not survive a restart");
			StorageService::new(Box::new(MemoryStorage::new()))
		}
	}
}

/// Clears the stored checkpoint of a configured chain so its listener
/// replays from `start_block` on the next run.
pub async fn reset_checkpoint(config: &SolverConfig, chain: &str) -> Result<(), CoreError> {
	if !config.chains.contains_key(chain) {
		return Err(CoreError::Configuration(format!(
			"unknown chain '{}'",
			chain
		)));
	}

	let checkpoints = StorageCheckpointStore::new(Arc::new(create_storage(&config.storage)));
	let previous = checkpoints.get(chain).await?;
	checkpoints.reset(chain).await?;
	info!(chain = %chain, ?previous, "Checkpoint cleared");
	Ok(())
}

fn listener_settings(name: &str, chain: &ChainConfig) -> ListenerSettings {
	ListenerSettings {
		chain: name.to_string(),
		family: chain.family,
		settler: chain.settler_address,
		confirmation_blocks: chain.confirmation_blocks,
		max_block_range: chain.max_block_range,
		poll_interval: chain.poll_interval(),
		start_block: chain.start_block,
	}
}

/// Owns every listener and the shared fill dispatcher.
pub struct SolverEngine {
	config: SolverConfig,
	checkpoints: Arc<dyn CheckpointStore>,
	dispatcher: Arc<FillDispatcher>,
	lifecycle: LifecycleManager,
}

impl SolverEngine {
	pub fn new(
		config: SolverConfig,
		checkpoints: Arc<dyn CheckpointStore>,
		dispatcher: Arc<FillDispatcher>,
	) -> Self {
		Self {
			config,
			checkpoints,
			dispatcher,
			lifecycle: LifecycleManager::new(),
		}
	}

	/// Wires storage, the signing account and the dispatcher from configuration.
	pub fn from_config(config: SolverConfig) -> Result<Self, CoreError> {
		let storage = Arc::new(create_storage(&config.storage));
		let checkpoints: Arc<dyn CheckpointStore> = Arc::new(StorageCheckpointStore::new(storage));

		let account = Self::account(&config)?;
		let factory = ConfigAdapterFactory::new(&config, account);
		let dispatcher = Arc::new(FillDispatcher::new(Box::new(factory)));

		Ok(Self::new(config, checkpoints, dispatcher))
	}

	fn account(config: &SolverConfig) -> Result<Option<AccountService>, CoreError> {
		let needs_account = config
			.chains
			.values()
			.any(|chain| chain.family == ChainFamily::Evm);

		match (&config.solver.private_key, needs_account) {
			(Some(key), _) => create_account(key)
				.map(Some)
				.map_err(|e| CoreError::ServiceInit(e.to_string())),
			(None, true) => Err(CoreError::Configuration(
				"solver.private_key is required for EVM chains".to_string(),
			)),
			(None, false) => Ok(None),
		}
	}

	pub fn lifecycle(&self) -> &LifecycleManager {
		&self.lifecycle
	}

	fn build_listeners(&self) -> Result<Vec<ChainListener>, CoreError> {
		self.config
			.listened_chains()
			.map(|(name, chain)| {
				let source = create_event_source(chain.family, &chain.rpc_url).map_err(|e| {
					CoreError::ServiceInit(format!("event source for '{}': {}", name, e))
				})?;
				Ok(ChainListener::new(
					listener_settings(name, chain),
					source,
					self.checkpoints.clone(),
					self.dispatcher.clone(),
				))
			})
			.collect()
	}

	/// Runs one listener per listened chain until [`Self::shutdown`] is called.
	pub async fn run(&self) -> Result<(), CoreError> {
		self.lifecycle.initialize().await?;

		let listeners = match self.build_listeners() {
			Ok(listeners) => listeners,
			Err(e) => {
				self.lifecycle.fail().await?;
				return Err(e);
			}
		};

		let mut tasks = JoinSet::new();
		for listener in listeners {
			info!(chain = %listener.chain(), "Starting chain listener");
			tasks.spawn(listener.run(self.lifecycle.subscribe_shutdown()));
		}

		self.lifecycle.start().await?;
		info!(
			solver = %self.config.solver.name,
			listeners = tasks.len(),
			"Solver running"
		);

		while let Some(result) = tasks.join_next().await {
			if let Err(e) = result {
				error!(error = %e, "Chain listener task panicked");
			}
		}

		self.lifecycle.stopped().await?;
		info!("Solver stopped");
		Ok(())
	}

	/// Signals every listener to stop; [`Self::run`] returns once they have.
	pub async fn shutdown(&self) -> Result<(), CoreError> {
		info!("Shutting down solver");
		self.lifecycle.shutdown().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lifecycle::LifecycleState;
	use solver_config::{DispatchConfig, SolverSettings};
	use std::collections::BTreeMap;
	use std::time::Duration;

	fn chain(family: ChainFamily, chain_id: u64, listen: bool) -> ChainConfig {
		ChainConfig {
			family,
			chain_id,
			// Nothing listens here; queries fail fast and are retried.
			rpc_url: "http://127.0.0.1:9".to_string(),
			settler_address: Default::default(),
			confirmation_blocks: 0,
			max_block_range: 100,
			poll_interval_ms: 50,
			start_block: Some(0),
			listen,
			relayer_url: None,
		}
	}

	fn config(chains: Vec<(&str, ChainConfig)>, private_key: Option<&str>) -> SolverConfig {
		SolverConfig {
			solver: SolverSettings {
				name: "test-solver".to_string(),
				private_key: private_key.map(str::to_string),
				log_level: None,
			},
			storage: StorageConfig {
				backend: StorageBackend::Memory,
				path: Default::default(),
			},
			dispatch: DispatchConfig::default(),
			chains: chains
				.into_iter()
				.map(|(name, chain)| (name.to_string(), chain))
				.collect::<BTreeMap<_, _>>(),
		}
	}

	const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_evm_chain_requires_private_key() {
		let result = SolverEngine::from_config(config(
			vec![("origin", chain(ChainFamily::Evm, 1, true))],
			None,
		));
		assert!(matches!(result, Err(CoreError::Configuration(_))));
	}

	#[test]
	fn test_starknet_only_needs_no_key() {
		let result = SolverEngine::from_config(config(
			vec![("origin", chain(ChainFamily::Starknet, 1, true))],
			None,
		));
		assert!(result.is_ok());
	}

	#[tokio::test]
	async fn test_listeners_only_for_listened_chains() {
		let engine = SolverEngine::from_config(config(
			vec![
				("origin", chain(ChainFamily::Evm, 1, true)),
				("destination", chain(ChainFamily::Evm, 2, false)),
			],
			Some(ANVIL_KEY),
		))
		.unwrap();

		let listeners = engine.build_listeners().unwrap();
		assert_eq!(listeners.len(), 1);
		assert_eq!(listeners[0].chain(), "origin");
	}

	#[tokio::test]
	async fn test_file_checkpoints_survive_restart() {
		let dir = tempfile::tempdir().unwrap();
		let storage_config = StorageConfig {
			backend: StorageBackend::File,
			path: dir.path().to_path_buf(),
		};

		let first = StorageCheckpointStore::new(Arc::new(create_storage(&storage_config)));
		assert!(first.set("origin", 120).await.unwrap());

		let second = StorageCheckpointStore::new(Arc::new(create_storage(&storage_config)));
		assert_eq!(second.get("origin").await.unwrap(), Some(120));
		assert_eq!(second.get("other").await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_reset_checkpoint_clears_only_that_chain() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = config(
			vec![
				("origin", chain(ChainFamily::Evm, 1, true)),
				("destination", chain(ChainFamily::Evm, 2, false)),
			],
			Some(ANVIL_KEY),
		);
		config.storage = StorageConfig {
			backend: StorageBackend::File,
			path: dir.path().to_path_buf(),
		};

		let store = StorageCheckpointStore::new(Arc::new(create_storage(&config.storage)));
		store.set("origin", 500).await.unwrap();
		store.set("destination", 70).await.unwrap();

		reset_checkpoint(&config, "origin").await.unwrap();
		assert_eq!(store.get("origin").await.unwrap(), None);
		assert_eq!(store.get("destination").await.unwrap(), Some(70));

		assert!(matches!(
			reset_checkpoint(&config, "unknown").await,
			Err(CoreError::Configuration(_))
		));
	}

	#[tokio::test]
	async fn test_run_stops_cleanly_when_listeners_end() {
		// No listened chain, so the task set drains without a shutdown request.
		let engine = SolverEngine::from_config(config(
			vec![("destination", chain(ChainFamily::Starknet, 2, false))],
			None,
		))
		.unwrap();

		engine.run().await.unwrap();
		assert_eq!(engine.lifecycle().state().await, LifecycleState::Stopped);
	}

	#[tokio::test]
	async fn test_run_returns_after_shutdown() {
		let engine = Arc::new(
			SolverEngine::from_config(config(
				vec![
					("origin", chain(ChainFamily::Evm, 1, true)),
					("stark", chain(ChainFamily::Starknet, 2, true)),
				],
				Some(ANVIL_KEY),
			))
			.unwrap(),
		);

		let runner = {
			let engine = engine.clone();
			tokio::spawn(async move { engine.run().await })
		};

		while engine.lifecycle().state().await != LifecycleState::Running {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
		engine.shutdown().await.unwrap();

		let result = tokio::time::timeout(Duration::from_secs(10), runner)
			.await
			.unwrap()
			.unwrap();
		assert!(result.is_ok());
		assert_eq!(engine.lifecycle().state().await, LifecycleState::Stopped);
	}
}
