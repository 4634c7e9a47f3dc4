//! Per-chain listener checkpoints.
//!
//! A checkpoint is the last block whose events were fully processed. Stored
//! values only ever move forward.

use crate::{StorageError, StorageService};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

const CHECKPOINT_NAMESPACE: &str = "checkpoint";

/// Durable last-processed-block store, keyed by chain name.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
	/// Returns the stored checkpoint for a chain, if any.
	async fn get(&self, chain: &str) -> Result<Option<u64>, StorageError>;

	/// Stores `height` for a chain if it is strictly greater than the stored
	/// value. Returns whether the value was written.
	async fn set(&self, chain: &str, height: u64) -> Result<bool, StorageError>;

	/// Forgets the checkpoint for a chain so its listener starts again from
	/// the configured start block.
	async fn reset(&self, chain: &str) -> Result<(), StorageError>;
}

/// Checkpoint store on top of a [`StorageService`].
pub struct StorageCheckpointStore {
	storage: Arc<StorageService>,
	/// Serialises the read-compare-write in `set`.
	write_lock: Mutex<()>,
}

impl StorageCheckpointStore {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			write_lock: Mutex::new(()),
		}
	}
}

#[async_trait]
impl CheckpointStore for StorageCheckpointStore {
	async fn get(&self, chain: &str) -> Result<Option<u64>, StorageError> {
		self.storage
			.retrieve_optional(CHECKPOINT_NAMESPACE, chain)
			.await
	}

	async fn set(&self, chain: &str, height: u64) -> Result<bool, StorageError> {
		let _guard = self.write_lock.lock().await;

		if let Some(current) = self.get(chain).await? {
			if height <= current {
				tracing::debug!(
					chain = %chain,
					current,
					rejected = height,
					"Ignoring non-increasing checkpoint"
				);
				return Ok(false);
			}
		}

		self.storage
			.store(CHECKPOINT_NAMESPACE, chain, &height)
			.await?;
		Ok(true)
	}

	async fn reset(&self, chain: &str) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		self.storage.remove(CHECKPOINT_NAMESPACE, chain).await
	}
}
