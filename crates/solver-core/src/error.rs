// solver-core/src/error.rs

use alloy::primitives::B256;
use solver_delivery::DeliveryError;
use solver_order::CodecError;
use solver_storage::StorageError;
use solver_types::{ChainId, OrderId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Service initialization error: {0}")]
	ServiceInit(String),

	#[error("Lifecycle error: {0}")]
	Lifecycle(String),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Why an order could not be filled. "Already filled" is not an error.
#[derive(Error, Debug)]
pub enum DispatchError {
	#[error("Order {0} has no fill instructions")]
	NoFillInstructions(OrderId),

	#[error("No fill adapter for chain {chain_id}: {source}")]
	Adapter {
		chain_id: ChainId,
		#[source]
		source: DeliveryError,
	},

	#[error("Order status check failed on chain {chain_id}: {source}")]
	StatusCheck {
		chain_id: ChainId,
		#[source]
		source: DeliveryError,
	},

	#[error("Origin data cannot be encoded for chain {chain_id}: {source}")]
	OriginData {
		chain_id: ChainId,
		#[source]
		source: CodecError,
	},

	#[error("Fill failed on chain {chain_id}: {source}")]
	Fill {
		chain_id: ChainId,
		#[source]
		source: DeliveryError,
	},

	#[error("Fill transaction {tx_hash} failed on chain {chain_id}")]
	Reverted { chain_id: ChainId, tx_hash: B256 },
}
