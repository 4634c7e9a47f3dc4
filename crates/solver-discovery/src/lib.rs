//! Chain event listening for the OIF solver.
//!
//! One [`ChainListener`] runs per configured chain. It scans confirmed blocks
//! for the settler's Open events, decodes them with the chain family's codec
//! and hands each order to an [`OrderHandler`].

use async_trait::async_trait;
use solver_types::{ChainFamily, DiscoveredOrder, EventFilter, EventPage};
use thiserror::Error;

pub mod listener;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod starknet;
}

pub use listener::{ChainListener, ListenerSettings, RangeSummary};

#[derive(Debug, Error)]
pub enum DiscoveryError {
	/// The event source could not be constructed.
	#[error("Connection error: {0}")]
	Connection(String),
	/// A chain query failed. Retried on the next poll.
	#[error("Provider error: {0}")]
	Provider(String),
	/// The checkpoint store could not be read.
	#[error("Checkpoint error: {0}")]
	Checkpoint(String),
	/// The order handler rejected an order.
	#[error("Handler error: {0}")]
	Handler(String),
}

/// Read access to a chain's blocks and event logs.
#[async_trait]
pub trait EventSource: Send + Sync {
	/// Current chain head.
	async fn block_number(&self) -> Result<u64, DiscoveryError>;

	/// Fetches one page of events matching `filter`. `cursor` is the
	/// continuation returned by the previous page, `None` for the first.
	async fn events(
		&self,
		filter: &EventFilter,
		cursor: Option<String>,
	) -> Result<EventPage, DiscoveryError>;
}

/// Receives every order a listener decodes.
#[async_trait]
pub trait OrderHandler: Send + Sync {
	async fn handle(&self, order: DiscoveredOrder) -> Result<(), DiscoveryError>;
}

/// Creates the event source for a chain family.
pub fn create_event_source(
	family: ChainFamily,
	rpc_url: &str,
) -> Result<Box<dyn EventSource>, DiscoveryError> {
	match family {
		ChainFamily::Evm => Ok(Box::new(implementations::evm::EvmEventSource::new(rpc_url)?)),
		ChainFamily::Starknet => Ok(Box::new(
			implementations::starknet::StarknetEventSource::new(rpc_url),
		)),
	}
}
