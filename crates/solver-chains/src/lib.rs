//! RPC clients for the chains the solver talks to.
//!
//! EVM chains are reached through alloy providers. Starknet has no client in
//! the alloy stack, so a small JSON-RPC client covers the handful of
//! `starknet_*` methods the listener and fill adapter need.

use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod starknet;
}

pub use implementations::evm::{read_provider, wallet_provider};
pub use implementations::starknet::{
	felt_from_hex, felt_to_hex, EmittedEvent, EventsChunk, StarknetRpc, TransactionReceipt,
};

/// Errors that can occur while talking to a chain node.
#[derive(Debug, Error)]
pub enum ChainError {
	/// The endpoint could not be reached or returned a non-JSON body.
	#[error("Transport error: {0}")]
	Transport(String),
	/// The node answered with a JSON-RPC error object.
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	/// The response did not have the expected shape.
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	/// An endpoint URL failed to parse.
	#[error("Invalid URL: {0}")]
	InvalidUrl(String),
}
