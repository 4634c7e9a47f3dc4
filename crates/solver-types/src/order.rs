//! Canonical cross-chain order model.
//!
//! These types are the chain-independent form of an opened order. Discovery
//! decodes chain-native Open events into a [`ResolvedOrder`]; the dispatcher
//! consumes it once and never persists it.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ChainFamily, ChainId};

/// Order status returned by a settlement contract for an order it has never seen.
pub const UNFILLED_STATUS: B256 = B256::ZERO;

/// Globally unique 32-byte order identifier, stored big-endian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub B256);

impl OrderId {
	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0 .0
	}
}

impl From<B256> for OrderId {
	fn from(value: B256) -> Self {
		Self(value)
	}
}

impl From<[u8; 32]> for OrderId {
	fn from(value: [u8; 32]) -> Self {
		Self(B256::from(value))
	}
}

impl fmt::Display for OrderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

/// A token amount on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
	pub token: Address,
	pub amount: U256,
	pub recipient: Address,
	pub chain_id: ChainId,
}

/// Instruction telling the solver where and how to fill part of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInstruction {
	pub destination_chain_id: ChainId,
	/// Settlement contract on the destination chain. Kept at full 32 bytes
	/// because non-EVM settlers do not fit in an EVM address.
	pub destination_settler: B256,
	/// Canonical ABI-framed order data handed to the destination settler.
	pub origin_data: Bytes,
}

/// Resolved cross-chain order as emitted by the origin settler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOrder {
	pub user: Address,
	pub origin_chain_id: ChainId,
	pub open_deadline: u64,
	pub fill_deadline: u64,
	pub order_id: OrderId,
	pub max_spent: Vec<Output>,
	pub min_received: Vec<Output>,
	pub fill_instructions: Vec<FillInstruction>,
}

/// An order together with where it was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredOrder {
	pub order: ResolvedOrder,
	/// Configured name of the origin chain.
	pub origin_chain: String,
	pub origin_family: ChainFamily,
	pub block_number: u64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_order_id_display_is_full_width_hex() {
		let mut bytes = [0u8; 32];
		bytes[31] = 0x2a;
		let id = OrderId::from(bytes);

		let rendered = id.to_string();
		assert_eq!(rendered.len(), 66);
		assert!(rendered.starts_with("0x00"));
		assert!(rendered.ends_with("2a"));
	}
}
