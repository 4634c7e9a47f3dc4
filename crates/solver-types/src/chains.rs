//! Chain vocabulary shared by event sources and fill adapters.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric chain identifier.
pub type ChainId = u64;

/// Architecture family of a chain. Determines the event encoding, the
/// execution adapter, and whether order ids need their byte order flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
	Evm,
	Starknet,
}

impl fmt::Display for ChainFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Evm => write!(f, "evm"),
			Self::Starknet => write!(f, "starknet"),
		}
	}
}

/// A raw event log as returned by a chain provider.
///
/// Keys are the indexed part (EVM topics, Starknet keys) and data the
/// non-indexed part, both as 32-byte words. Starknet felts are zero-extended
/// into the word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
	pub block_number: Option<u64>,
	pub keys: Vec<B256>,
	pub data: Vec<B256>,
}

/// Coarse event query for one block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
	/// First block, inclusive.
	pub from_block: u64,
	/// Last block, inclusive.
	pub to_block: u64,
	/// Emitting contract, zero-extended to 32 bytes.
	pub address: B256,
	/// Expected first key of every matching event.
	pub selector: B256,
}

/// One page of events plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
	pub events: Vec<RawEvent>,
	/// `None` (or an empty token) when there are no further pages.
	pub continuation: Option<String>,
}

impl EventPage {
	/// Returns the cursor for the next page, treating empty tokens as the end.
	pub fn next_cursor(&self) -> Option<&str> {
		self.continuation.as_deref().filter(|c| !c.is_empty())
	}
}

/// Result of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillReceipt {
	pub tx_hash: B256,
	pub block_number: u64,
	pub success: bool,
}
