//! Order codec for the OIF solver system.
//!
//! Translates between chain-native order encodings and the canonical layout
//! destination settlement contracts expect. Everything in this crate is pure:
//! no I/O, no clocks, no shared state.
//!
//! ## Encoding rules
//!
//! - 256-bit values wider than the origin chain's native word travel as two
//!   128-bit limbs, combined as `low + (high << 128)`.
//! - Fixed-width identifiers map to 160-bit accounts by taking the low 20
//!   bytes; the inverse zero-extends.
//! - Order ids cross an architecture-family boundary byte-reversed, exactly
//!   once per hop.

use alloy::primitives::{Address, B256, U256};
use solver_types::{ChainFamily, OrderId, RawEvent, ResolvedOrder};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod order_data;
	pub mod starknet;
	pub mod words;
}

pub use implementations::order_data::{
	type_tag, OrderData, OriginDataLayout, EVM_ORDER_DATA_TYPE,
	STARKNET_ORDER_DATA_TYPE,
};

/// Errors that can occur while decoding or encoding an order payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
	/// The payload ended before a field could be read.
	#[error("Buffer too short: need {needed}, have {available}")]
	ShortBuffer { needed: usize, available: usize },
	/// A length header disagrees with the number of items present.
	#[error("Field count mismatch: expected {expected}, got {actual}")]
	FieldCount { expected: usize, actual: usize },
	/// A value does not fit the width of its target field.
	#[error("Value out of range for {0}")]
	OutOfRange(&'static str),
	/// The payload is structurally invalid.
	#[error("Malformed payload: {0}")]
	Malformed(String),
}

/// Codec for one chain family's Open event.
///
/// `decode` is applied to every log the listener receives; `encode` produces
/// the exact log a settler of that family would emit for the order.
pub trait OpenEventCodec: Send + Sync {
	/// The chain family this codec understands.
	fn family(&self) -> ChainFamily;

	/// First key every Open event of this family carries.
	fn selector(&self) -> B256;

	/// Decodes a raw Open event into the canonical order.
	fn decode(&self, event: &RawEvent) -> Result<ResolvedOrder, CodecError>;

	/// Encodes a canonical order as this family's Open event.
	fn encode(&self, order: &ResolvedOrder) -> Result<RawEvent, CodecError>;
}

/// Returns the Open event codec for a chain family.
pub fn codec_for(family: ChainFamily) -> Box<dyn OpenEventCodec> {
	match family {
		ChainFamily::Evm => Box::new(implementations::evm::EvmOpenCodec),
		ChainFamily::Starknet => Box::new(implementations::starknet::StarknetOpenCodec),
	}
}

/// Splits a 256-bit value into `(low, high)` 128-bit limbs.
pub fn split_u256(value: U256) -> (u128, u128) {
	let low = value.wrapping_to::<u128>();
	let high = (value >> 128usize).wrapping_to::<u128>();
	(low, high)
}

/// Combines two 128-bit limbs as `low + (high << 128)`.
pub fn combine_u256(low: u128, high: u128) -> U256 {
	U256::from(low) + (U256::from(high) << 128)
}

/// Reverses all 32 bytes of an order id. Its own inverse.
pub fn reverse_order_id(id: OrderId) -> OrderId {
	let mut bytes = *id.as_bytes();
	bytes.reverse();
	OrderId::from(bytes)
}

/// Returns the order id as the destination chain must see it.
pub fn order_id_for_destination(
	id: OrderId,
	origin: ChainFamily,
	destination: ChainFamily,
) -> OrderId {
	if origin == destination {
		id
	} else {
		reverse_order_id(id)
	}
}

/// Maps a 32-byte identifier to a 160-bit account by taking its low 20 bytes.
///
/// Lossy for identifiers wider than 160 bits: a Starknet contract address
/// usually has non-zero high bytes, which are dropped, so
/// `address_to_word(address_from_word(felt))` does not give `felt` back.
/// Settlers therefore keep the full word (see `FillInstruction::destination_settler`).
pub fn address_from_word(word: B256) -> Address {
	Address::from_slice(&word[12..])
}

/// Zero-extends a 160-bit account into the low bytes of a 32-byte word.
pub fn address_to_word(address: Address) -> B256 {
	address.into_word()
}

pub(crate) fn word_to_u256(word: B256) -> U256 {
	U256::from_be_bytes(word.0)
}

pub(crate) fn u256_to_word(value: U256) -> B256 {
	B256::from(value.to_be_bytes::<32>())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_split_combine_crosses_limb_boundary() {
		let value = (U256::from(1u8) << 128) + U256::from(5u8);
		let (low, high) = split_u256(value);

		assert_eq!(low, 5);
		assert_eq!(high, 1);
		assert_eq!(combine_u256(low, high), value);
	}

	#[test]
	fn test_split_combine_extremes() {
		for value in [U256::ZERO, U256::MAX, U256::from(u128::MAX)] {
			let (low, high) = split_u256(value);
			assert_eq!(combine_u256(low, high), value);
		}
	}

	#[test]
	fn test_reverse_order_id_is_involutive() {
		let mut bytes = [0u8; 32];
		for (i, b) in bytes.iter_mut().enumerate() {
			*b = i as u8;
		}
		let id = OrderId::from(bytes);
		let reversed = reverse_order_id(id);

		assert_eq!(reversed.as_bytes()[0], 31);
		assert_eq!(reversed.as_bytes()[31], 0);
		assert_eq!(reverse_order_id(reversed), id);
	}

	#[test]
	fn test_reverse_keeps_leading_zero_bytes() {
		let mut bytes = [0u8; 32];
		bytes[31] = 0xab;
		let reversed = reverse_order_id(OrderId::from(bytes));

		assert_eq!(reversed.as_bytes()[0], 0xab);
		assert!(reversed.as_bytes()[1..].iter().all(|b| *b == 0));
	}

	#[test]
	fn test_destination_id_only_reversed_across_families() {
		let mut bytes = [7u8; 32];
		bytes[0] = 0xff;
		let id = OrderId::from(bytes);

		assert_eq!(
			order_id_for_destination(id, ChainFamily::Evm, ChainFamily::Evm),
			id
		);
		assert_eq!(
			order_id_for_destination(id, ChainFamily::Starknet, ChainFamily::Evm),
			reverse_order_id(id)
		);
	}

	#[test]
	fn test_address_word_mapping() {
		let address = Address::repeat_byte(0x42);
		let word = address_to_word(address);

		assert!(word[..12].iter().all(|b| *b == 0));
		assert_eq!(address_from_word(word), address);
	}

	#[test]
	fn test_wide_identifier_loses_high_bytes() {
		let mut felt = B256::repeat_byte(0x07);
		felt.0[0] = 0x00;

		let address = address_from_word(felt);
		assert_eq!(address, Address::repeat_byte(0x07));
		assert_ne!(address_to_word(address), felt);
	}
}
