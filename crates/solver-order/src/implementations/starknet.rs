//! Starknet Open event codec.
//!
//! Starknet settlers emit every value as a sequence of field elements. Keys
//! are `[selector, order_id.low, order_id.high]`; the data carries the full
//! resolved order with u256 values split into two u128 limbs, arrays
//! prefixed by their length, and byte arrays as `size, word_count, words..`.

use alloy::primitives::{b256, Address, Bytes, B256, U256};
use sha3::{Digest, Keccak256};
use solver_types::{ChainFamily, FillInstruction, OrderId, Output, RawEvent, ResolvedOrder};

use super::words::{pack_words, unpack_words};
use crate::{
	address_from_word, address_to_word, combine_u256, split_u256, u256_to_word, word_to_u256,
	CodecError, OpenEventCodec,
};

/// `sn_keccak("Open")`
pub const OPEN_EVENT_SELECTOR: B256 =
	b256!("035d8ba7f4bf26b6e2e2060e5bd28107042be35460fbd828c9d29a2d8af14445");

/// `sn_keccak("order_status")`
pub const ORDER_STATUS_SELECTOR: B256 =
	b256!("00ef8510f86107652674826b3b72796a3393c0fdddac10656e2427a236c0b2a5");

/// `sn_keccak("fill")`
pub const FILL_SELECTOR: B256 =
	b256!("01ef40116739e6b6ee1dfd7cf5cdc952178b68a6b973bb7e95de841d56365e71");

/// Starknet selector of a name: keccak-256 truncated to 250 bits.
pub fn sn_keccak(name: &str) -> B256 {
	let mut out = [0u8; 32];
	out.copy_from_slice(&Keccak256::digest(name.as_bytes()));
	out[0] &= 0x03;
	B256::from(out)
}

/// Converts an integer into a felt word.
pub fn felt_from_u128(value: u128) -> B256 {
	u256_to_word(U256::from(value))
}

/// Decoder and encoder for Starknet `Open` events.
pub struct StarknetOpenCodec;

impl OpenEventCodec for StarknetOpenCodec {
	fn family(&self) -> ChainFamily {
		ChainFamily::Starknet
	}

	fn selector(&self) -> B256 {
		OPEN_EVENT_SELECTOR
	}

	fn decode(&self, event: &RawEvent) -> Result<ResolvedOrder, CodecError> {
		match event.keys.first() {
			Some(key) if *key == OPEN_EVENT_SELECTOR => {}
			Some(key) => return Err(CodecError::Malformed(format!("unexpected selector {key}"))),
			None => return Err(CodecError::Malformed("event has no keys".to_string())),
		}

		let mut reader = FeltReader::new(&event.data);
		let user = reader.address()?;
		let origin_chain_id = u64::from(reader.u32("origin_chain_id")?);
		let open_deadline = reader.u64("open_deadline")?;
		let fill_deadline = reader.u64("fill_deadline")?;
		let order_id = OrderId(u256_to_word(reader.u256("order_id")?));
		let max_spent = reader.outputs()?;
		let min_received = reader.outputs()?;
		let fill_instructions = reader.fill_instructions()?;
		reader.finish()?;

		if event.keys.len() >= 3 {
			let mut keys = FeltReader::new(&event.keys[1..3]);
			let key_id = keys.u256("order_id").map(u256_to_word);
			if key_id.as_ref().ok() != Some(&order_id.0) {
				tracing::debug!(
					order_id = %order_id,
					key_id = ?key_id,
					"Open event key id differs from data id"
				);
			}
		}

		Ok(ResolvedOrder {
			user,
			origin_chain_id,
			open_deadline,
			fill_deadline,
			order_id,
			max_spent,
			min_received,
			fill_instructions,
		})
	}

	fn encode(&self, order: &ResolvedOrder) -> Result<RawEvent, CodecError> {
		let (id_low, id_high) = split_u256(word_to_u256(order.order_id.0));
		let keys = vec![
			OPEN_EVENT_SELECTOR,
			felt_from_u128(id_low),
			felt_from_u128(id_high),
		];

		let mut data = Vec::new();
		data.push(address_to_word(order.user));
		data.push(felt_u32(order.origin_chain_id, "origin_chain_id")?);
		data.push(felt_from_u128(u128::from(order.open_deadline)));
		data.push(felt_from_u128(u128::from(order.fill_deadline)));
		data.push(felt_from_u128(id_low));
		data.push(felt_from_u128(id_high));
		for outputs in [&order.max_spent, &order.min_received] {
			data.push(felt_len(outputs.len()));
			for output in outputs {
				let (low, high) = split_u256(output.amount);
				data.push(address_to_word(output.token));
				data.push(felt_from_u128(low));
				data.push(felt_from_u128(high));
				data.push(address_to_word(output.recipient));
				data.push(felt_u32(output.chain_id, "output.chain_id")?);
			}
		}
		data.push(felt_len(order.fill_instructions.len()));
		for instruction in &order.fill_instructions {
			data.push(felt_u32(
				instruction.destination_chain_id,
				"destination_chain_id",
			)?);
			data.push(instruction.destination_settler);
			let (size, words) = pack_words(&instruction.origin_data);
			data.push(felt_len(size));
			data.push(felt_len(words.len()));
			data.extend(words.into_iter().map(felt_from_u128));
		}

		Ok(RawEvent {
			block_number: None,
			keys,
			data,
		})
	}
}

fn felt_len(len: usize) -> B256 {
	felt_from_u128(len as u128)
}

fn felt_u32(value: u64, field: &'static str) -> Result<B256, CodecError> {
	let value = u32::try_from(value).map_err(|_| CodecError::OutOfRange(field))?;
	Ok(felt_from_u128(u128::from(value)))
}

/// Sequential reader over felt words with width checks.
struct FeltReader<'a> {
	felts: &'a [B256],
	pos: usize,
}

impl<'a> FeltReader<'a> {
	fn new(felts: &'a [B256]) -> Self {
		Self { felts, pos: 0 }
	}

	fn felt(&mut self) -> Result<B256, CodecError> {
		let felt = self
			.felts
			.get(self.pos)
			.copied()
			.ok_or(CodecError::ShortBuffer {
				needed: self.pos + 1,
				available: self.felts.len(),
			})?;
		self.pos += 1;
		Ok(felt)
	}

	fn uint(&mut self, bytes: usize, field: &'static str) -> Result<U256, CodecError> {
		let felt = self.felt()?;
		if felt[..32 - bytes].iter().any(|b| *b != 0) {
			return Err(CodecError::OutOfRange(field));
		}
		Ok(word_to_u256(felt))
	}

	fn u32(&mut self, field: &'static str) -> Result<u32, CodecError> {
		Ok(self.uint(4, field)?.to::<u32>())
	}

	fn u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
		Ok(self.uint(8, field)?.to::<u64>())
	}

	fn u128(&mut self, field: &'static str) -> Result<u128, CodecError> {
		Ok(self.uint(16, field)?.to::<u128>())
	}

	fn u256(&mut self, field: &'static str) -> Result<U256, CodecError> {
		let low = self.u128(field)?;
		let high = self.u128(field)?;
		Ok(combine_u256(low, high))
	}

	fn address(&mut self) -> Result<Address, CodecError> {
		self.felt().map(address_from_word)
	}

	/// Reads an array length, rejecting values that cannot fit in what is left.
	fn array_len(&mut self, field: &'static str) -> Result<usize, CodecError> {
		let len = usize::try_from(self.uint(8, field)?.to::<u64>())
			.map_err(|_| CodecError::OutOfRange(field))?;
		let remaining = self.felts.len() - self.pos;
		if len > remaining {
			return Err(CodecError::FieldCount {
				expected: len,
				actual: remaining,
			});
		}
		Ok(len)
	}

	fn outputs(&mut self) -> Result<Vec<Output>, CodecError> {
		let len = self.array_len("outputs")?;
		let mut outputs = Vec::with_capacity(len);
		for _ in 0..len {
			outputs.push(Output {
				token: self.address()?,
				amount: self.u256("output.amount")?,
				recipient: self.address()?,
				chain_id: u64::from(self.u32("output.chain_id")?),
			});
		}
		Ok(outputs)
	}

	fn fill_instructions(&mut self) -> Result<Vec<FillInstruction>, CodecError> {
		let len = self.array_len("fill_instructions")?;
		let mut instructions = Vec::with_capacity(len);
		for _ in 0..len {
			let destination_chain_id = u64::from(self.u32("destination_chain_id")?);
			let destination_settler = self.felt()?;
			let size = usize::try_from(self.uint(8, "origin_data.size")?.to::<u64>())
				.map_err(|_| CodecError::OutOfRange("origin_data.size"))?;
			let count = self.array_len("origin_data.words")?;
			let words = (0..count)
				.map(|_| self.u128("origin_data.word"))
				.collect::<Result<Vec<_>, _>>()?;
			let origin_data = unpack_words(size, &words)?;

			instructions.push(FillInstruction {
				destination_chain_id,
				destination_settler,
				origin_data: Bytes::from(origin_data),
			});
		}
		Ok(instructions)
	}

	fn finish(&self) -> Result<(), CodecError> {
		if self.pos != self.felts.len() {
			return Err(CodecError::FieldCount {
				expected: self.pos,
				actual: self.felts.len(),
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::OrderData;

	fn order() -> ResolvedOrder {
		let origin_data = OrderData {
			sender: B256::repeat_byte(0x01),
			amount_in: U256::from(100u64),
			origin_domain: 23448591,
			destination_domain: 11155111,
			fill_deadline: 1_900_000_000,
			..Default::default()
		}
		.abi_encode()
		.unwrap();

		ResolvedOrder {
			user: Address::repeat_byte(0xaa),
			origin_chain_id: 23448591,
			open_deadline: 1_800_000_000,
			fill_deadline: 1_900_000_000,
			order_id: OrderId(u256_to_word(
				(U256::from(3u8) << 128) + U256::from(9u8),
			)),
			max_spent: vec![Output {
				token: Address::repeat_byte(0x0b),
				amount: (U256::from(1u8) << 128) + U256::from(5u8),
				recipient: Address::repeat_byte(0x0c),
				chain_id: 11155111,
			}],
			min_received: vec![],
			fill_instructions: vec![FillInstruction {
				destination_chain_id: 11155111,
				destination_settler: B256::repeat_byte(0x0d),
				origin_data: Bytes::from(origin_data),
			}],
		}
	}

	#[test]
	fn test_selectors_match_names() {
		assert_eq!(sn_keccak("Open"), OPEN_EVENT_SELECTOR);
		assert_eq!(sn_keccak("order_status"), ORDER_STATUS_SELECTOR);
		assert_eq!(sn_keccak("fill"), FILL_SELECTOR);
	}

	#[test]
	fn test_event_roundtrip() {
		let codec = StarknetOpenCodec;
		let order = order();
		let event = codec.encode(&order).unwrap();

		assert_eq!(event.keys[0], OPEN_EVENT_SELECTOR);
		assert_eq!(event.keys[1], felt_from_u128(9));
		assert_eq!(event.keys[2], felt_from_u128(3));
		assert_eq!(codec.decode(&event).unwrap(), order);
	}

	#[test]
	fn test_empty_origin_data_roundtrip() {
		let codec = StarknetOpenCodec;
		let mut order = order();
		order.fill_instructions[0].origin_data = Bytes::new();

		let event = codec.encode(&order).unwrap();
		assert_eq!(codec.decode(&event).unwrap(), order);
	}

	#[test]
	fn test_origin_data_yields_abi_fields() {
		let codec = StarknetOpenCodec;
		let event = codec.encode(&order()).unwrap();
		let decoded = codec.decode(&event).unwrap();

		let data = OrderData::abi_decode(&decoded.fill_instructions[0].origin_data).unwrap();
		assert_eq!(data.sender, B256::repeat_byte(0x01));
		assert_eq!(data.destination_domain, 11155111);
	}

	#[test]
	fn test_truncated_event_is_short_buffer() {
		let codec = StarknetOpenCodec;
		let mut event = codec.encode(&order()).unwrap();
		event.data.truncate(5);

		assert!(matches!(
			codec.decode(&event),
			Err(CodecError::ShortBuffer { .. })
		));
	}

	#[test]
	fn test_trailing_felts_are_field_count_mismatch() {
		let codec = StarknetOpenCodec;
		let mut event = codec.encode(&order()).unwrap();
		event.data.push(B256::ZERO);

		assert!(matches!(
			codec.decode(&event),
			Err(CodecError::FieldCount { .. })
		));
	}

	#[test]
	fn test_oversized_array_length_rejected() {
		let codec = StarknetOpenCodec;
		let mut event = codec.encode(&order()).unwrap();
		// max_spent length sits right after the six header felts
		event.data[6] = felt_from_u128(1_000_000);

		assert!(matches!(
			codec.decode(&event),
			Err(CodecError::FieldCount { .. })
		));
	}

	#[test]
	fn test_wrong_selector_rejected() {
		let codec = StarknetOpenCodec;
		let mut event = codec.encode(&order()).unwrap();
		event.keys[0] = sn_keccak("Filled");

		assert!(matches!(
			codec.decode(&event),
			Err(CodecError::Malformed(_))
		));
	}

	#[test]
	fn test_oversized_chain_id_rejected() {
		let codec = StarknetOpenCodec;
		let mut order = order();
		order.origin_chain_id = u64::from(u32::MAX) + 1;

		assert_eq!(
			codec.encode(&order).unwrap_err(),
			CodecError::OutOfRange("origin_chain_id")
		);
	}
}
