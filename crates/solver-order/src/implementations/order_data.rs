//! Canonical order data layouts.
//!
//! Two byte layouts describe the same fields. The packed layout is what an
//! origin settler on a word-packed chain commits to; the ABI layout is the
//! framing a destination settler decodes from `originData`.

use alloy::primitives::{b256, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolValue;
use solver_types::ChainFamily;

use crate::{u256_to_word, word_to_u256, CodecError};

/// Type tag for ABI-framed order data consumed by EVM settlers.
/// keccak256 of the `OrderData(..)` type string.
pub const EVM_ORDER_DATA_TYPE: B256 =
	b256!("08d75650babf4de09c9273d48ef647876057ed91d4323f8a2e3ebc2cd8a63b5e");

/// Type tag for packed order data consumed by Starknet settlers.
pub const STARKNET_ORDER_DATA_TYPE: B256 =
	b256!("03ed8862abbf6bbe28e01f529e75203031b5a7475e38592f6bdac6469409a7e8");

/// Size of the fixed part of the packed layout: seven 32-byte fields, two
/// 4-byte domains, the settler and an 8-byte deadline.
pub const PACKED_FIXED_LEN: usize = 7 * 32 + 4 + 4 + 32 + 8;

/// Size of an ABI-framed payload with an empty data tail.
pub const ABI_EMPTY_LEN: usize = 14 * 32;

/// Offset of the data tail, relative to the start of the struct encoding.
const ABI_DATA_OFFSET: u64 = 12 * 32;

sol! {
	struct OrderDataAbi {
		bytes32 sender;
		bytes32 recipient;
		bytes32 inputToken;
		bytes32 outputToken;
		uint256 amountIn;
		uint256 amountOut;
		uint256 senderNonce;
		uint32 originDomain;
		uint32 destinationDomain;
		bytes32 destinationSettler;
		uint32 fillDeadline;
		bytes data;
	}
}

/// Returns the type tag a settler of the given family expects alongside
/// canonical order data.
pub fn type_tag(family: ChainFamily) -> B256 {
	match family {
		ChainFamily::Evm => EVM_ORDER_DATA_TYPE,
		ChainFamily::Starknet => STARKNET_ORDER_DATA_TYPE,
	}
}

/// Canonical order data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderData {
	pub sender: B256,
	pub recipient: B256,
	pub input_token: B256,
	pub output_token: B256,
	pub amount_in: U256,
	pub amount_out: U256,
	pub sender_nonce: U256,
	pub origin_domain: u32,
	pub destination_domain: u32,
	pub destination_settler: B256,
	pub fill_deadline: u64,
	pub data: Bytes,
}

impl OrderData {
	/// Encodes the packed layout: fixed fields big-endian, then a 32-byte
	/// length word and the raw data bytes.
	pub fn encode_packed(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(PACKED_FIXED_LEN + 32 + self.data.len());
		out.extend_from_slice(self.sender.as_slice());
		out.extend_from_slice(self.recipient.as_slice());
		out.extend_from_slice(self.input_token.as_slice());
		out.extend_from_slice(self.output_token.as_slice());
		out.extend_from_slice(u256_to_word(self.amount_in).as_slice());
		out.extend_from_slice(u256_to_word(self.amount_out).as_slice());
		out.extend_from_slice(u256_to_word(self.sender_nonce).as_slice());
		out.extend_from_slice(&self.origin_domain.to_be_bytes());
		out.extend_from_slice(&self.destination_domain.to_be_bytes());
		out.extend_from_slice(self.destination_settler.as_slice());
		out.extend_from_slice(&self.fill_deadline.to_be_bytes());
		out.extend_from_slice(u256_to_word(U256::from(self.data.len())).as_slice());
		out.extend_from_slice(&self.data);
		out
	}

	/// Decodes the packed layout. A payload that ends right after the fixed
	/// fields is read as an empty data tail.
	pub fn decode_packed(bytes: &[u8]) -> Result<Self, CodecError> {
		let mut cursor = Cursor::new(bytes);
		let mut order = Self {
			sender: cursor.word()?,
			recipient: cursor.word()?,
			input_token: cursor.word()?,
			output_token: cursor.word()?,
			amount_in: word_to_u256(cursor.word()?),
			amount_out: word_to_u256(cursor.word()?),
			sender_nonce: word_to_u256(cursor.word()?),
			origin_domain: u32::from_be_bytes(cursor.array()?),
			destination_domain: u32::from_be_bytes(cursor.array()?),
			destination_settler: cursor.word()?,
			fill_deadline: u64::from_be_bytes(cursor.array()?),
			data: Bytes::new(),
		};

		if cursor.remaining() == 0 {
			return Ok(order);
		}

		let len = usize::try_from(word_to_u256(cursor.word()?))
			.map_err(|_| CodecError::OutOfRange("data length"))?;
		let data = cursor.take(len)?;
		if cursor.remaining() != 0 {
			return Err(CodecError::Malformed(format!(
				"{} trailing bytes after data tail",
				cursor.remaining()
			)));
		}
		order.data = Bytes::copy_from_slice(data);
		Ok(order)
	}

	/// Encodes the ABI framing: a `0x20` preamble, the fixed fields as 32-byte
	/// words, the data offset, the data length and the padded data.
	pub fn abi_encode(&self) -> Result<Vec<u8>, CodecError> {
		let fill_deadline = u32::try_from(self.fill_deadline)
			.map_err(|_| CodecError::OutOfRange("fill_deadline"))?;
		let abi = OrderDataAbi {
			sender: self.sender,
			recipient: self.recipient,
			inputToken: self.input_token,
			outputToken: self.output_token,
			amountIn: self.amount_in,
			amountOut: self.amount_out,
			senderNonce: self.sender_nonce,
			originDomain: self.origin_domain,
			destinationDomain: self.destination_domain,
			destinationSettler: self.destination_settler,
			fillDeadline: fill_deadline,
			data: self.data.clone(),
		};
		Ok(abi.abi_encode())
	}

	/// Decodes the ABI framing produced by [`OrderData::abi_encode`].
	pub fn abi_decode(bytes: &[u8]) -> Result<Self, CodecError> {
		if bytes.len() < ABI_EMPTY_LEN {
			return Err(CodecError::ShortBuffer {
				needed: ABI_EMPTY_LEN,
				available: bytes.len(),
			});
		}

		let preamble = word_to_u256(B256::from_slice(&bytes[..32]));
		if preamble != U256::from(0x20) {
			return Err(CodecError::Malformed(format!(
				"unexpected preamble {preamble:#x}"
			)));
		}
		let offset = word_to_u256(B256::from_slice(&bytes[12 * 32..13 * 32]));
		if offset != U256::from(ABI_DATA_OFFSET) {
			return Err(CodecError::Malformed(format!(
				"unexpected data offset {offset:#x}"
			)));
		}

		let abi = <OrderDataAbi as SolValue>::abi_decode(bytes)
			.map_err(|e| CodecError::Malformed(e.to_string()))?;

		Ok(Self {
			sender: abi.sender,
			recipient: abi.recipient,
			input_token: abi.inputToken,
			output_token: abi.outputToken,
			amount_in: abi.amountIn,
			amount_out: abi.amountOut,
			sender_nonce: abi.senderNonce,
			origin_domain: abi.originDomain,
			destination_domain: abi.destinationDomain,
			destination_settler: abi.destinationSettler,
			fill_deadline: u64::from(abi.fillDeadline),
			data: abi.data,
		})
	}
}

/// Layout an origin-data payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDataLayout {
	Abi,
	Packed,
}

impl OrderData {
	/// Decodes origin data in either layout. The ABI framing is tried first;
	/// its fixed preamble and data offset make a false match on packed bytes
	/// practically impossible.
	pub fn decode_origin_data(bytes: &[u8]) -> Result<(Self, OriginDataLayout), CodecError> {
		match Self::abi_decode(bytes) {
			Ok(order) => Ok((order, OriginDataLayout::Abi)),
			Err(abi_err) => Self::decode_packed(bytes)
				.map(|order| (order, OriginDataLayout::Packed))
				.map_err(|packed_err| {
					CodecError::Malformed(format!(
						"neither ABI ({abi_err}) nor packed ({packed_err}) order data"
					))
				}),
		}
	}

	/// Encodes in the layout settlers of `family` decode.
	pub fn encode_for(&self, family: ChainFamily) -> Result<Vec<u8>, CodecError> {
		match family {
			ChainFamily::Evm => self.abi_encode(),
			ChainFamily::Starknet => Ok(self.encode_packed()),
		}
	}
}

/// Bounds-checked forward reader over a byte slice.
struct Cursor<'a> {
	bytes: &'a [u8],
	pos: usize,
}

impl<'a> Cursor<'a> {
	fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	fn remaining(&self) -> usize {
		self.bytes.len() - self.pos
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
		if self.remaining() < len {
			return Err(CodecError::ShortBuffer {
				needed: self.pos + len,
				available: self.bytes.len(),
			});
		}
		let slice = &self.bytes[self.pos..self.pos + len];
		self.pos += len;
		Ok(slice)
	}

	fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.take(N)?);
		Ok(out)
	}

	fn word(&mut self) -> Result<B256, CodecError> {
		self.array::<32>().map(B256::from)
	}
}
