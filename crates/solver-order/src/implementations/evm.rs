//! EVM Open event codec.
//!
//! Decodes the ERC-7683 `Open(bytes32 indexed orderId, ResolvedCrossChainOrder)`
//! log emitted by EVM origin settlers.

use alloy::primitives::{B256, U256};
use alloy::sol_types::SolEvent;
use solver_types::{ChainFamily, FillInstruction, OrderId, Output, RawEvent, ResolvedOrder};

use crate::{address_from_word, address_to_word, CodecError, OpenEventCodec};

mod abi {
	alloy::sol! {
		struct Output {
			bytes32 token;
			uint256 amount;
			bytes32 recipient;
			uint256 chainId;
		}

		struct FillInstruction {
			uint256 destinationChainId;
			bytes32 destinationSettler;
			bytes originData;
		}

		struct ResolvedCrossChainOrder {
			address user;
			uint256 originChainId;
			uint32 openDeadline;
			uint32 fillDeadline;
			bytes32 orderId;
			Output[] maxSpent;
			Output[] minReceived;
			FillInstruction[] fillInstructions;
		}

		event Open(bytes32 indexed orderId, ResolvedCrossChainOrder resolvedOrder);
	}
}

/// Decoder and encoder for EVM `Open` logs.
pub struct EvmOpenCodec;

impl OpenEventCodec for EvmOpenCodec {
	fn family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	fn selector(&self) -> B256 {
		abi::Open::SIGNATURE_HASH
	}

	fn decode(&self, event: &RawEvent) -> Result<ResolvedOrder, CodecError> {
		match event.keys.first() {
			Some(key) if *key == abi::Open::SIGNATURE_HASH => {}
			Some(key) => return Err(CodecError::Malformed(format!("unexpected topic {key}"))),
			None => return Err(CodecError::Malformed("log has no topics".to_string())),
		}

		let data: Vec<u8> = event.data.iter().flat_map(|word| word.0).collect();
		let open = abi::Open::decode_raw_log(event.keys.iter().copied(), &data)
			.map_err(|e| CodecError::Malformed(e.to_string()))?;
		let resolved = open.resolvedOrder;

		if open.orderId != resolved.orderId {
			tracing::debug!(
				order_id = %resolved.orderId,
				topic_id = %open.orderId,
				"Open log topic id differs from payload id"
			);
		}

		Ok(ResolvedOrder {
			user: resolved.user,
			origin_chain_id: chain_id(resolved.originChainId, "origin_chain_id")?,
			open_deadline: u64::from(resolved.openDeadline),
			fill_deadline: u64::from(resolved.fillDeadline),
			order_id: OrderId(resolved.orderId),
			max_spent: outputs_from_abi(resolved.maxSpent)?,
			min_received: outputs_from_abi(resolved.minReceived)?,
			fill_instructions: resolved
				.fillInstructions
				.into_iter()
				.map(|fi| {
					Ok(FillInstruction {
						destination_chain_id: chain_id(fi.destinationChainId, "destination_chain_id")?,
						destination_settler: fi.destinationSettler,
						origin_data: fi.originData,
					})
				})
				.collect::<Result<Vec<_>, CodecError>>()?,
		})
	}

	fn encode(&self, order: &ResolvedOrder) -> Result<RawEvent, CodecError> {
		let open = abi::Open {
			orderId: order.order_id.0,
			resolvedOrder: abi::ResolvedCrossChainOrder {
				user: order.user,
				originChainId: U256::from(order.origin_chain_id),
				openDeadline: deadline(order.open_deadline, "open_deadline")?,
				fillDeadline: deadline(order.fill_deadline, "fill_deadline")?,
				orderId: order.order_id.0,
				maxSpent: outputs_to_abi(&order.max_spent),
				minReceived: outputs_to_abi(&order.min_received),
				fillInstructions: order
					.fill_instructions
					.iter()
					.map(|fi| abi::FillInstruction {
						destinationChainId: U256::from(fi.destination_chain_id),
						destinationSettler: fi.destination_settler,
						originData: fi.origin_data.clone(),
					})
					.collect(),
			},
		};

		let data = open.encode_data();
		Ok(RawEvent {
			block_number: None,
			keys: vec![abi::Open::SIGNATURE_HASH, order.order_id.0],
			data: data.chunks(32).map(B256::from_slice).collect(),
		})
	}
}

fn deadline(value: u64, field: &'static str) -> Result<u32, CodecError> {
	u32::try_from(value).map_err(|_| CodecError::OutOfRange(field))
}

fn chain_id(value: U256, field: &'static str) -> Result<u64, CodecError> {
	u64::try_from(value).map_err(|_| CodecError::OutOfRange(field))
}

fn outputs_from_abi(outputs: Vec<abi::Output>) -> Result<Vec<Output>, CodecError> {
	outputs
		.into_iter()
		.map(|o| {
			Ok(Output {
				token: address_from_word(o.token),
				amount: o.amount,
				recipient: address_from_word(o.recipient),
				chain_id: chain_id(o.chainId, "output.chain_id")?,
			})
		})
		.collect()
}

fn outputs_to_abi(outputs: &[Output]) -> Vec<abi::Output> {
	outputs
		.iter()
		.map(|o| abi::Output {
			token: address_to_word(o.token),
			amount: o.amount,
			recipient: address_to_word(o.recipient),
			chainId: U256::from(o.chain_id),
		})
		.collect()
}
