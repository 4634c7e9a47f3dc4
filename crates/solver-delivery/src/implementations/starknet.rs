//! Starknet fill adapter: JSON-RPC reads, relayer-signed writes.

use crate::implementations::relayer::{RelayerCall, RelayerClient};
use crate::{DeliveryError, FillAdapter};
use alloy::primitives::{Bytes, B256, U256};
use async_trait::async_trait;
use solver_chains::StarknetRpc;
use solver_order::implementations::starknet::{felt_from_u128, FILL_SELECTOR, ORDER_STATUS_SELECTOR};
use solver_order::implementations::words::pack_words;
use solver_order::split_u256;
use solver_types::{ChainFamily, FillReceipt, OrderId};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct StarknetFillAdapter {
	rpc: StarknetRpc,
	relayer: RelayerClient,
	confirmation_timeout: Duration,
}

impl StarknetFillAdapter {
	pub fn new(rpc_url: &str, relayer_url: &str, confirmation_timeout: Duration) -> Self {
		Self {
			rpc: StarknetRpc::new(rpc_url),
			relayer: RelayerClient::new(relayer_url),
			confirmation_timeout,
		}
	}

	async fn wait_for_receipt(&self, tx_hash: B256) -> Result<FillReceipt, DeliveryError> {
		let deadline = Instant::now() + self.confirmation_timeout;

		loop {
			let receipt = self
				.rpc
				.transaction_receipt(tx_hash)
				.await
				.map_err(|e| DeliveryError::Network(e.to_string()))?;

			match receipt {
				Some(receipt) if receipt.is_final() => {
					if let Some(reason) = &receipt.revert_reason {
						debug!(tx_hash = %tx_hash, reason = %reason, "Fill reverted");
					}
					return Ok(FillReceipt {
						tx_hash,
						block_number: receipt.block_number.unwrap_or_default(),
						success: receipt.succeeded(),
					});
				}
				_ => debug!(tx_hash = %tx_hash, "Fill not yet accepted"),
			}

			if Instant::now() + RECEIPT_POLL_INTERVAL > deadline {
				return Err(DeliveryError::Timeout(format!("receipt of {}", tx_hash)));
			}
			tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
		}
	}
}

/// A Cairo `u256` order id as its `(low, high)` felts.
fn order_id_felts(order_id: OrderId) -> [B256; 2] {
	let (low, high) = split_u256(U256::from_be_bytes(order_id.0 .0));
	[felt_from_u128(low), felt_from_u128(high)]
}

/// Cairo byte array: `size, word_count, words..`.
fn push_bytes(calldata: &mut Vec<B256>, bytes: &[u8]) {
	let (size, words) = pack_words(bytes);
	calldata.push(felt_from_u128(size as u128));
	calldata.push(felt_from_u128(words.len() as u128));
	calldata.extend(words.into_iter().map(felt_from_u128));
}

/// Calldata for `fill(order_id, origin_data, filler_data)` with empty filler data.
fn fill_calldata(order_id: OrderId, origin_data: &[u8]) -> Vec<B256> {
	let mut calldata = order_id_felts(order_id).to_vec();
	push_bytes(&mut calldata, origin_data);
	push_bytes(&mut calldata, &[]);
	calldata
}

#[async_trait]
impl FillAdapter for StarknetFillAdapter {
	fn family(&self) -> ChainFamily {
		ChainFamily::Starknet
	}

	async fn order_status(&self, settler: B256, order_id: OrderId) -> Result<B256, DeliveryError> {
		let result = self
			.rpc
			.call(settler, ORDER_STATUS_SELECTOR, &order_id_felts(order_id))
			.await
			.map_err(|e| DeliveryError::Network(format!("order_status call failed: {}", e)))?;

		result
			.first()
			.copied()
			.ok_or_else(|| DeliveryError::Network("order_status returned nothing".to_string()))
	}

	async fn fill(
		&self,
		settler: B256,
		order_id: OrderId,
		origin_data: &Bytes,
	) -> Result<FillReceipt, DeliveryError> {
		let call = RelayerCall::new(settler, FILL_SELECTOR, &fill_calldata(order_id, origin_data));
		let tx_hash = self.relayer.submit(&call).await?;
		info!(order_id = %order_id, tx_hash = %tx_hash, "Submitted fill through relayer");

		self.wait_for_receipt(tx_hash).await
	}
}
