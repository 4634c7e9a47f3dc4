//! EVM fill adapter built on an alloy wallet provider.

use crate::{DeliveryError, FillAdapter};
use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{DynProvider, Provider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use solver_order::address_from_word;
use solver_types::{ChainFamily, FillReceipt, OrderId};
use std::time::Duration;
use tracing::{info, warn};

mod abi {
	alloy::sol! {
		function orderStatus(bytes32 orderId) external view returns (bytes32);
		function fill(bytes32 orderId, bytes originData, bytes fillerData) external payable;
	}
}

/// Reads and fills through the destination settler's Solidity interface.
pub struct EvmFillAdapter {
	provider: DynProvider,
	confirmation_timeout: Duration,
}

impl EvmFillAdapter {
	pub fn new(
		rpc_url: &str,
		wallet: EthereumWallet,
		confirmation_timeout: Duration,
	) -> Result<Self, DeliveryError> {
		let provider = solver_chains::wallet_provider(rpc_url, wallet)
			.map_err(|e| DeliveryError::Configuration(e.to_string()))?;

		Ok(Self {
			provider,
			confirmation_timeout,
		})
	}

	/// Replays a failed submission as `eth_call` to surface the revert reason.
	async fn log_revert_reason(&self, tx: TransactionRequest, order_id: OrderId) {
		match self.provider.call(tx).await {
			Err(e) => warn!(order_id = %order_id, revert = %e, "Fill would revert"),
			Ok(_) => warn!(
				order_id = %order_id,
				"Fill simulation succeeded, submission failure was not a revert"
			),
		}
	}
}

fn fill_calldata(order_id: OrderId, origin_data: &Bytes) -> Bytes {
	abi::fillCall {
		orderId: order_id.0,
		originData: origin_data.clone(),
		fillerData: Bytes::new(),
	}
	.abi_encode()
	.into()
}

fn settler_address(settler: B256) -> Address {
	address_from_word(settler)
}

#[async_trait]
impl FillAdapter for EvmFillAdapter {
	fn family(&self) -> ChainFamily {
		ChainFamily::Evm
	}

	async fn order_status(&self, settler: B256, order_id: OrderId) -> Result<B256, DeliveryError> {
		let input = abi::orderStatusCall {
			orderId: order_id.0,
		}
		.abi_encode();
		let tx = TransactionRequest::default()
			.with_to(settler_address(settler))
			.with_input(input);

		let output = self
			.provider
			.call(tx)
			.await
			.map_err(|e| DeliveryError::Network(format!("orderStatus call failed: {}", e)))?;

		<B256 as SolValue>::abi_decode(&output)
			.map_err(|e| DeliveryError::Network(format!("orderStatus returned garbage: {}", e)))
	}

	async fn fill(
		&self,
		settler: B256,
		order_id: OrderId,
		origin_data: &Bytes,
	) -> Result<FillReceipt, DeliveryError> {
		let tx = TransactionRequest::default()
			.with_to(settler_address(settler))
			.with_input(fill_calldata(order_id, origin_data));

		let pending = match self.provider.send_transaction(tx.clone()).await {
			Ok(pending) => pending,
			Err(e) => {
				self.log_revert_reason(tx, order_id).await;
				return Err(DeliveryError::Submission(e.to_string()));
			}
		};

		let tx_hash = *pending.tx_hash();
		info!(order_id = %order_id, tx_hash = %tx_hash, "Submitted fill transaction");

		let receipt = tokio::time::timeout(self.confirmation_timeout, pending.get_receipt())
			.await
			.map_err(|_| DeliveryError::Timeout(format!("receipt of {}", tx_hash)))?
			.map_err(|e| DeliveryError::Network(format!("receipt of {}: {}", tx_hash, e)))?;

		Ok(FillReceipt {
			tx_hash: receipt.transaction_hash,
			block_number: receipt.block_number.unwrap_or_default(),
			success: receipt.status(),
		})
	}
}
