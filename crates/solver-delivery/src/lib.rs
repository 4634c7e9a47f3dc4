//! Fill execution on destination chains.
//!
//! Every chain family exposes the same two operations against its settlement
//! contract: read an order's status and fill it. The dispatcher only ever
//! sees [`FillAdapter`].

use alloy::primitives::{Bytes, B256};
use async_trait::async_trait;
use solver_account::AccountService;
use solver_types::{ChainFamily, ChainId, FillReceipt, OrderId};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm;
	pub mod relayer;
	pub mod starknet;
}

#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The adapter cannot be built from the chain's configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// A read against the node failed.
	#[error("Network error: {0}")]
	Network(String),
	/// The fill transaction was rejected before inclusion.
	#[error("Submission failed: {0}")]
	Submission(String),
	/// No receipt arrived within the confirmation timeout.
	#[error("Timed out waiting for {0}")]
	Timeout(String),
}

/// Chain-family specific access to a destination settlement contract.
#[async_trait]
pub trait FillAdapter: Send + Sync {
	fn family(&self) -> ChainFamily;

	/// Returns the settler's status word for `order_id`.
	async fn order_status(&self, settler: B256, order_id: OrderId) -> Result<B256, DeliveryError>;

	/// Submits a fill with empty filler data and waits for its receipt.
	async fn fill(
		&self,
		settler: B256,
		order_id: OrderId,
		origin_data: &Bytes,
	) -> Result<FillReceipt, DeliveryError>;
}

/// Everything needed to build one chain's adapter.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
	pub chain: String,
	pub chain_id: ChainId,
	pub family: ChainFamily,
	pub rpc_url: String,
	pub relayer_url: Option<String>,
	/// Upper bound on waiting for a fill receipt.
	pub confirmation_timeout: Duration,
}

/// Builds the fill adapter for a chain.
///
/// EVM chains sign with `account`; Starknet chains submit through the
/// configured relayer.
pub fn create_fill_adapter(
	settings: &AdapterSettings,
	account: Option<&AccountService>,
) -> Result<Arc<dyn FillAdapter>, DeliveryError> {
	match settings.family {
		ChainFamily::Evm => {
			let account = account.ok_or_else(|| {
				DeliveryError::Configuration(format!(
					"chain '{}' needs a signing account",
					settings.chain
				))
			})?;
			Ok(Arc::new(implementations::evm::EvmFillAdapter::new(
				&settings.rpc_url,
				account.wallet(),
				settings.confirmation_timeout,
			)?))
		}
		ChainFamily::Starknet => {
			let relayer_url = settings.relayer_url.as_deref().ok_or_else(|| {
				DeliveryError::Configuration(format!(
					"chain '{}' has no relayer_url, fills cannot be submitted",
					settings.chain
				))
			})?;
			Ok(Arc::new(implementations::starknet::StarknetFillAdapter::new(
				&settings.rpc_url,
				relayer_url,
				settings.confirmation_timeout,
			)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn settings(family: ChainFamily) -> AdapterSettings {
		AdapterSettings {
			chain: "dest".to_string(),
			chain_id: 2,
			family,
			rpc_url: "http://localhost:8545".to_string(),
			relayer_url: None,
			confirmation_timeout: Duration::from_secs(5),
		}
	}

	#[test]
	fn test_evm_adapter_requires_account() {
		assert!(matches!(
			create_fill_adapter(&settings(ChainFamily::Evm), None),
			Err(DeliveryError::Configuration(_))
		));
	}

	#[test]
	fn test_starknet_adapter_requires_relayer() {
		assert!(matches!(
			create_fill_adapter(&settings(ChainFamily::Starknet), None),
			Err(DeliveryError::Configuration(_))
		));

		let with_relayer = AdapterSettings {
			relayer_url: Some("http://localhost:8080".to_string()),
			..settings(ChainFamily::Starknet)
		};
		let adapter = create_fill_adapter(&with_relayer, None).unwrap();
		assert_eq!(adapter.family(), ChainFamily::Starknet);
	}

	#[tokio::test]
	async fn test_evm_adapter_with_account() {
		let account = solver_account::create_account(
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
		)
		.unwrap();
		let adapter = create_fill_adapter(&settings(ChainFamily::Evm), Some(&account)).unwrap();
		assert_eq!(adapter.family(), ChainFamily::Evm);
	}
}
