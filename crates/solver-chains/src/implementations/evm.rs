//! alloy provider construction for EVM chains.

use crate::ChainError;
use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};

/// Read-only provider for log queries and contract calls.
pub fn read_provider(rpc_url: &str) -> Result<DynProvider, ChainError> {
	let url = rpc_url
		.parse()
		.map_err(|e| ChainError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;

	Ok(ProviderBuilder::new().connect_http(url).erased())
}

/// Provider that fills nonce, gas and chain id and signs with `wallet`.
pub fn wallet_provider(rpc_url: &str, wallet: EthereumWallet) -> Result<DynProvider, ChainError> {
	let url = rpc_url
		.parse()
		.map_err(|e| ChainError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;

	Ok(ProviderBuilder::new().wallet(wallet).connect_http(url).erased())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rejects_malformed_url() {
		assert!(matches!(
			read_provider("not a url"),
			Err(ChainError::InvalidUrl(_))
		));
	}

	#[tokio::test]
	async fn test_builds_without_connecting() {
		assert!(read_provider("http://localhost:8545").is_ok());
	}
}
