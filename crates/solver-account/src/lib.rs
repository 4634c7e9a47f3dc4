//! Signing accounts used to submit fills.
//!
//! The EVM fill adapter signs with the account built here. Starknet fills are
//! signed by an external relayer and never touch this crate.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub use implementations::local::LocalWallet;

#[derive(Debug, Error)]
pub enum AccountError {
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// A transaction-signing identity.
pub trait AccountInterface: Send + Sync {
	/// Address fills are sent from.
	fn address(&self) -> Address;

	/// Wallet handed to a provider so it can sign outgoing transactions.
	fn wallet(&self) -> EthereumWallet;
}

pub struct AccountService {
	provider: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(provider: Box<dyn AccountInterface>) -> Self {
		Self { provider }
	}

	pub fn address(&self) -> Address {
		self.provider.address()
	}

	pub fn wallet(&self) -> EthereumWallet {
		self.provider.wallet()
	}
}

/// Creates the account for a hex-encoded private key.
pub fn create_account(private_key: &str) -> Result<AccountService, AccountError> {
	let wallet = LocalWallet::new(private_key)?;
	tracing::info!(address = %wallet.address(), "Loaded solver account");
	Ok(AccountService::new(Box::new(wallet)))
}
