//! Relay module for the payment gateway.
//!
//! The host platform is where value actually moves: it keeps native balances,
//! advances the block height orders expire against, and executes the
//! downstream calls the gateway issues. This module abstracts the host behind
//! [`RelayInterface`] so the engine can run against an in-process host in
//! development and tests.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use gateway_types::{ConfigSchema, RelayCall, RelayReceipt, TokenStandard};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod memory;
	pub mod shops;
}

/// Errors that can occur while talking to the host platform.
#[derive(Debug, Error)]
pub enum RelayError {
	/// A call in the bundle reverted; nothing in the bundle was applied.
	#[error("Call reverted: {0}")]
	Reverted(String),
	/// An account could not cover the value it was asked to provide.
	#[error("Insufficient funds: {0}")]
	InsufficientFunds(String),
	/// A call's funding sources do not add up to its value.
	#[error("Invalid call: {0}")]
	InvalidCall(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface to the host platform.
#[async_trait]
pub trait RelayInterface: Send + Sync {
	/// Returns the configuration schema for this host implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Current block height.
	async fn block_height(&self) -> Result<u64, RelayError>;

	/// Executes every call in the bundle, or none of them.
	///
	/// The bundle is included in a single block; the receipt reports its
	/// height.
	async fn execute(&self, calls: &[RelayCall]) -> Result<RelayReceipt, RelayError>;

	/// Native balance held by an address.
	async fn balance_of(&self, address: &Address) -> Result<U256, RelayError>;

	/// Token interface of the contract at `address`, if it exposes one.
	async fn token_standard(&self, address: &Address) -> Result<Option<TokenStandard>, RelayError>;
}

/// Type alias for relay factory functions.
pub type RelayFactory = fn(&toml::Value) -> Result<Box<dyn RelayInterface>, RelayError>;

/// Service wrapping the configured host implementation.
pub struct RelayService {
	host: Box<dyn RelayInterface>,
}

impl RelayService {
	pub fn new(host: Box<dyn RelayInterface>) -> Self {
		Self { host }
	}

	pub async fn block_height(&self) -> Result<u64, RelayError> {
		self.host.block_height().await
	}

	/// Submits a bundle to the host.
	pub async fn execute(&self, calls: &[RelayCall]) -> Result<RelayReceipt, RelayError> {
		for call in calls {
			tracing::debug!(
				target_address = %call.target,
				value = %call.value,
				attached = %call.funding.attached,
				treasury = %call.funding.treasury,
				gas_limit = ?call.gas_limit,
				data_len = call.data.len(),
				"Relaying call"
			);
		}

		let receipt = self.host.execute(calls).await?;
		tracing::debug!(
			block_number = receipt.block_number,
			calls = receipt.calls,
			"Bundle executed"
		);
		Ok(receipt)
	}

	pub async fn balance_of(&self, address: &Address) -> Result<U256, RelayError> {
		self.host.balance_of(address).await
	}

	pub async fn token_standard(
		&self,
		address: &Address,
	) -> Result<Option<TokenStandard>, RelayError> {
		self.host.token_standard(address).await
	}
}
