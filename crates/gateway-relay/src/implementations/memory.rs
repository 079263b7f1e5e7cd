//! In-process host platform.
//!
//! Behaves like a single-node development chain that mines one block per
//! executed bundle. It keeps native balances and a registry of downstream
//! contracts; a bundle is applied to a copy of the host state that replaces
//! the live state only if every call in the bundle succeeds. Gas is not
//! metered: a call's `gas_limit` is logged and otherwise ignored.

use crate::implementations::shops::{FungibleUnitShop, UniqueItemShop};
use crate::{RelayError, RelayInterface};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use gateway_types::{
	validation::parse_amount, ConfigSchema, Field, FieldType, RelayCall, RelayReceipt, Schema,
	TokenStandard, ValidationError,
};
use std::any::Any;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Execution context handed to a downstream contract.
#[derive(Debug, Clone, Copy)]
pub struct CallContext {
	/// Address the contract is deployed at.
	pub address: Address,
	/// Immediate caller.
	pub caller: Address,
	/// Value attached to the call, already credited to `address`.
	pub value: U256,
}

/// Native value a contract sends out of its own balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
	pub to: Address,
	pub amount: U256,
}

/// A contract deployed on the memory host.
///
/// Calls return the payouts to apply, or a revert reason.
pub trait DownstreamContract: Send + Sync {
	fn kind(&self) -> &'static str;

	/// Token interface the contract exposes, if any.
	fn token_standard(&self) -> Option<TokenStandard> {
		None
	}

	fn call(&mut self, ctx: &CallContext, data: &[u8]) -> Result<Vec<Payout>, String>;

	fn clone_box(&self) -> Box<dyn DownstreamContract>;

	fn as_any(&self) -> &dyn Any;

	fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn DownstreamContract> {
	fn clone(&self) -> Self {
		self.clone_box()
	}
}

#[derive(Clone, Default)]
struct HostState {
	height: u64,
	balances: HashMap<Address, U256>,
	contracts: HashMap<Address, Box<dyn DownstreamContract>>,
}

impl HostState {
	fn balance(&self, address: &Address) -> U256 {
		self.balances.get(address).copied().unwrap_or(U256::ZERO)
	}

	fn debit(&mut self, address: Address, amount: U256) -> Result<(), RelayError> {
		if amount.is_zero() {
			return Ok(());
		}
		let available = self.balance(&address);
		let remaining = available.checked_sub(amount).ok_or_else(|| {
			RelayError::InsufficientFunds(format!(
				"{} holds {} but must pay {}",
				address, available, amount
			))
		})?;
		self.balances.insert(address, remaining);
		Ok(())
	}

	fn credit(&mut self, address: Address, amount: U256) -> Result<(), RelayError> {
		if amount.is_zero() {
			return Ok(());
		}
		let updated = self
			.balance(&address)
			.checked_add(amount)
			.ok_or_else(|| RelayError::InvalidCall(format!("balance overflow for {}", address)))?;
		self.balances.insert(address, updated);
		Ok(())
	}

	fn apply(&mut self, call: &RelayCall) -> Result<(), RelayError> {
		let funded = call
			.funding
			.total()
			.ok_or_else(|| RelayError::InvalidCall("funding overflow".into()))?;
		if funded != call.value {
			return Err(RelayError::InvalidCall(format!(
				"call value {} is funded with {}",
				call.value, funded
			)));
		}

		self.debit(call.funding.payer, call.funding.attached)?;
		self.debit(call.from, call.funding.treasury)?;
		self.credit(call.target, call.value)?;

		let payouts = match self.contracts.get_mut(&call.target) {
			Some(contract) => {
				let ctx = CallContext {
					address: call.target,
					caller: call.from,
					value: call.value,
				};
				contract.call(&ctx, &call.data).map_err(|reason| {
					RelayError::Reverted(format!("{} at {}: {}", contract.kind(), call.target, reason))
				})?
			},
			None => Vec::new(),
		};

		for payout in payouts {
			self.debit(call.target, payout.amount)?;
			self.credit(payout.to, payout.amount)?;
		}
		Ok(())
	}
}

/// In-memory host. Cloning yields another handle to the same host.
#[derive(Clone, Default)]
pub struct MemoryHost {
	state: Arc<Mutex<HostState>>,
}

impl MemoryHost {
	pub fn new(initial_height: u64) -> Self {
		Self {
			state: Arc::new(Mutex::new(HostState {
				height: initial_height,
				..HostState::default()
			})),
		}
	}

	/// Mints native value into an account.
	pub async fn fund(&self, address: Address, amount: U256) -> Result<(), RelayError> {
		self.state.lock().await.credit(address, amount)
	}

	/// Advances the block height without executing anything.
	pub async fn mine(&self, blocks: u64) -> u64 {
		let mut state = self.state.lock().await;
		state.height = state.height.saturating_add(blocks);
		state.height
	}

	/// Registers a contract at an address, replacing any previous one.
	pub async fn deploy(&self, address: Address, contract: Box<dyn DownstreamContract>) {
		tracing::debug!(%address, kind = contract.kind(), "Deployed contract");
		self.state.lock().await.contracts.insert(address, contract);
	}

	/// Reads a deployed contract of type `C`.
	///
	/// Returns `None` if nothing is deployed at `address` or it is a
	/// different kind of contract.
	pub async fn inspect<C, R>(&self, address: &Address, f: impl FnOnce(&C) -> R) -> Option<R>
	where
		C: DownstreamContract + 'static,
	{
		let state = self.state.lock().await;
		state
			.contracts
			.get(address)
			.and_then(|contract| contract.as_any().downcast_ref::<C>())
			.map(f)
	}

	/// Mutates a deployed contract of type `C` outside of any bundle.
	pub async fn modify<C, R>(&self, address: &Address, f: impl FnOnce(&mut C) -> R) -> Option<R>
	where
		C: DownstreamContract + 'static,
	{
		let mut state = self.state.lock().await;
		state
			.contracts
			.get_mut(address)
			.and_then(|contract| contract.as_any_mut().downcast_mut::<C>())
			.map(f)
	}
}

#[async_trait]
impl RelayInterface for MemoryHost {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryHostSchema)
	}

	async fn block_height(&self) -> Result<u64, RelayError> {
		Ok(self.state.lock().await.height)
	}

	async fn execute(&self, calls: &[RelayCall]) -> Result<RelayReceipt, RelayError> {
		let mut state = self.state.lock().await;
		let mut working = state.clone();

		for call in calls {
			tracing::trace!(
				target_address = %call.target,
				gas_limit = ?call.gas_limit,
				"Gas limit not metered by the memory host"
			);
			if let Err(e) = working.apply(call) {
				tracing::debug!(target_address = %call.target, error = %e, "Bundle reverted");
				return Err(e);
			}
		}

		working.height = working.height.saturating_add(1);
		*state = working;

		Ok(RelayReceipt {
			block_number: state.height,
			calls: calls.len(),
		})
	}

	async fn balance_of(&self, address: &Address) -> Result<U256, RelayError> {
		Ok(self.state.lock().await.balance(address))
	}

	async fn token_standard(&self, address: &Address) -> Result<Option<TokenStandard>, RelayError> {
		let state = self.state.lock().await;
		Ok(state
			.contracts
			.get(address)
			.and_then(|contract| contract.token_standard()))
	}
}

fn shop_kind_validator(value: &toml::Value) -> Result<(), String> {
	match value.as_str() {
		Some("unique_item") | Some("fungible_unit") => Ok(()),
		other => Err(format!(
			"expected \"unique_item\" or \"fungible_unit\", got {:?}",
			other
		)),
	}
}

/// Configuration schema for MemoryHost.
pub struct MemoryHostSchema;

impl ConfigSchema for MemoryHostSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let account = Schema::new(
			vec![
				Field::new("address", FieldType::Address),
				Field::new("balance", FieldType::Amount),
			],
			vec![],
		);
		let item = Schema::new(
			vec![
				Field::new("owner", FieldType::Address),
				Field::new("price", FieldType::Amount),
			],
			vec![],
		);
		let shop = Schema::new(
			vec![
				Field::new("kind", FieldType::String).with_validator(shop_kind_validator),
				Field::new("address", FieldType::Address),
				Field::new("seller", FieldType::Address),
			],
			vec![Field::new(
				"items",
				FieldType::Array(Box::new(FieldType::Table(item))),
			)],
		);

		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"initial_height",
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				),
				Field::new("accounts", FieldType::Array(Box::new(FieldType::Table(account)))),
				Field::new("shops", FieldType::Array(Box::new(FieldType::Table(shop)))),
			],
		);
		schema.validate(config)
	}
}

fn address_field(table: &toml::Value, field: &str) -> Result<Address, RelayError> {
	let raw = table
		.get(field)
		.and_then(|v| v.as_str())
		.ok_or_else(|| RelayError::Configuration(format!("missing '{}'", field)))?;
	Address::from_str(raw)
		.map_err(|e| RelayError::Configuration(format!("invalid '{}' {}: {}", field, raw, e)))
}

fn amount_field(table: &toml::Value, field: &str) -> Result<U256, RelayError> {
	let value = table
		.get(field)
		.ok_or_else(|| RelayError::Configuration(format!("missing '{}'", field)))?;
	parse_amount(value).map_err(RelayError::Configuration)
}

fn build_shop(shop: &toml::Value) -> Result<Box<dyn DownstreamContract>, RelayError> {
	let seller = address_field(shop, "seller")?;
	match shop.get("kind").and_then(|v| v.as_str()) {
		Some("unique_item") => {
			let mut contract = UniqueItemShop::new(seller);
			if let Some(items) = shop.get("items").and_then(|v| v.as_array()) {
				for item in items {
					contract.list(address_field(item, "owner")?, amount_field(item, "price")?);
				}
			}
			Ok(Box::new(contract))
		},
		Some("fungible_unit") => Ok(Box::new(FungibleUnitShop::new(seller))),
		other => Err(RelayError::Configuration(format!(
			"unknown shop kind {:?}",
			other
		))),
	}
}

/// Factory function to create an in-memory host from configuration.
///
/// Configuration parameters:
/// - `initial_height`: block height at startup (default: 0)
/// - `accounts`: genesis balances, `[{ address, balance }]`
/// - `shops`: downstream services, `[{ kind, address, seller, items }]`
pub fn create_host(config: &toml::Value) -> Result<Box<dyn RelayInterface>, RelayError> {
	MemoryHostSchema
		.validate(config)
		.map_err(|e| RelayError::Configuration(e.to_string()))?;

	let initial_height = config
		.get("initial_height")
		.and_then(|v| v.as_integer())
		.unwrap_or(0) as u64;

	let mut state = HostState {
		height: initial_height,
		..HostState::default()
	};

	if let Some(accounts) = config.get("accounts").and_then(|v| v.as_array()) {
		for account in accounts {
			let address = address_field(account, "address")?;
			state.credit(address, amount_field(account, "balance")?)?;
		}
	}

	if let Some(shops) = config.get("shops").and_then(|v| v.as_array()) {
		for shop in shops {
			let address = address_field(shop, "address")?;
			let contract = build_shop(shop)?;
			tracing::info!(%address, kind = contract.kind(), "Configured downstream service");
			state.contracts.insert(address, contract);
		}
	}

	Ok(Box::new(MemoryHost {
		state: Arc::new(Mutex::new(state)),
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::shops::IUniqueItemShop;
	use alloy_primitives::{address, Bytes};
	use alloy_sol_types::SolCall;
	use gateway_types::Funding;

	const GATEWAY: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
	const SHOP: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
	const SELLER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const BUYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

	fn transfer(from: Address, target: Address, value: u64, funding: Funding) -> RelayCall {
		RelayCall {
			from,
			target,
			value: U256::from(value),
			gas_limit: None,
			data: Bytes::new(),
			funding,
		}
	}

	#[tokio::test]
	async fn test_plain_transfer_mines_block() {
		let host = MemoryHost::new(10);
		host.fund(BUYER, U256::from(500u64)).await.unwrap();

		let call = transfer(GATEWAY, SELLER, 200, Funding {
			payer: BUYER,
			attached: U256::from(200u64),
			treasury: U256::ZERO,
		});
		let receipt = host.execute(&[call]).await.unwrap();

		assert_eq!(receipt.block_number, 11);
		assert_eq!(host.block_height().await.unwrap(), 11);
		assert_eq!(host.balance_of(&BUYER).await.unwrap(), U256::from(300u64));
		assert_eq!(host.balance_of(&SELLER).await.unwrap(), U256::from(200u64));
	}

	#[tokio::test]
	async fn test_funding_must_match_value() {
		let host = MemoryHost::new(0);
		host.fund(GATEWAY, U256::from(100u64)).await.unwrap();

		let call = transfer(GATEWAY, SELLER, 100, Funding::from_treasury(U256::from(50u64)));
		assert!(matches!(
			host.execute(&[call]).await,
			Err(RelayError::InvalidCall(_))
		));
		assert_eq!(host.block_height().await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_failed_bundle_applies_nothing() {
		let host = MemoryHost::new(0);
		host.fund(GATEWAY, U256::from(100u64)).await.unwrap();

		let mut shop = UniqueItemShop::new(SELLER);
		let item = shop.list(SELLER, U256::from(242u64));
		host.deploy(SHOP, Box::new(shop)).await;

		let first = transfer(GATEWAY, BUYER, 100, Funding::from_treasury(U256::from(100u64)));
		let mut purchase = transfer(GATEWAY, SHOP, 0, Funding::none());
		purchase.data =
			IUniqueItemShop::transferOwnershipOnPurchaseCall { itemId: item }.abi_encode().into();

		let result = host.execute(&[first, purchase]).await;
		assert!(matches!(result, Err(RelayError::Reverted(_))));

		assert_eq!(host.balance_of(&GATEWAY).await.unwrap(), U256::from(100u64));
		assert_eq!(host.balance_of(&BUYER).await.unwrap(), U256::ZERO);
		assert_eq!(host.block_height().await.unwrap(), 0);
		let owner = host
			.inspect(&SHOP, |shop: &UniqueItemShop| shop.owner_of(item))
			.await
			.flatten();
		assert_eq!(owner, Some(SELLER));
	}

	#[tokio::test]
	async fn test_insufficient_payer_balance() {
		let host = MemoryHost::new(0);
		let call = transfer(GATEWAY, SELLER, 1, Funding {
			payer: BUYER,
			attached: U256::from(1u64),
			treasury: U256::ZERO,
		});
		assert!(matches!(
			host.execute(&[call]).await,
			Err(RelayError::InsufficientFunds(_))
		));
	}

	#[tokio::test]
	async fn test_gas_hint_not_enforced() {
		let host = MemoryHost::new(0);
		host.fund(BUYER, U256::from(10u64)).await.unwrap();

		let mut call = transfer(GATEWAY, SELLER, 10, Funding {
			payer: BUYER,
			attached: U256::from(10u64),
			treasury: U256::ZERO,
		});
		call.gas_limit = Some(1);

		assert_eq!(host.execute(&[call]).await.unwrap().block_number, 1);
		assert_eq!(host.balance_of(&SELLER).await.unwrap(), U256::from(10u64));
	}

	#[tokio::test]
	async fn test_token_standard_lookup() {
		let host = MemoryHost::new(0);
		host.deploy(SHOP, Box::new(UniqueItemShop::new(SELLER))).await;

		assert_eq!(
			host.token_standard(&SHOP).await.unwrap(),
			Some(TokenStandard::UniqueItem)
		);
		assert_eq!(host.token_standard(&BUYER).await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_mine_and_inspect_wrong_kind() {
		let host = MemoryHost::new(5);
		assert_eq!(host.mine(3).await, 8);

		host.deploy(SHOP, Box::new(FungibleUnitShop::new(SELLER))).await;
		let wrong = host
			.inspect(&SHOP, |shop: &UniqueItemShop| shop.owner_of(U256::ZERO))
			.await;
		assert!(wrong.is_none());
	}

	#[test]
	fn test_factory_from_config() {
		let config: toml::Value = toml::from_str(
			r#"
initial_height = 7

[[accounts]]
address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
balance = "1000000000000000000"

[[shops]]
kind = "unique_item"
address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
seller = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
items = [{ owner = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266", price = 242 }]

[[shops]]
kind = "fungible_unit"
address = "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0"
seller = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
"#,
		)
		.unwrap();

		assert!(create_host(&config).is_ok());
	}

	#[test]
	fn test_factory_rejects_unknown_shop_kind() {
		let config: toml::Value = toml::from_str(
			r#"
[[shops]]
kind = "auction"
address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
seller = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
"#,
		)
		.unwrap();

		assert!(matches!(
			create_host(&config),
			Err(RelayError::Configuration(_))
		));
	}
}
