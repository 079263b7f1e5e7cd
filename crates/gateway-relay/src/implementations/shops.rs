//! Downstream item-transfer services deployed on the memory host.
//!
//! Two shops are provided: one selling unique items at a listed price and one
//! minting fungible units 1:1 for received value. Calldata is decoded with the
//! generated call enums; decoding is non-validating, so bytes past the
//! arguments (such as a trailing value slot) are ignored.

use super::memory::{CallContext, DownstreamContract, Payout};
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolInterface};
use gateway_types::TokenStandard;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};

sol! {
	interface IUniqueItemShop {
		function transferOwnershipOnPurchase(uint256 itemId) external payable;
		function transferFrom(address from, address to, uint256 itemId) external;
	}

	interface IFungibleUnitShop {
		function exchange() external payable;
		function transfer(address to, uint256 amount) external returns (bool);
	}
}

fn decode_error(e: alloy_sol_types::Error) -> String {
	format!("invalid calldata: {}", e)
}

fn non_payable(ctx: &CallContext) -> Result<(), String> {
	if ctx.value.is_zero() {
		Ok(())
	} else {
		Err("function is not payable".into())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Item {
	owner: Address,
	/// `None` once sold.
	price: Option<U256>,
}

/// Sells unique items, each at its own listed price.
#[derive(Debug, Clone)]
pub struct UniqueItemShop {
	seller: Address,
	items: BTreeMap<U256, Item>,
	next_id: U256,
}

impl UniqueItemShop {
	pub fn new(seller: Address) -> Self {
		Self {
			seller,
			items: BTreeMap::new(),
			next_id: U256::ZERO,
		}
	}

	pub fn seller(&self) -> Address {
		self.seller
	}

	/// Creates an item owned by `owner`, for sale at `price`.
	pub fn list(&mut self, owner: Address, price: U256) -> U256 {
		let id = self.next_id;
		self.items.insert(id, Item {
			owner,
			price: Some(price),
		});
		self.next_id += U256::from(1u64);
		id
	}

	pub fn owner_of(&self, item_id: U256) -> Option<Address> {
		self.items.get(&item_id).map(|item| item.owner)
	}

	/// Listed price, or `None` if the item is unknown or already sold.
	pub fn price_of(&self, item_id: U256) -> Option<U256> {
		self.items.get(&item_id).and_then(|item| item.price)
	}

	/// Number of items owned by `owner`.
	pub fn balance_of(&self, owner: &Address) -> usize {
		self.items.values().filter(|item| item.owner == *owner).count()
	}

	fn purchase(&mut self, ctx: &CallContext, item_id: U256) -> Result<Vec<Payout>, String> {
		let item = self
			.items
			.get_mut(&item_id)
			.ok_or_else(|| format!("unknown item {}", item_id))?;
		let price = item
			.price
			.ok_or_else(|| format!("item {} is not for sale", item_id))?;
		if ctx.value < price {
			return Err(format!("value {} is below price {}", ctx.value, price));
		}

		let previous_owner = item.owner;
		item.owner = ctx.caller;
		item.price = None;

		Ok(vec![Payout {
			to: previous_owner,
			amount: price,
		}])
	}

	fn transfer_from(
		&mut self,
		ctx: &CallContext,
		from: Address,
		to: Address,
		item_id: U256,
	) -> Result<Vec<Payout>, String> {
		non_payable(ctx)?;
		let item = self
			.items
			.get_mut(&item_id)
			.ok_or_else(|| format!("unknown item {}", item_id))?;
		if item.owner != from || ctx.caller != from {
			return Err(format!("{} may not transfer item {}", ctx.caller, item_id));
		}
		item.owner = to;
		Ok(Vec::new())
	}
}

impl DownstreamContract for UniqueItemShop {
	fn kind(&self) -> &'static str {
		"unique_item"
	}

	fn token_standard(&self) -> Option<TokenStandard> {
		Some(TokenStandard::UniqueItem)
	}

	fn call(&mut self, ctx: &CallContext, data: &[u8]) -> Result<Vec<Payout>, String> {
		use IUniqueItemShop::IUniqueItemShopCalls as Calls;

		match Calls::abi_decode(data).map_err(decode_error)? {
			Calls::transferOwnershipOnPurchase(call) => self.purchase(ctx, call.itemId),
			Calls::transferFrom(call) => self.transfer_from(ctx, call.from, call.to, call.itemId),
		}
	}

	fn clone_box(&self) -> Box<dyn DownstreamContract> {
		Box::new(self.clone())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

/// Mints fungible units 1:1 for received value and forwards the value to
/// the seller.
#[derive(Debug, Clone)]
pub struct FungibleUnitShop {
	seller: Address,
	balances: HashMap<Address, U256>,
	total_supply: U256,
}

impl FungibleUnitShop {
	pub fn new(seller: Address) -> Self {
		Self {
			seller,
			balances: HashMap::new(),
			total_supply: U256::ZERO,
		}
	}

	pub fn seller(&self) -> Address {
		self.seller
	}

	pub fn balance_of(&self, owner: &Address) -> U256 {
		self.balances.get(owner).copied().unwrap_or(U256::ZERO)
	}

	pub fn total_supply(&self) -> U256 {
		self.total_supply
	}

	fn exchange(&mut self, ctx: &CallContext) -> Result<Vec<Payout>, String> {
		let credited = self
			.balance_of(&ctx.caller)
			.checked_add(ctx.value)
			.ok_or("unit balance overflow")?;
		self.total_supply = self
			.total_supply
			.checked_add(ctx.value)
			.ok_or("total supply overflow")?;
		self.balances.insert(ctx.caller, credited);

		if ctx.value.is_zero() {
			return Ok(Vec::new());
		}
		Ok(vec![Payout {
			to: self.seller,
			amount: ctx.value,
		}])
	}

	fn transfer(&mut self, ctx: &CallContext, to: Address, amount: U256) -> Result<Vec<Payout>, String> {
		non_payable(ctx)?;
		let from_balance = self.balance_of(&ctx.caller);
		let remaining = from_balance
			.checked_sub(amount)
			.ok_or_else(|| format!("{} holds {} units, cannot send {}", ctx.caller, from_balance, amount))?;
		self.balances.insert(ctx.caller, remaining);
		let credited = self.balance_of(&to).saturating_add(amount);
		self.balances.insert(to, credited);
		Ok(Vec::new())
	}
}

impl DownstreamContract for FungibleUnitShop {
	fn kind(&self) -> &'static str {
		"fungible_unit"
	}

	fn token_standard(&self) -> Option<TokenStandard> {
		Some(TokenStandard::FungibleUnit)
	}

	fn call(&mut self, ctx: &CallContext, data: &[u8]) -> Result<Vec<Payout>, String> {
		use IFungibleUnitShop::IFungibleUnitShopCalls as Calls;

		match Calls::abi_decode(data).map_err(decode_error)? {
			Calls::exchange(_) => self.exchange(ctx),
			Calls::transfer(call) => self.transfer(ctx, call.to, call.amount),
		}
	}

	fn clone_box(&self) -> Box<dyn DownstreamContract> {
		Box::new(self.clone())
	}

	fn as_any(&self) -> &dyn Any {
		self
	}

	fn as_any_mut(&mut self) -> &mut dyn Any {
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use alloy_sol_types::SolCall;

	const SHOP: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
	const SELLER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const BUYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
	const OTHER: Address = address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

	fn ctx(caller: Address, value: u64) -> CallContext {
		CallContext {
			address: SHOP,
			caller,
			value: U256::from(value),
		}
	}

	#[test]
	fn test_purchase_pays_owner_and_moves_item() {
		let mut shop = UniqueItemShop::new(SELLER);
		let id = shop.list(SELLER, U256::from(242u64));

		let data = IUniqueItemShop::transferOwnershipOnPurchaseCall { itemId: id }.abi_encode();
		let payouts = shop.call(&ctx(BUYER, 242), &data).unwrap();

		assert_eq!(payouts, vec![Payout {
			to: SELLER,
			amount: U256::from(242u64)
		}]);
		assert_eq!(shop.owner_of(id), Some(BUYER));
		assert_eq!(shop.price_of(id), None);
		assert_eq!(shop.balance_of(&BUYER), 1);
	}

	#[test]
	fn test_purchase_below_price_reverts() {
		let mut shop = UniqueItemShop::new(SELLER);
		let id = shop.list(SELLER, U256::from(242u64));

		let data = IUniqueItemShop::transferOwnershipOnPurchaseCall { itemId: id }.abi_encode();
		assert!(shop.call(&ctx(BUYER, 241), &data).is_err());
		assert_eq!(shop.owner_of(id), Some(SELLER));
	}

	#[test]
	fn test_purchase_ignores_trailing_slot() {
		let mut shop = UniqueItemShop::new(SELLER);
		let id = shop.list(SELLER, U256::from(5u64));

		let mut data = IUniqueItemShop::transferOwnershipOnPurchaseCall { itemId: id }.abi_encode();
		data.extend_from_slice(&U256::from(5u64).to_be_bytes::<32>());
		assert!(shop.call(&ctx(BUYER, 5), &data).is_ok());
	}

	#[test]
	fn test_sold_item_cannot_be_bought_again() {
		let mut shop = UniqueItemShop::new(SELLER);
		let id = shop.list(SELLER, U256::ZERO);
		let data = IUniqueItemShop::transferOwnershipOnPurchaseCall { itemId: id }.abi_encode();

		shop.call(&ctx(BUYER, 0), &data).unwrap();
		assert!(shop.call(&ctx(OTHER, 0), &data).is_err());
	}

	#[test]
	fn test_transfer_from_requires_owner() {
		let mut shop = UniqueItemShop::new(SELLER);
		let id = shop.list(SELLER, U256::from(1u64));

		let data = IUniqueItemShop::transferFromCall {
			from: SELLER,
			to: BUYER,
			itemId: id,
		}
		.abi_encode();
		assert!(shop.call(&ctx(OTHER, 0), &data).is_err());
		assert!(shop.call(&ctx(SELLER, 1), &data).is_err());
		assert!(shop.call(&ctx(SELLER, 0), &data).is_ok());
		assert_eq!(shop.owner_of(id), Some(BUYER));
	}

	#[test]
	fn test_exchange_credits_units_and_pays_seller() {
		let mut shop = FungibleUnitShop::new(SELLER);
		let data = IFungibleUnitShop::exchangeCall {}.abi_encode();

		let payouts = shop.call(&ctx(BUYER, 242), &data).unwrap();
		assert_eq!(payouts, vec![Payout {
			to: SELLER,
			amount: U256::from(242u64)
		}]);
		assert_eq!(shop.balance_of(&BUYER), U256::from(242u64));
		assert_eq!(shop.total_supply(), U256::from(242u64));
	}

	#[test]
	fn test_unit_transfer() {
		let mut shop = FungibleUnitShop::new(SELLER);
		shop.call(&ctx(BUYER, 10), &IFungibleUnitShop::exchangeCall {}.abi_encode())
			.unwrap();

		let data = IFungibleUnitShop::transferCall {
			to: OTHER,
			amount: U256::from(4u64),
		}
		.abi_encode();
		shop.call(&ctx(BUYER, 0), &data).unwrap();
		assert_eq!(shop.balance_of(&BUYER), U256::from(6u64));
		assert_eq!(shop.balance_of(&OTHER), U256::from(4u64));

		let too_much = IFungibleUnitShop::transferCall {
			to: OTHER,
			amount: U256::from(7u64),
		}
		.abi_encode();
		assert!(shop.call(&ctx(BUYER, 0), &too_much).is_err());
	}

	#[test]
	fn test_unknown_selector() {
		let mut shop = FungibleUnitShop::new(SELLER);
		assert!(shop.call(&ctx(BUYER, 0), &[1, 2, 3, 4]).is_err());
		assert!(shop.call(&ctx(BUYER, 0), &[1, 2]).is_err());

		// A unique-item handoff is not part of the fungible interface.
		let handoff = IUniqueItemShop::transferFromCall {
			from: BUYER,
			to: OTHER,
			itemId: U256::from(1u64),
		}
		.abi_encode();
		let reason = shop.call(&ctx(BUYER, 0), &handoff).unwrap_err();
		assert!(reason.starts_with("invalid calldata"), "{}", reason);
	}

	#[test]
	fn test_truncated_arguments_revert() {
		let mut shop = UniqueItemShop::new(SELLER);
		let id = shop.list(SELLER, U256::ZERO);

		let data = IUniqueItemShop::transferFromCall {
			from: SELLER,
			to: BUYER,
			itemId: id,
		}
		.abi_encode();
		assert!(shop.call(&ctx(SELLER, 0), &data[..data.len() - 1]).is_err());
		assert_eq!(shop.owner_of(id), Some(SELLER));
	}

	#[test]
	fn test_shops_report_token_standard() {
		assert_eq!(
			UniqueItemShop::new(SELLER).token_standard(),
			Some(TokenStandard::UniqueItem)
		);
		assert_eq!(
			FungibleUnitShop::new(SELLER).token_standard(),
			Some(TokenStandard::FungibleUnit)
		);
	}
}
