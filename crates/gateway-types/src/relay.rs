//! Relay types for the host platform.
//!
//! A relay bundle is the list of calls one gateway operation hands to the host.
//! The host executes the bundle atomically: either every call applies or none.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Where the value carried by a call comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Funding {
	/// Account that attached value to the incoming request.
	pub payer: Address,
	/// Value taken from the payer.
	pub attached: U256,
	/// Value taken from the gateway's own balance.
	pub treasury: U256,
}

impl Funding {
	/// Funding for a call that moves no value.
	pub fn none() -> Self {
		Self::default()
	}

	/// Funding drawn entirely from the gateway balance.
	pub fn from_treasury(amount: U256) -> Self {
		Self {
			treasury: amount,
			..Self::default()
		}
	}

	/// Sum of both sources.
	pub fn total(&self) -> Option<U256> {
		self.attached.checked_add(self.treasury)
	}
}

/// A value-carrying call issued by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayCall {
	/// The gateway instance issuing the call.
	pub from: Address,
	pub target: Address,
	pub value: U256,
	/// Gas limit hint; `None` forwards everything available. Hosts that do
	/// not meter gas record the hint without enforcing it.
	pub gas_limit: Option<u64>,
	pub data: Bytes,
	pub funding: Funding,
}

/// Receipt for an executed bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReceipt {
	/// Block the bundle was included in.
	pub block_number: u64,
	/// Number of calls executed.
	pub calls: usize,
}

/// Token interface a contract exposes, as reported by the host.
///
/// Decides how purchased goods are handed off to an order's recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenStandard {
	/// Unique items moved with `transferFrom(from, to, itemId)`.
	UniqueItem,
	/// Fungible units moved with `transfer(to, amount)`.
	FungibleUnit,
}
