//! Order processing types for the gateway.
//!
//! An order is a single instruction to forward value into one downstream call.
//! It has no identity beyond the ledger slot it consumes: once an attempt
//! commits or reverts, only the sequence counter for its pairing remains.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order fields committed to by the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Must equal the ledger counter for `(token_context, recipient)`.
	pub sequence: U256,
	/// Block height at which the order stops being valid (exclusive).
	pub expiry: U256,
	/// Minimum value the payer must attach to the call.
	pub portion: U256,
	/// Value relayed to the downstream service.
	pub total: U256,
	/// Byte offset of the payload word overwritten with `total`.
	pub payload_offset: U256,
	/// Item handed off to the recipient after the downstream call.
	pub item_id: U256,
}

/// Addresses an order is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parties {
	/// Service receiving the relayed call.
	pub downstream_service: Address,
	/// Asset collection of the purchased item; zero when nothing is handed off.
	pub token_context: Address,
	/// Party the order is issued for.
	pub recipient: Address,
}

/// Arguments of an operator-submitted order (no signature, no expiry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrder {
	pub downstream_service: Address,
	pub total: U256,
	pub payload_offset: U256,
	pub token_context: Address,
	pub recipient: Address,
	pub item_id: U256,
}

/// Caller identity and attached value of an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
	pub sender: Address,
	pub value: U256,
}

impl MessageContext {
	pub fn new(sender: Address, value: U256) -> Self {
		Self { sender, value }
	}

	/// A call that attaches no value.
	pub fn call(sender: Address) -> Self {
		Self::new(sender, U256::ZERO)
	}
}

/// How an order proves it was sanctioned by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationMode {
	/// Pre-authorized off-band: signature over the order digest.
	Signed(Bytes),
	/// Submitted by the operator directly.
	DirectOperator,
}

impl AuthorizationMode {
	pub fn kind(&self) -> AuthorizationKind {
		match self {
			AuthorizationMode::Signed(_) => AuthorizationKind::Signed,
			AuthorizationMode::DirectOperator => AuthorizationKind::DirectOperator,
		}
	}
}

/// Payload-free discriminant of [`AuthorizationMode`], used in events and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationKind {
	Signed,
	DirectOperator,
}

impl fmt::Display for AuthorizationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AuthorizationKind::Signed => write!(f, "signed"),
			AuthorizationKind::DirectOperator => write!(f, "direct"),
		}
	}
}

/// An order together with everything it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
	pub order: Order,
	pub parties: Parties,
	pub payload: Bytes,
}

/// Status of an order inside the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
	/// Received, checks not yet complete.
	Pending,
	/// All checks passed and the sequence slot was consumed.
	Authorized,
	/// A check failed; carries the failure code.
	Rejected(String),
}

impl OrderStatus {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, OrderStatus::Pending)
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Pending => write!(f, "Pending"),
			OrderStatus::Authorized => write!(f, "Authorized"),
			OrderStatus::Rejected(reason) => write!(f, "Rejected({})", reason),
		}
	}
}

/// Result of a committed relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayOutcome {
	pub mode: AuthorizationKind,
	/// Sequence slot consumed by this order.
	pub sequence: U256,
	/// Value relayed downstream.
	pub total: U256,
	/// Value attached by the caller.
	pub attached: U256,
	/// Value drawn from the treasury.
	pub drawn: U256,
	/// Digest the signature was checked against (signed path only).
	#[serde(skip_serializing_if = "Option::is_none")]
	pub digest: Option<B256>,
	/// Host block the relay executed in.
	pub block_number: u64,
}
