//! Core authorization and relay pipeline for the payment gateway.
//!
//! The engine accepts orders through two entry paths (signed by the operator
//! off-band, or submitted by the operator directly), checks them against the
//! sequence ledger, splits the relayed value between the caller and the
//! treasury, binds the value into the downstream payload and hands the
//! resulting bundle to the host platform. Administrative actions (pause,
//! unpause, managerial calls) and donations go through the same engine so
//! that every mutation of gateway state is serialized and persisted.

pub mod auth;
pub mod binder;
pub mod builder;
pub mod engine;
pub mod ledger;
pub mod state;
pub mod treasury;
pub mod validator;

pub use builder::{BuilderError, GatewayBuilder, GatewayFactories};
pub use engine::{event_bus::EventBus, GatewayEngine};

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors returned by gateway operations.
///
/// Every variant aborts the operation it was raised in; gateway state is left
/// exactly as it was before the request.
#[derive(Debug, Error)]
pub enum GatewayError {
	/// Caller is not the operator.
	#[error("Unauthorized caller: {caller}")]
	Unauthorized { caller: Address },
	/// Signature is malformed, non-canonical or not from the operator.
	#[error("Invalid signature: {0}")]
	InvalidSignature(String),
	#[error("Order expired: block height {height} is not below expiry {expiry}")]
	Expired { height: u64, expiry: U256 },
	#[error("Sequence mismatch: expected {expected}, got {provided}")]
	SequenceMismatch { expected: U256, provided: U256 },
	/// Attached value is below the order's portion.
	#[error("Insufficient value: attached {attached}, order requires at least {required}")]
	InsufficientValue { attached: U256, required: U256 },
	#[error("Insufficient treasury: requested {requested}, available {available}")]
	InsufficientTreasury { requested: U256, available: U256 },
	/// Attached value exceeds what the order relays.
	#[error("Excess value: attached {attached} exceeds order total {total}")]
	ExcessValue { attached: U256, total: U256 },
	#[error("Payload binding out of range: offset {offset}, payload length {length}")]
	PayloadBindingOutOfRange { offset: U256, length: usize },
	#[error("Gateway is paused")]
	Paused,
	#[error("Gateway is not paused")]
	NotPaused,
	/// The host rejected the relay bundle.
	#[error("Downstream call failed: {0}")]
	DownstreamCallFailure(String),
	/// A managerial call addressed the gateway instance itself.
	#[error("Managerial call targets the gateway instance {target}")]
	SelfCall { target: Address },
	#[error("Relay error: {0}")]
	Relay(String),
	#[error("Storage error: {0}")]
	Storage(String),
	/// The ledger counter for a pairing cannot advance any further.
	#[error("Sequence counter exhausted")]
	SequenceExhausted,
	/// A balance would exceed the representable range.
	#[error("Arithmetic overflow: {0}")]
	ArithmeticOverflow(String),
}

impl GatewayError {
	/// Stable identifier for the error kind.
	pub fn code(&self) -> &'static str {
		match self {
			GatewayError::Unauthorized { .. } => "UNAUTHORIZED",
			GatewayError::InvalidSignature(_) => "INVALID_SIGNATURE",
			GatewayError::Expired { .. } => "EXPIRED",
			GatewayError::SequenceMismatch { .. } => "SEQUENCE_MISMATCH",
			GatewayError::InsufficientValue { .. } => "INSUFFICIENT_VALUE",
			GatewayError::InsufficientTreasury { .. } => "INSUFFICIENT_TREASURY",
			GatewayError::ExcessValue { .. } => "EXCESS_VALUE",
			GatewayError::PayloadBindingOutOfRange { .. } => "PAYLOAD_BINDING_OUT_OF_RANGE",
			GatewayError::Paused => "PAUSED",
			GatewayError::NotPaused => "NOT_PAUSED",
			GatewayError::DownstreamCallFailure(_) => "DOWNSTREAM_CALL_FAILURE",
			GatewayError::SelfCall { .. } => "SELF_CALL",
			GatewayError::Relay(_) => "RELAY_ERROR",
			GatewayError::Storage(_) => "STORAGE_ERROR",
			GatewayError::SequenceExhausted => "SEQUENCE_EXHAUSTED",
			GatewayError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
		}
	}

	/// Whether the error belongs to the unauthorized class (wrong caller or
	/// bad signature).
	pub fn is_unauthorized(&self) -> bool {
		matches!(
			self,
			GatewayError::Unauthorized { .. } | GatewayError::InvalidSignature(_)
		)
	}
}
