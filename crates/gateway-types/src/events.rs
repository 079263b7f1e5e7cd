//! Event types published by the gateway engine.
//!
//! Events are emitted only after an operation commits (or, for rejections,
//! after it has been fully reverted), so consumers never observe partial state.

use crate::{AuthorizationKind, RelayOutcome};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all gateway events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatewayEvent {
	/// Events from the order pipeline.
	Order(OrderEvent),
	/// Events from the administrative controller.
	Admin(AdminEvent),
	/// Events affecting the treasury balance outside of orders.
	Treasury(TreasuryEvent),
}

/// Events related to order processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// An order was authorized and its relay committed.
	Relayed {
		token_context: Address,
		recipient: Address,
		downstream_service: Address,
		outcome: RelayOutcome,
	},
	/// An order was rejected; no state changed.
	Rejected {
		mode: AuthorizationKind,
		token_context: Address,
		recipient: Address,
		code: String,
		reason: String,
	},
}

/// Events emitted by operator-only actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AdminEvent {
	Paused { by: Address },
	Unpaused { by: Address },
	/// Unconditional relay issued by the operator.
	ManagerialCall {
		target: Address,
		value: U256,
		block_number: u64,
	},
}

/// Events related to the treasury.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreasuryEvent {
	Donated {
		from: Address,
		amount: U256,
		balance: U256,
	},
}
