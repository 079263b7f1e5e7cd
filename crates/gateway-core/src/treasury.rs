//! Treasury accounting and value splitting.
//!
//! The treasury is the native value the gateway instance holds. An order
//! relays `total`; the caller attaches part of it and the rest is drawn from
//! the treasury. Overpayment is rejected rather than absorbed.

use crate::GatewayError;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// How the relayed value of one order is funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSplit {
	/// Value attached by the caller.
	pub attached: U256,
	/// Value drawn from the treasury.
	pub drawn: U256,
	/// Value relayed downstream; `attached + drawn`.
	pub total: U256,
}

/// Native balance held by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Treasury {
	balance: U256,
}

impl Treasury {
	pub fn new(balance: U256) -> Self {
		Self { balance }
	}

	pub fn balance(&self) -> U256 {
		self.balance
	}

	/// Splits `total` into the attached part and a treasury draw.
	///
	/// `minimum` is the least the caller must attach (the signed portion).
	/// Does not modify the balance; see [`Treasury::apply`].
	pub fn split(&self, attached: U256, minimum: U256, total: U256) -> Result<ValueSplit, GatewayError> {
		if attached < minimum {
			return Err(GatewayError::InsufficientValue {
				attached,
				required: minimum,
			});
		}
		if attached > total {
			return Err(GatewayError::ExcessValue { attached, total });
		}

		let drawn = total - attached;
		if drawn > self.balance {
			return Err(GatewayError::InsufficientTreasury {
				requested: drawn,
				available: self.balance,
			});
		}

		Ok(ValueSplit {
			attached,
			drawn,
			total,
		})
	}

	/// Debits the treasury by the split's draw.
	pub fn apply(&mut self, split: &ValueSplit) -> Result<(), GatewayError> {
		self.debit(split.drawn)
	}

	pub fn debit(&mut self, amount: U256) -> Result<(), GatewayError> {
		self.balance = self
			.balance
			.checked_sub(amount)
			.ok_or(GatewayError::InsufficientTreasury {
				requested: amount,
				available: self.balance,
			})?;
		Ok(())
	}

	pub fn credit(&mut self, amount: U256) -> Result<(), GatewayError> {
		self.balance = self.balance.checked_add(amount).ok_or_else(|| {
			GatewayError::ArithmeticOverflow(format!(
				"treasury balance {} cannot take {}",
				self.balance, amount
			))
		})?;
		Ok(())
	}
}
