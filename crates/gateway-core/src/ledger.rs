//! Per-pairing sequence counters.
//!
//! Each `(token_context, recipient)` pairing has a counter starting at 0. An
//! order consumes the slot equal to the current counter, which then advances
//! by one. Counters never decrease.

use crate::GatewayError;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One persisted counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
	pub token_context: Address,
	pub recipient: Address,
	pub sequence: U256,
}

/// Sequence counters for every pairing that has consumed at least one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LedgerEntry>", into = "Vec<LedgerEntry>")]
pub struct SequenceLedger {
	counters: HashMap<(Address, Address), U256>,
}

impl SequenceLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current counter for a pairing; 0 if it never consumed an order.
	pub fn current(&self, token_context: &Address, recipient: &Address) -> U256 {
		self.counters
			.get(&(*token_context, *recipient))
			.copied()
			.unwrap_or(U256::ZERO)
	}

	/// Consumes the slot `expected`, which must equal the current counter.
	///
	/// Returns the consumed slot.
	pub fn consume(
		&mut self,
		token_context: &Address,
		recipient: &Address,
		expected: U256,
	) -> Result<U256, GatewayError> {
		let current = self.current(token_context, recipient);
		if expected != current {
			return Err(GatewayError::SequenceMismatch {
				expected: current,
				provided: expected,
			});
		}
		self.advance(token_context, recipient, current)
	}

	/// Consumes whatever slot is current.
	pub fn consume_next(
		&mut self,
		token_context: &Address,
		recipient: &Address,
	) -> Result<U256, GatewayError> {
		let current = self.current(token_context, recipient);
		self.advance(token_context, recipient, current)
	}

	fn advance(
		&mut self,
		token_context: &Address,
		recipient: &Address,
		current: U256,
	) -> Result<U256, GatewayError> {
		let next = current
			.checked_add(U256::from(1))
			.ok_or(GatewayError::SequenceExhausted)?;
		self.counters.insert((*token_context, *recipient), next);
		Ok(current)
	}

	/// Number of pairings with a non-zero counter.
	pub fn len(&self) -> usize {
		self.counters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counters.is_empty()
	}
}

impl From<Vec<LedgerEntry>> for SequenceLedger {
	fn from(entries: Vec<LedgerEntry>) -> Self {
		let counters = entries
			.into_iter()
			.map(|entry| ((entry.token_context, entry.recipient), entry.sequence))
			.collect();
		Self { counters }
	}
}

impl From<SequenceLedger> for Vec<LedgerEntry> {
	fn from(ledger: SequenceLedger) -> Self {
		let mut entries: Vec<LedgerEntry> = ledger
			.counters
			.into_iter()
			.map(|((token_context, recipient), sequence)| LedgerEntry {
				token_context,
				recipient,
				sequence,
			})
			.collect();
		// Stable order keeps snapshots byte-identical across runs.
		entries.sort_by(|a, b| {
			(a.token_context, a.recipient).cmp(&(b.token_context, b.recipient))
		});
		entries
	}
}
