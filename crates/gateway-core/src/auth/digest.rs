//! Order digest construction.

use alloy_primitives::B256;
use gateway_types::utils::{compute_final_digest, PackedEncoder};
use gateway_types::{DomainContext, Order, Parties};

/// Six integer words and three addresses precede the payload.
const FIXED_PACKED_LEN: usize = 6 * 32 + 3 * 20;

/// Builds the digest the operator signs for an order.
#[derive(Debug, Clone, Copy)]
pub struct DigestBuilder {
	domain: DomainContext,
}

impl DigestBuilder {
	pub fn new(domain: DomainContext) -> Self {
		Self { domain }
	}

	pub fn domain(&self) -> &DomainContext {
		&self.domain
	}

	/// Hash of the tightly packed order fields, parties and raw payload.
	pub fn order_hash(order: &Order, parties: &Parties, payload: &[u8]) -> B256 {
		let mut enc = PackedEncoder::with_capacity(FIXED_PACKED_LEN + payload.len());
		enc.push_u256(order.sequence)
			.push_u256(order.expiry)
			.push_u256(order.portion)
			.push_u256(order.total)
			.push_u256(order.payload_offset)
			.push_u256(order.item_id)
			.push_address(&parties.downstream_service)
			.push_address(&parties.token_context)
			.push_address(&parties.recipient)
			.push_bytes(payload);
		enc.keccak()
	}

	/// Final digest, bound to this instance's domain.
	pub fn digest(&self, order: &Order, parties: &Parties, payload: &[u8]) -> B256 {
		let order_hash = Self::order_hash(order, parties, payload);
		compute_final_digest(&self.domain.separator, &order_hash)
	}
}
