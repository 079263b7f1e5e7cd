//! Operator signature verification.
//!
//! Signatures are 65 bytes `r || s || v` with `v` in `{27, 28}`, produced by
//! signing the order digest directly (no message prefix). Only the canonical
//! low-s form is accepted: for every valid signature `(r, s)` the pair
//! `(r, n - s)` also verifies, and accepting both would let anyone mint a
//! second, distinct signature for an order that was already seen.

use crate::GatewayError;
use alloy_primitives::{uint, Address, Signature, B256, U256};

pub const SIGNATURE_LENGTH: usize = 65;

/// Half the secp256k1 group order.
const SECP256K1N_HALF: U256 =
	uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0_U256);

/// Checks that a digest was signed by the registered operator.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier {
	operator: Address,
}

impl SignatureVerifier {
	pub fn new(operator: Address) -> Self {
		Self { operator }
	}

	pub fn operator(&self) -> Address {
		self.operator
	}

	/// Recovers the signer of `digest` and requires it to be the operator.
	pub fn verify(&self, digest: &B256, signature: &[u8]) -> Result<Address, GatewayError> {
		let signer = recover(digest, signature)?;
		if signer != self.operator {
			return Err(GatewayError::InvalidSignature(format!(
				"signer {} is not the operator",
				signer
			)));
		}
		Ok(signer)
	}
}

/// Recovers the address that produced a canonical signature over `digest`.
pub fn recover(digest: &B256, signature: &[u8]) -> Result<Address, GatewayError> {
	if signature.len() != SIGNATURE_LENGTH {
		return Err(GatewayError::InvalidSignature(format!(
			"expected {} bytes, got {}",
			SIGNATURE_LENGTH,
			signature.len()
		)));
	}

	let r = U256::from_be_slice(&signature[..32]);
	let s = U256::from_be_slice(&signature[32..64]);
	let y_parity = match signature[64] {
		27 => false,
		28 => true,
		v => {
			return Err(GatewayError::InvalidSignature(format!(
				"recovery id {} is not 27 or 28",
				v
			)))
		},
	};

	if r.is_zero() || s.is_zero() {
		return Err(GatewayError::InvalidSignature("zero signature component".into()));
	}
	if s > SECP256K1N_HALF {
		return Err(GatewayError::InvalidSignature("non-canonical high s value".into()));
	}

	Signature::new(r, s, y_parity)
		.recover_address_from_prehash(digest)
		.map_err(|e| GatewayError::InvalidSignature(format!("recovery failed: {}", e)))
}
