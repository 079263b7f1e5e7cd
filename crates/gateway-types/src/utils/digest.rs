//! Digest encoding shared by the engine and by off-band signers.
//!
//! These helpers provide:
//! - Domain separator computation (keccak256(abi.encode(networkId, instance)))
//! - Final digest computation (0x1901 || domainSeparator || orderHash)
//! - A word-aligned ABI encoder and a tightly packed encoder

use alloy_primitives::{keccak256, Address, B256, U256};

/// Compute the domain separator: keccak256(abi.encode(uint256 networkId, address instance)).
pub fn compute_domain_separator(network_id: u64, instance: &Address) -> B256 {
	let mut enc = AbiWordEncoder::new();
	enc.push_u256(U256::from(network_id));
	enc.push_address(instance);
	keccak256(enc.finish())
}

/// Compute the final digest: keccak256(0x1901 || domainSeparator || orderHash).
pub fn compute_final_digest(domain_separator: &B256, order_hash: &B256) -> B256 {
	let mut out = Vec::with_capacity(2 + 32 + 32);
	out.push(0x19);
	out.push(0x01);
	out.extend_from_slice(domain_separator.as_slice());
	out.extend_from_slice(order_hash.as_slice());
	keccak256(out)
}

/// ABI encoder for static types, every value occupies one 32-byte word.
#[derive(Debug, Default)]
pub struct AbiWordEncoder {
	buf: Vec<u8>,
}

impl AbiWordEncoder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}

/// Tightly packed encoder (`abi.encodePacked` semantics).
///
/// Integers keep their full 32-byte width, addresses take their raw 20 bytes
/// and dynamic bytes are appended verbatim with no length prefix.
#[derive(Debug, Default)]
pub struct PackedEncoder {
	buf: Vec<u8>,
}

impl PackedEncoder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buf: Vec::with_capacity(capacity),
		}
	}

	pub fn push_u256(&mut self, v: U256) -> &mut Self {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
		self
	}

	pub fn push_address(&mut self, addr: &Address) -> &mut Self {
		self.buf.extend_from_slice(addr.as_slice());
		self
	}

	pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
		self.buf.extend_from_slice(bytes);
		self
	}

	/// Hashes the packed buffer.
	pub fn keccak(&self) -> B256 {
		keccak256(&self.buf)
	}

	pub fn finish(self) -> Vec<u8> {
		self.buf
	}
}
