//! Payload binding.
//!
//! The caller supplies the downstream payload, but the value argument inside
//! it is written by the gateway: the 32-byte word at the signed offset is
//! overwritten with the big-endian relayed total. The digest already commits
//! to the original payload and the offset, so only bounds need checking here.

use crate::GatewayError;
use alloy_primitives::{Bytes, U256};

pub const WORD_SIZE: usize = 32;

/// Returns `payload` with the word at `offset` replaced by `value`.
pub fn bind_value(payload: &[u8], offset: U256, value: U256) -> Result<Bytes, GatewayError> {
	let out_of_range = || GatewayError::PayloadBindingOutOfRange {
		offset,
		length: payload.len(),
	};

	let start: usize = offset.try_into().map_err(|_| out_of_range())?;
	let end = start.checked_add(WORD_SIZE).ok_or_else(out_of_range)?;
	if end > payload.len() {
		return Err(out_of_range());
	}

	let mut bound = payload.to_vec();
	bound[start..end].copy_from_slice(&value.to_be_bytes::<WORD_SIZE>());
	Ok(bound.into())
}
