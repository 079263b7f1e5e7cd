//! Domain context for order digests.

use crate::utils::compute_domain_separator;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Fixed identifier binding every order to one running instance on one
/// execution network.
///
/// The separator is computed once at construction and mixed into every order
/// digest, so a signature issued for one instance or network never verifies
/// against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainContext {
	/// Execution network identifier (chain id).
	pub network_id: u64,
	/// Address of this gateway instance.
	pub instance: Address,
	/// keccak256(abi.encode(network_id, instance)).
	pub separator: B256,
}

impl DomainContext {
	pub fn new(network_id: u64, instance: Address) -> Self {
		Self {
			network_id,
			instance,
			separator: compute_domain_separator(network_id, &instance),
		}
	}
}
