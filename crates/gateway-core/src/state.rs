//! Gateway state and its persisted snapshot.

use crate::ledger::SequenceLedger;
use crate::treasury::Treasury;
use crate::GatewayError;
use alloy_primitives::Address;
use gateway_storage::{StorageError, StorageService};
use gateway_types::{DomainContext, StorageKey};
use serde::{Deserialize, Serialize};

/// Everything a gateway instance mutates.
///
/// Operations work on a clone and replace the committed value only when the
/// whole operation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayState {
	pub operator: Address,
	pub paused: bool,
	pub ledger: SequenceLedger,
	pub domain: DomainContext,
	pub treasury: Treasury,
}

impl GatewayState {
	/// State of a freshly deployed instance: empty ledger and treasury.
	pub fn new(operator: Address, domain: DomainContext, paused: bool) -> Self {
		Self {
			operator,
			paused,
			ledger: SequenceLedger::new(),
			domain,
			treasury: Treasury::default(),
		}
	}

	pub fn require_operator(&self, caller: &Address) -> Result<(), GatewayError> {
		if *caller != self.operator {
			return Err(GatewayError::Unauthorized { caller: *caller });
		}
		Ok(())
	}

	pub fn require_unpaused(&self) -> Result<(), GatewayError> {
		if self.paused {
			return Err(GatewayError::Paused);
		}
		Ok(())
	}
}

/// Reads and writes the state snapshot of one instance.
pub struct SnapshotStore<'a> {
	storage: &'a StorageService,
	id: String,
}

impl<'a> SnapshotStore<'a> {
	pub fn new(storage: &'a StorageService, instance: &Address) -> Self {
		Self {
			storage,
			id: instance.to_string(),
		}
	}

	pub async fn load(&self) -> Result<Option<GatewayState>, GatewayError> {
		self.storage
			.retrieve_optional(StorageKey::GatewayState.as_str(), &self.id)
			.await
			.map_err(storage_error)
	}

	pub async fn save(&self, state: &GatewayState) -> Result<(), GatewayError> {
		self.storage
			.store(StorageKey::GatewayState.as_str(), &self.id, state)
			.await
			.map_err(storage_error)
	}
}

fn storage_error(e: StorageError) -> GatewayError {
	GatewayError::Storage(e.to_string())
}
