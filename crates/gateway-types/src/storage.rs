//! Storage-related types for the gateway.

/// Storage namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Snapshot of one instance's gateway state (ledger, pause flag, treasury).
	GatewayState,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::GatewayState => "gateway_state",
		}
	}
}
