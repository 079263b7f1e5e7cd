//! Builder pattern for constructing gateway engines.
//!
//! Provides a flexible way to compose a GatewayEngine from pluggable storage
//! and host implementations using factory functions, then restores the
//! instance's persisted state (or creates a fresh one).

use crate::engine::{event_bus::EventBus, GatewayEngine};
use crate::state::{GatewayState, SnapshotStore};
use gateway_config::Config;
use gateway_relay::{RelayError, RelayInterface, RelayService};
use gateway_storage::{StorageError, StorageInterface, StorageService};
use gateway_types::DomainContext;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Default capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during gateway engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by
/// implementation name.
pub struct GatewayFactories<SF, RF> {
	pub storage_factories: HashMap<String, SF>,
	pub relay_factories: HashMap<String, RF>,
}

/// Builder for constructing a GatewayEngine with pluggable implementations.
pub struct GatewayBuilder {
	config: Config,
}

impl GatewayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using the factories for each component type.
	pub async fn build<SF, RF>(
		self,
		factories: GatewayFactories<SF, RF>,
	) -> Result<GatewayEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		RF: Fn(&toml::Value) -> Result<Box<dyn RelayInterface>, RelayError>,
	{
		let storage_backend = load_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let host = load_primary(
			"relay",
			&self.config.relay.primary,
			&self.config.relay.implementations,
			&factories.relay_factories,
		)?;
		let relay = Arc::new(RelayService::new(host));

		let state = restore_state(&self.config, &storage).await?;
		tracing::info!(
			component = "gateway",
			id = %self.config.gateway.id,
			instance = %state.domain.instance,
			operator = %state.operator,
			paused = state.paused,
			pairings = state.ledger.len(),
			treasury = %state.treasury.balance(),
			"State loaded"
		);

		Ok(GatewayEngine::new(
			self.config,
			state,
			storage,
			relay,
			EventBus::new(EVENT_BUS_CAPACITY),
		))
	}
}

/// Creates every configured implementation that has a factory and returns
/// the primary one.
fn load_primary<T: ?Sized, E: std::fmt::Display, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<Box<T>, BuilderError>
where
	F: Fn(&toml::Value) -> Result<Box<T>, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		if let Some(factory) = factories.get(name) {
			match factory(config) {
				Ok(implementation) => {
					// Validation already happened in the factory
					let is_primary = primary == name;
					tracing::info!(component = %component, implementation = %name, enabled = %is_primary, "Loaded");
					loaded.insert(name.clone(), implementation);
				},
				Err(e) => {
					tracing::error!(
						component = %component,
						implementation = %name,
						error = %e,
						"Failed to create implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create {} implementation '{}': {}",
						component, name, e
					)));
				},
			}
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}

/// Loads the persisted snapshot for the configured instance, or creates and
/// persists the initial state.
async fn restore_state(
	config: &Config,
	storage: &StorageService,
) -> Result<GatewayState, BuilderError> {
	let gateway = &config.gateway;
	let domain = DomainContext::new(gateway.network_id, gateway.address);
	let snapshots = SnapshotStore::new(storage, &gateway.address);

	let existing = snapshots
		.load()
		.await
		.map_err(|e| BuilderError::Config(format!("Failed to load gateway state: {}", e)))?;

	match existing {
		Some(state) => {
			if state.domain != domain {
				return Err(BuilderError::Config(format!(
					"Persisted state belongs to network {} instance {}, configured network {} instance {}",
					state.domain.network_id, state.domain.instance, domain.network_id, domain.instance
				)));
			}
			if state.operator != gateway.operator {
				return Err(BuilderError::Config(format!(
					"Persisted state has operator {}, configured operator is {}",
					state.operator, gateway.operator
				)));
			}
			Ok(state)
		},
		None => {
			let state = GatewayState::new(gateway.operator, domain, gateway.start_paused);
			snapshots.save(&state).await.map_err(|e| {
				BuilderError::Config(format!("Failed to persist initial gateway state: {}", e))
			})?;
			Ok(state)
		},
	}
}
