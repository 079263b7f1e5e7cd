//! Main entry point for the payment gateway service.
//!
//! This binary hosts one gateway instance: it restores the instance state,
//! connects to the configured host platform and serves the HTTP API that
//! accepts orders, administrative actions and donations.

use clap::Parser;
use gateway_config::Config;
use gateway_core::{GatewayBuilder, GatewayEngine, GatewayFactories};
use gateway_types::{AdminEvent, GatewayEvent, OrderEvent, TreasuryEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

mod apis;
mod server;

// Import implementations from individual crates
use gateway_relay::implementations::memory::create_host as create_memory_host;
use gateway_storage::implementations::file::create_storage as create_file_storage;
use gateway_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the gateway service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the gateway service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the gateway engine and restores its state
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started gateway");

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.gateway.id);

	let gateway = Arc::new(build_gateway(config.clone()).await?);

	let events = tokio::spawn(log_events(gateway.event_bus().subscribe()));

	match config.api.clone().filter(|api| api.enabled) {
		Some(api_config) => {
			let api_gateway = Arc::clone(&gateway);

			tokio::select! {
				result = server::start_server(api_config, api_gateway) => {
					tracing::info!("API server finished");
					result?;
				}
				_ = tokio::signal::ctrl_c() => {
					tracing::info!("Received shutdown signal");
				}
			}
		},
		None => {
			tracing::info!("API disabled, idling until shutdown");
			tokio::signal::ctrl_c().await?;
		},
	}

	events.abort();
	tracing::info!("Stopped gateway");
	Ok(())
}

/// Traces every event published by the engine until the bus closes.
async fn log_events(mut receiver: broadcast::Receiver<GatewayEvent>) {
	loop {
		match receiver.recv().await {
			Ok(event) => log_event(&event),
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event logger lagged behind");
			},
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}

fn log_event(event: &GatewayEvent) {
	match event {
		GatewayEvent::Order(OrderEvent::Relayed {
			token_context,
			recipient,
			downstream_service,
			outcome,
		}) => tracing::debug!(
			mode = %outcome.mode,
			%token_context,
			%recipient,
			%downstream_service,
			sequence = %outcome.sequence,
			total = %outcome.total,
			drawn = %outcome.drawn,
			block = outcome.block_number,
			"Order relayed"
		),
		GatewayEvent::Order(OrderEvent::Rejected {
			mode,
			token_context,
			recipient,
			code,
			reason,
		}) => tracing::debug!(
			%mode,
			%token_context,
			%recipient,
			code = %code,
			"Order rejected: {}",
			reason
		),
		GatewayEvent::Admin(AdminEvent::Paused { by }) => {
			tracing::debug!(%by, "Gateway paused")
		},
		GatewayEvent::Admin(AdminEvent::Unpaused { by }) => {
			tracing::debug!(%by, "Gateway unpaused")
		},
		GatewayEvent::Admin(AdminEvent::ManagerialCall {
			target,
			value,
			block_number,
		}) => tracing::debug!(%target, %value, block = block_number, "Managerial call"),
		GatewayEvent::Treasury(TreasuryEvent::Donated {
			from,
			amount,
			balance,
		}) => tracing::debug!(%from, %amount, %balance, "Donation received"),
	}
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the gateway engine with all necessary implementations.
///
/// This function wires up the concrete implementations for:
/// - Storage backends (file, in-memory)
/// - Host platforms (in-memory development host)
pub(crate) async fn build_gateway(
	config: Config,
) -> Result<GatewayEngine, Box<dyn std::error::Error>> {
	let builder = GatewayBuilder::new(config);

	let storage_factories = create_factory_map!(
		gateway_storage::StorageInterface,
		gateway_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let relay_factories = create_factory_map!(
		gateway_relay::RelayInterface,
		gateway_relay::RelayError,
		"memory" => create_memory_host,
	);

	let factories = GatewayFactories {
		storage_factories,
		relay_factories,
	};

	Ok(builder.build(factories).await?)
}
