//! Configuration module for the payment gateway.
//!
//! This module provides structures and utilities for managing gateway
//! configuration. Configuration is loaded from TOML, environment variables are
//! substituted before parsing, and the result is validated before use.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use gateway_types::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use loader::ConfigLoader;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of the gateway instance.
	pub gateway: GatewayConfig,
	/// Backend persisting the gateway state snapshot.
	pub storage: StorageConfig,
	/// Host platform the gateway relays through.
	pub relay: RelayConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Identity of one gateway instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Human-readable identifier used in logs.
	pub id: String,
	/// Network the instance runs on; part of the domain separator.
	pub network_id: u64,
	/// Address of the instance; part of the domain separator and the account
	/// that holds the treasury on the host.
	pub address: Address,
	/// The single identity allowed to sign orders and perform admin actions.
	pub operator: Address,
	/// Whether a fresh instance starts paused. Ignored when a persisted
	/// snapshot exists.
	#[serde(default = "default_start_paused")]
	pub start_paused: bool,
}

fn default_start_paused() -> bool {
	true
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the host platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of host implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Maximum request size in bytes.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// 1MB
fn default_max_request_size() -> usize {
	1024 * 1024
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match (std::env::var(var_name.as_str()), default_value) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					var_name.as_str()
				)))
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

fn validate_implementations(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Loads configuration from a file, following include directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.gateway.id.is_empty() {
			return Err(ConfigError::Validation("Gateway ID cannot be empty".into()));
		}
		if self.gateway.network_id == 0 {
			return Err(ConfigError::Validation(
				"Gateway network_id must be greater than 0".into(),
			));
		}
		if self.gateway.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Gateway address cannot be the zero address".into(),
			));
		}
		if self.gateway.operator == Address::ZERO {
			return Err(ConfigError::Validation(
				"Gateway operator cannot be the zero address".into(),
			));
		}

		validate_implementations("storage", &self.storage.primary, &self.storage.implementations)?;
		validate_implementations("relay", &self.relay.primary, &self.relay.implementations)?;

		if let Some(ref api) = self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved and the configuration is validated
/// after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[gateway]
id = "test-gateway"
network_id = 31337
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
operator = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"

[storage]
primary = "memory"
[storage.implementations.memory]

[relay]
primary = "memory"
[relay.implementations.memory]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("GATEWAY_TEST_HOST", "localhost");
		std::env::set_var("GATEWAY_TEST_PORT", "5432");

		let input = "host = \"${GATEWAY_TEST_HOST}:${GATEWAY_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("GATEWAY_TEST_HOST");
		std::env::remove_var("GATEWAY_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${GATEWAY_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${GATEWAY_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("GATEWAY_MISSING_VAR"));
	}

	#[test]
	fn test_oversized_input_rejected() {
		let input = "#".repeat(1024 * 1024 + 1);
		assert!(matches!(
			resolve_env_vars(&input),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn test_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.gateway.id, "test-gateway");
		assert_eq!(config.gateway.network_id, 31337);
		assert!(config.gateway.start_paused);
		assert!(config.api.is_none());
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("GATEWAY_TEST_OPERATOR", "0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

		let config_str = BASE_CONFIG.replace(
			"\"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"",
			"\"${GATEWAY_TEST_OPERATOR}\"",
		);
		let config: Config = config_str.parse().unwrap();
		assert_eq!(
			config.gateway.operator,
			Address::from_str("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()
		);

		std::env::remove_var("GATEWAY_TEST_OPERATOR");
	}

	#[test]
	fn test_api_section_defaults() {
		let config_str = format!("{}\n[api]\nenabled = true\n", BASE_CONFIG);
		let config: Config = config_str.parse().unwrap();
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 3000);
		assert_eq!(api.max_request_size, 1024 * 1024);
	}

	#[test]
	fn test_primary_must_be_configured() {
		let config_str = BASE_CONFIG.replace(
			"[relay]\nprimary = \"memory\"",
			"[relay]\nprimary = \"devnet\"",
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary relay 'devnet'"));
	}

	#[test]
	fn test_zero_operator_rejected() {
		let config_str = BASE_CONFIG.replace(
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
			"0x0000000000000000000000000000000000000000",
		);
		let err = config_str.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("operator"));
	}

	#[test]
	fn test_invalid_address_is_parse_error() {
		let config_str = BASE_CONFIG.replace(
			"0x5FbDB2315678afecb367f032d93F642f64180aa3",
			"0x1234",
		);
		assert!(matches!(
			config_str.parse::<Config>(),
			Err(ConfigError::Parse(_))
		));
	}

	#[test]
	fn test_start_paused_can_be_disabled() {
		let config_str = BASE_CONFIG.replace(
			"operator = \"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"",
			"operator = \"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\"\nstart_paused = false",
		);
		let config: Config = config_str.parse().unwrap();
		assert!(!config.gateway.start_paused);
	}
}
