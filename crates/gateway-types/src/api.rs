//! API types for the gateway HTTP API.
//!
//! This module defines the request and response bodies for the gateway
//! endpoints. The service runs against a development host, so every request
//! names its caller in `from` and the value it attaches in `value`.

use crate::{DirectOrder, Order, RelayOutcome};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request for relaying an order pre-authorized by the operator's signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrderRequest {
	/// Caller submitting the order.
	pub from: Address,
	/// Value the caller attaches.
	#[serde(default)]
	pub value: U256,
	pub order: Order,
	pub downstream_service: Address,
	pub token_context: Address,
	pub recipient: Address,
	/// Opaque call data for the downstream service.
	pub payload: Bytes,
	/// 65-byte operator signature over the order digest.
	pub signature: Bytes,
}

/// Request for relaying an order submitted by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectOrderRequest {
	pub from: Address,
	#[serde(default)]
	pub value: U256,
	#[serde(flatten)]
	pub order: DirectOrder,
	pub payload: Bytes,
}

/// Request for the digest an operator must sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestRequest {
	pub order: Order,
	pub downstream_service: Address,
	pub token_context: Address,
	pub recipient: Address,
	pub payload: Bytes,
}

/// Response carrying an order digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestResponse {
	pub digest: B256,
	pub domain_separator: B256,
}

/// Response for a committed relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
	pub outcome: RelayOutcome,
}

/// Request body for pause and unpause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRequest {
	pub from: Address,
}

/// Response for pause and unpause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseResponse {
	pub paused: bool,
}

/// Request for an unconditional operator call funded by the treasury.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerialCallRequest {
	pub from: Address,
	pub receiver: Address,
	pub value: U256,
	/// Gas limit hint; zero forwards everything available.
	#[serde(default)]
	pub gas_hint: u64,
	#[serde(default)]
	pub data: Bytes,
}

/// Response for a managerial call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerialCallResponse {
	pub block_number: u64,
}

/// Request for crediting value to the treasury.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonateRequest {
	pub from: Address,
	pub value: U256,
}

/// Response for a donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonateResponse {
	/// Treasury balance after the donation.
	#[serde(with = "u256_serde")]
	pub balance: U256,
}

/// Response for a ledger lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceResponse {
	pub token_context: Address,
	pub recipient: Address,
	/// Next sequence an order for this pairing must carry.
	#[serde(with = "u256_serde")]
	pub sequence: U256,
}

/// Snapshot of the gateway as seen by API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
	pub id: String,
	pub instance: Address,
	pub network_id: u64,
	pub domain_separator: B256,
	pub operator: Address,
	pub paused: bool,
	#[serde(with = "u256_serde")]
	pub treasury: U256,
	pub block_height: u64,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request (400)
	BadRequest { error_type: String, message: String },
	/// Caller lacks authority or the signature is invalid (403)
	Forbidden { error_type: String, message: String },
	/// Request conflicts with current gateway state (409)
	Conflict {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Request is well-formed but its values cannot be honored (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// The downstream call failed (502)
	BadGateway { error_type: String, message: String },
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Forbidden { .. } => 403,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::BadGateway { .. } => 502,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details) = match self {
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Forbidden {
				error_type,
				message,
			}
			| APIError::BadGateway {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type, message, None),
			APIError::Conflict {
				error_type,
				message,
				details,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type, message, details.clone()),
		};
		ErrorResponse {
			error: error.clone(),
			message: message.clone(),
			details,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::BadGateway { message, .. } => write!(f, "Bad Gateway: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}

/// Serde module for U256 as a decimal string.
///
/// Deserialization also accepts `0x`-prefixed hex.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
	use std::str::FromStr;

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str(&s).map_err(D::Error::custom)
	}
}
