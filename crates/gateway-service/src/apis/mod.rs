//! Request processing for the gateway HTTP API.
//!
//! Handlers in [`crate::server`] decode the request, call into these modules
//! and convert engine errors with [`to_api_error`].

pub mod admin;
pub mod orders;
pub mod status;

use gateway_core::GatewayError;
use gateway_types::APIError;

/// Maps an engine error to its HTTP representation.
///
/// 403 for the unauthorized class, 409 for conflicts with the current
/// gateway state, 422 for value, expiry and binding errors, 502 when the
/// downstream call failed and 500 for everything else.
pub fn to_api_error(e: GatewayError) -> APIError {
	let error_type = e.code().to_string();
	let message = e.to_string();

	match e {
		GatewayError::Unauthorized { .. } | GatewayError::InvalidSignature(_) => {
			APIError::Forbidden {
				error_type,
				message,
			}
		},
		GatewayError::SequenceMismatch { expected, provided } => APIError::Conflict {
			error_type,
			message,
			details: Some(serde_json::json!({
				"expected": expected.to_string(),
				"provided": provided.to_string(),
			})),
		},
		GatewayError::Paused | GatewayError::NotPaused => APIError::Conflict {
			error_type,
			message,
			details: None,
		},
		GatewayError::Expired { height, expiry } => APIError::UnprocessableEntity {
			error_type,
			message,
			details: Some(serde_json::json!({
				"blockHeight": height,
				"expiry": expiry.to_string(),
			})),
		},
		GatewayError::InsufficientValue { .. }
		| GatewayError::InsufficientTreasury { .. }
		| GatewayError::ExcessValue { .. }
		| GatewayError::PayloadBindingOutOfRange { .. }
		| GatewayError::SelfCall { .. } => APIError::UnprocessableEntity {
			error_type,
			message,
			details: None,
		},
		GatewayError::DownstreamCallFailure(_) => APIError::BadGateway {
			error_type,
			message,
		},
		GatewayError::Relay(_)
		| GatewayError::Storage(_)
		| GatewayError::SequenceExhausted
		| GatewayError::ArithmeticOverflow(_) => APIError::InternalServerError {
			error_type,
			message,
		},
	}
}
