//! Order submission endpoints.
//!
//! Signed orders come from any payer holding an operator signature; direct
//! orders are accepted only from the operator. The digest endpoint returns
//! exactly what the operator has to sign for a given order.

use gateway_core::{GatewayEngine, GatewayError};
use gateway_types::{
	DigestRequest, DigestResponse, DirectOrderRequest, MessageContext, Parties, RelayResponse,
	SignedOrderRequest,
};

pub async fn process_signed_order(
	request: SignedOrderRequest,
	engine: &GatewayEngine,
) -> Result<RelayResponse, GatewayError> {
	let parties = Parties {
		downstream_service: request.downstream_service,
		token_context: request.token_context,
		recipient: request.recipient,
	};
	let outcome = engine
		.order_with_signature(
			MessageContext::new(request.from, request.value),
			request.order,
			parties,
			request.payload,
			request.signature,
		)
		.await?;
	Ok(RelayResponse { outcome })
}

pub async fn process_direct_order(
	request: DirectOrderRequest,
	engine: &GatewayEngine,
) -> Result<RelayResponse, GatewayError> {
	let outcome = engine
		.order_without_signature(
			MessageContext::new(request.from, request.value),
			request.order,
			request.payload,
		)
		.await?;
	Ok(RelayResponse { outcome })
}

pub fn compute_digest(request: &DigestRequest, engine: &GatewayEngine) -> DigestResponse {
	let parties = Parties {
		downstream_service: request.downstream_service,
		token_context: request.token_context,
		recipient: request.recipient,
	};
	DigestResponse {
		digest: engine.digest_for(&request.order, &parties, &request.payload),
		domain_separator: engine.domain().separator,
	}
}
