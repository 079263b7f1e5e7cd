//! Read-only endpoints.

use alloy_primitives::Address;
use gateway_core::{GatewayEngine, GatewayError};
use gateway_types::{SequenceResponse, StatusResponse};

pub async fn get_status(engine: &GatewayEngine) -> Result<StatusResponse, GatewayError> {
	let domain = engine.domain();
	Ok(StatusResponse {
		id: engine.config().gateway.id.clone(),
		instance: domain.instance,
		network_id: domain.network_id,
		domain_separator: domain.separator,
		operator: engine.operator().await,
		paused: engine.is_paused().await,
		treasury: engine.treasury_balance().await,
		block_height: engine.block_height().await?,
	})
}

pub async fn get_sequence(
	token_context: Address,
	recipient: Address,
	engine: &GatewayEngine,
) -> SequenceResponse {
	SequenceResponse {
		token_context,
		recipient,
		sequence: engine.sequence_of(&token_context, &recipient).await,
	}
}
