//! Administrative endpoints and donations.

use gateway_core::{GatewayEngine, GatewayError};
use gateway_types::{
	AdminRequest, DonateRequest, DonateResponse, ManagerialCallRequest, ManagerialCallResponse,
	MessageContext, PauseResponse,
};

pub async fn pause(
	request: AdminRequest,
	engine: &GatewayEngine,
) -> Result<PauseResponse, GatewayError> {
	engine.pause(MessageContext::call(request.from)).await?;
	Ok(PauseResponse { paused: true })
}

pub async fn unpause(
	request: AdminRequest,
	engine: &GatewayEngine,
) -> Result<PauseResponse, GatewayError> {
	engine.unpause(MessageContext::call(request.from)).await?;
	Ok(PauseResponse { paused: false })
}

pub async fn managerial_call(
	request: ManagerialCallRequest,
	engine: &GatewayEngine,
) -> Result<ManagerialCallResponse, GatewayError> {
	let receipt = engine
		.managerial_call(
			MessageContext::call(request.from),
			request.receiver,
			request.value,
			request.gas_hint,
			request.data,
		)
		.await?;
	Ok(ManagerialCallResponse {
		block_number: receipt.block_number,
	})
}

pub async fn donate(
	request: DonateRequest,
	engine: &GatewayEngine,
) -> Result<DonateResponse, GatewayError> {
	let balance = engine
		.donate(MessageContext::new(request.from, request.value))
		.await?;
	Ok(DonateResponse { balance })
}
