//! HTTP server for the gateway API.
//!
//! Every engine entry point and read accessor is exposed as JSON under
//! `/api`. Callers name themselves in the request body (`from`), which the
//! development host trusts the way a local chain trusts unlocked accounts.

use crate::apis::{self, to_api_error};
use alloy_primitives::Address;
use axum::{
	extract::{DefaultBodyLimit, Path, State},
	response::Json,
	routing::{get, post},
	Router,
};
use gateway_config::ApiConfig;
use gateway_core::GatewayEngine;
use gateway_types::{
	APIError, AdminRequest, DigestRequest, DigestResponse, DirectOrderRequest, DonateRequest,
	DonateResponse, ManagerialCallRequest, ManagerialCallResponse, PauseResponse, RelayResponse,
	SequenceResponse, SignedOrderRequest, StatusResponse,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the gateway engine for processing requests.
	pub engine: Arc<GatewayEngine>,
}

/// Builds the API router.
pub fn router(engine: Arc<GatewayEngine>, max_request_size: usize) -> Router {
	let app_state = AppState { engine };

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders/signed", post(handle_signed_order))
				.route("/orders/direct", post(handle_direct_order))
				.route("/orders/digest", post(handle_digest))
				.route("/admin/pause", post(handle_pause))
				.route("/admin/unpause", post(handle_unpause))
				.route("/admin/call", post(handle_managerial_call))
				.route("/donate", post(handle_donate))
				.route(
					"/sequences/{token_context}/{recipient}",
					get(handle_get_sequence),
				)
				.route("/status", get(handle_status)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(DefaultBodyLimit::max(max_request_size))
				.layer(CorsLayer::permissive()),
		)
		.with_state(app_state)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<GatewayEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, api_config.max_request_size);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Gateway API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles POST /api/orders/signed requests.
async fn handle_signed_order(
	State(state): State<AppState>,
	Json(request): Json<SignedOrderRequest>,
) -> Result<Json<RelayResponse>, APIError> {
	match apis::orders::process_signed_order(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Signed order failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

/// Handles POST /api/orders/direct requests.
async fn handle_direct_order(
	State(state): State<AppState>,
	Json(request): Json<DirectOrderRequest>,
) -> Result<Json<RelayResponse>, APIError> {
	match apis::orders::process_direct_order(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Direct order failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

/// Handles POST /api/orders/digest requests.
async fn handle_digest(
	State(state): State<AppState>,
	Json(request): Json<DigestRequest>,
) -> Json<DigestResponse> {
	Json(apis::orders::compute_digest(&request, &state.engine))
}

/// Handles POST /api/admin/pause requests.
async fn handle_pause(
	State(state): State<AppState>,
	Json(request): Json<AdminRequest>,
) -> Result<Json<PauseResponse>, APIError> {
	match apis::admin::pause(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Pause failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

/// Handles POST /api/admin/unpause requests.
async fn handle_unpause(
	State(state): State<AppState>,
	Json(request): Json<AdminRequest>,
) -> Result<Json<PauseResponse>, APIError> {
	match apis::admin::unpause(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Unpause failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

/// Handles POST /api/admin/call requests.
async fn handle_managerial_call(
	State(state): State<AppState>,
	Json(request): Json<ManagerialCallRequest>,
) -> Result<Json<ManagerialCallResponse>, APIError> {
	match apis::admin::managerial_call(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Managerial call failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

/// Handles POST /api/donate requests.
async fn handle_donate(
	State(state): State<AppState>,
	Json(request): Json<DonateRequest>,
) -> Result<Json<DonateResponse>, APIError> {
	match apis::admin::donate(request, &state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Donation failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

/// Handles GET /api/sequences/{token_context}/{recipient} requests.
async fn handle_get_sequence(
	Path((token_context, recipient)): Path<(String, String)>,
	State(state): State<AppState>,
) -> Result<Json<SequenceResponse>, APIError> {
	let token_context = parse_address("token_context", &token_context)?;
	let recipient = parse_address("recipient", &recipient)?;
	Ok(Json(
		apis::status::get_sequence(token_context, recipient, &state.engine).await,
	))
}

/// Handles GET /api/status requests.
async fn handle_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, APIError> {
	match apis::status::get_status(&state.engine).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Status request failed: {}", e);
			Err(to_api_error(e))
		},
	}
}

fn parse_address(field: &str, raw: &str) -> Result<Address, APIError> {
	Address::from_str(raw).map_err(|e| APIError::BadRequest {
		error_type: "INVALID_ADDRESS".to_string(),
		message: format!("Invalid {} '{}': {}", field, raw, e),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, Bytes, U256};
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use alloy_sol_types::SolCall;
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use gateway_config::Config;
	use gateway_relay::implementations::shops::IUniqueItemShop;
	use gateway_types::{MessageContext, Order, Parties};
	use serde_json::Value;
	use tower::ServiceExt;

	const OPERATOR_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const OPERATOR: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const SHOP: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
	const BUYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

	const CONFIG: &str = r#"
[gateway]
id = "api-test"
network_id = 31337
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
operator = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"

[storage]
primary = "memory"
[storage.implementations.memory]

[relay]
primary = "memory"
[relay.implementations.memory]
initial_height = 1

[[relay.implementations.memory.accounts]]
address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
balance = 1000

[[relay.implementations.memory.shops]]
kind = "unique_item"
address = "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512"
seller = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
items = [{ owner = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266", price = 242 }]
"#;

	async fn app() -> (Router, Arc<GatewayEngine>) {
		let config: Config = CONFIG.parse().unwrap();
		let engine = Arc::new(crate::build_gateway(config).await.unwrap());
		(router(engine.clone(), 1024 * 1024), engine)
	}

	async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
		let request = Request::builder()
			.method(method)
			.uri(uri)
			.header("content-type", "application/json");
		let request = match body {
			Some(json) => request.body(Body::from(json.to_string())).unwrap(),
			None => request.body(Body::empty()).unwrap(),
		};

		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let json = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, json)
	}

	fn purchase_request(engine: &GatewayEngine, value: u64) -> SignedOrderRequest {
		let mut payload = IUniqueItemShop::transferOwnershipOnPurchaseCall {
			itemId: U256::ZERO,
		}
		.abi_encode();
		payload.extend_from_slice(&[0u8; 32]);
		let payload = Bytes::from(payload);

		let order = Order {
			sequence: U256::ZERO,
			expiry: U256::from(100),
			portion: U256::ZERO,
			total: U256::from(242),
			payload_offset: U256::from(36),
			item_id: U256::ZERO,
		};
		let parties = Parties {
			downstream_service: SHOP,
			token_context: SHOP,
			recipient: BUYER,
		};

		let operator: PrivateKeySigner = OPERATOR_KEY.parse().unwrap();
		let digest = engine.digest_for(&order, &parties, &payload);
		let signature = operator.sign_hash_sync(&digest).unwrap();

		SignedOrderRequest {
			from: BUYER,
			value: U256::from(value),
			order,
			downstream_service: SHOP,
			token_context: SHOP,
			recipient: BUYER,
			payload,
			signature: Bytes::from(signature.as_bytes().to_vec()),
		}
	}

	#[tokio::test]
	async fn test_status_reports_fresh_instance() {
		let (app, _) = app().await;
		let (status, body) = send(&app, "GET", "/api/status", None).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["id"], "api-test");
		assert_eq!(body["paused"], true);
		assert_eq!(body["treasury"], "0");
		assert_eq!(body["blockHeight"], 1);
	}

	#[tokio::test]
	async fn test_signed_order_flow() {
		let (app, engine) = app().await;
		let request = serde_json::to_value(purchase_request(&engine, 242)).unwrap();

		// Paused on startup.
		let (status, body) = send(&app, "POST", "/api/orders/signed", Some(request.clone())).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "PAUSED");

		let unpause = serde_json::json!({ "from": OPERATOR });
		let (status, body) = send(&app, "POST", "/api/admin/unpause", Some(unpause)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["paused"], false);

		let (status, body) = send(&app, "POST", "/api/orders/signed", Some(request.clone())).await;
		assert_eq!(status, StatusCode::OK, "{}", body);
		assert_eq!(body["outcome"]["mode"], "signed");

		let uri = format!("/api/sequences/{}/{}", SHOP, BUYER);
		let (status, body) = send(&app, "GET", &uri, None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["sequence"], "1");

		let (status, body) = send(&app, "POST", "/api/orders/signed", Some(request)).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "SEQUENCE_MISMATCH");
	}

	#[tokio::test]
	async fn test_unauthorized_admin_call_is_forbidden() {
		let (app, _) = app().await;
		let request = serde_json::json!({ "from": BUYER });
		let (status, body) = send(&app, "POST", "/api/admin/unpause", Some(request)).await;

		assert_eq!(status, StatusCode::FORBIDDEN);
		assert_eq!(body["error"], "UNAUTHORIZED");
	}

	#[tokio::test]
	async fn test_underfunded_order_is_unprocessable() {
		let (app, engine) = app().await;
		engine
			.unpause(MessageContext::call(OPERATOR))
			.await
			.unwrap();

		let request = serde_json::to_value(purchase_request(&engine, 241)).unwrap();
		let (status, body) = send(&app, "POST", "/api/orders/signed", Some(request)).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "INSUFFICIENT_TREASURY");
	}

	#[tokio::test]
	async fn test_digest_endpoint_matches_engine() {
		let (app, engine) = app().await;
		let signed = purchase_request(&engine, 242);
		let request = serde_json::to_value(DigestRequest {
			order: signed.order.clone(),
			downstream_service: signed.downstream_service,
			token_context: signed.token_context,
			recipient: signed.recipient,
			payload: signed.payload.clone(),
		})
		.unwrap();

		let (status, body) = send(&app, "POST", "/api/orders/digest", Some(request)).await;
		assert_eq!(status, StatusCode::OK);

		let parties = Parties {
			downstream_service: SHOP,
			token_context: SHOP,
			recipient: BUYER,
		};
		let expected = engine.digest_for(&signed.order, &parties, &signed.payload);
		assert_eq!(body["digest"], expected.to_string());
	}

	#[tokio::test]
	async fn test_invalid_sequence_path_is_bad_request() {
		let (app, _) = app().await;
		let uri = format!("/api/sequences/not-an-address/{}", BUYER);
		let (status, body) = send(&app, "GET", &uri, None).await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_ADDRESS");
	}
}
