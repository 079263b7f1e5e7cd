//! Order validation.
//!
//! An order enters as `Pending` and ends `Authorized` or `Rejected`. Both
//! entry paths go through [`OrderValidator::validate`], parameterized by the
//! [`AuthorizationMode`]:
//!
//! - signed: not paused, `height < expiry`, sequence equals the ledger
//!   counter, signature recovers to the operator; checked in that order and
//!   the first failure is the rejection reason.
//! - direct: the caller is the operator. Pause, expiry and signature do not
//!   apply, and the current slot of the pairing is consumed whatever the
//!   order says.
//!
//! Authorization consumes the sequence slot in the working state handed in.

use crate::auth::{DigestBuilder, SignatureVerifier};
use crate::state::GatewayState;
use crate::GatewayError;
use alloy_primitives::{Address, B256, U256};
use gateway_types::{AuthorizationKind, AuthorizationMode, OrderRequest, OrderStatus};

/// What an authorized order is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
	pub mode: AuthorizationKind,
	/// Consumed ledger slot.
	pub sequence: U256,
	/// Least value the caller must attach.
	pub minimum: U256,
	/// Digest the signature was checked against (signed path only).
	pub digest: Option<B256>,
}

/// Runs the checks for one order.
pub struct OrderValidator<'a> {
	digests: &'a DigestBuilder,
	height: u64,
	status: OrderStatus,
}

impl<'a> OrderValidator<'a> {
	/// `height` is the host block height the order is checked against.
	pub fn new(digests: &'a DigestBuilder, height: u64) -> Self {
		Self {
			digests,
			height,
			status: OrderStatus::Pending,
		}
	}

	pub fn status(&self) -> &OrderStatus {
		&self.status
	}

	/// Validates the order and, on success, consumes its sequence slot in
	/// `state`. On failure `state` is left untouched.
	pub fn validate(
		mut self,
		state: &mut GatewayState,
		mode: &AuthorizationMode,
		request: &OrderRequest,
		caller: &Address,
	) -> Result<Authorization, GatewayError> {
		let result = match mode {
			AuthorizationMode::Signed(signature) => self.check_signed(state, request, signature),
			AuthorizationMode::DirectOperator => self.check_direct(state, request, caller),
		};

		match &result {
			Ok(_) => self.transition(OrderStatus::Authorized),
			Err(e) => self.transition(OrderStatus::Rejected(e.code().to_string())),
		}
		result
	}

	fn check_signed(
		&self,
		state: &mut GatewayState,
		request: &OrderRequest,
		signature: &[u8],
	) -> Result<Authorization, GatewayError> {
		let order = &request.order;
		let parties = &request.parties;

		state.require_unpaused()?;

		if U256::from(self.height) >= order.expiry {
			return Err(GatewayError::Expired {
				height: self.height,
				expiry: order.expiry,
			});
		}

		let expected = state
			.ledger
			.current(&parties.token_context, &parties.recipient);
		if order.sequence != expected {
			return Err(GatewayError::SequenceMismatch {
				expected,
				provided: order.sequence,
			});
		}

		let digest = self.digests.digest(order, parties, &request.payload);
		SignatureVerifier::new(state.operator).verify(&digest, signature)?;

		let sequence =
			state
				.ledger
				.consume(&parties.token_context, &parties.recipient, order.sequence)?;

		Ok(Authorization {
			mode: AuthorizationKind::Signed,
			sequence,
			minimum: order.portion,
			digest: Some(digest),
		})
	}

	fn check_direct(
		&self,
		state: &mut GatewayState,
		request: &OrderRequest,
		caller: &Address,
	) -> Result<Authorization, GatewayError> {
		state.require_operator(caller)?;

		let parties = &request.parties;
		let sequence = state
			.ledger
			.consume_next(&parties.token_context, &parties.recipient)?;

		Ok(Authorization {
			mode: AuthorizationKind::DirectOperator,
			sequence,
			minimum: U256::ZERO,
			digest: None,
		})
	}

	fn transition(&mut self, to: OrderStatus) {
		debug_assert!(
			!self.status.is_terminal(),
			"order already left Pending ({})",
			self.status
		);
		tracing::debug!(from = %self.status, to = %to, "Order status transition");
		self.status = to;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, Bytes};
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use gateway_types::{DomainContext, Order, Parties};

	const INSTANCE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
	const SHOP: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");
	const BUYER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

	struct Fixture {
		operator: PrivateKeySigner,
		digests: DigestBuilder,
		state: GatewayState,
	}

	impl Fixture {
		fn new() -> Self {
			let operator = PrivateKeySigner::random();
			let domain = DomainContext::new(31337, INSTANCE);
			Self {
				state: GatewayState::new(operator.address(), domain, false),
				digests: DigestBuilder::new(domain),
				operator,
			}
		}

		fn request(&self, sequence: u64, expiry: u64) -> OrderRequest {
			OrderRequest {
				order: Order {
					sequence: U256::from(sequence),
					expiry: U256::from(expiry),
					portion: U256::from(10),
					total: U256::from(242),
					payload_offset: U256::from(4),
					item_id: U256::ZERO,
				},
				parties: Parties {
					downstream_service: SHOP,
					token_context: SHOP,
					recipient: BUYER,
				},
				payload: Bytes::from(vec![0u8; 36]),
			}
		}

		fn sign(&self, request: &OrderRequest) -> AuthorizationMode {
			let digest = self
				.digests
				.digest(&request.order, &request.parties, &request.payload);
			let signature = self.operator.sign_hash_sync(&digest).unwrap();
			AuthorizationMode::Signed(Bytes::from(signature.as_bytes().to_vec()))
		}
	}

	#[test]
	fn test_signed_order_authorized() {
		let mut fx = Fixture::new();
		let request = fx.request(0, 100);
		let mode = fx.sign(&request);

		let auth = OrderValidator::new(&fx.digests, 50)
			.validate(&mut fx.state, &mode, &request, &BUYER)
			.unwrap();

		assert_eq!(auth.mode, AuthorizationKind::Signed);
		assert_eq!(auth.sequence, U256::ZERO);
		assert_eq!(auth.minimum, U256::from(10));
		assert!(auth.digest.is_some());
		assert_eq!(fx.state.ledger.current(&SHOP, &BUYER), U256::from(1));
	}

	#[test]
	fn test_expiry_is_exclusive() {
		let mut fx = Fixture::new();
		let request = fx.request(0, 100);
		let mode = fx.sign(&request);

		assert!(matches!(
			OrderValidator::new(&fx.digests, 100).validate(&mut fx.state, &mode, &request, &BUYER),
			Err(GatewayError::Expired { height: 100, .. })
		));
		assert!(OrderValidator::new(&fx.digests, 99)
			.validate(&mut fx.state, &mode, &request, &BUYER)
			.is_ok());
	}

	#[test]
	fn test_pause_checked_before_everything() {
		let mut fx = Fixture::new();
		fx.state.paused = true;
		// Expired, wrong sequence and unsigned all at once.
		let request = fx.request(5, 1);
		let mode = AuthorizationMode::Signed(Bytes::from(vec![0u8; 65]));

		assert!(matches!(
			OrderValidator::new(&fx.digests, 10).validate(&mut fx.state, &mode, &request, &BUYER),
			Err(GatewayError::Paused)
		));
	}

	#[test]
	fn test_sequence_checked_before_signature() {
		let mut fx = Fixture::new();
		let request = fx.request(1, 100);
		let mode = AuthorizationMode::Signed(Bytes::from(vec![0u8; 65]));

		assert!(matches!(
			OrderValidator::new(&fx.digests, 10).validate(&mut fx.state, &mode, &request, &BUYER),
			Err(GatewayError::SequenceMismatch { .. })
		));
	}

	#[test]
	fn test_rejection_leaves_ledger_untouched() {
		let mut fx = Fixture::new();
		let request = fx.request(0, 100);
		let mode = fx.sign(&request);

		let mut tampered = request.clone();
		tampered.order.total = U256::from(1);

		let before = fx.state.clone();
		let result = OrderValidator::new(&fx.digests, 10).validate(
			&mut fx.state,
			&mode,
			&tampered,
			&BUYER,
		);
		assert!(matches!(result, Err(GatewayError::InvalidSignature(_))));
		assert_eq!(fx.state, before);
	}

	#[test]
	fn test_direct_path_requires_operator_only() {
		let mut fx = Fixture::new();
		fx.state.paused = true;
		let operator = fx.operator.address();
		// Expired and with a stale sequence; neither applies to the direct path.
		let request = fx.request(9, 0);

		assert!(matches!(
			OrderValidator::new(&fx.digests, 10).validate(
				&mut fx.state,
				&AuthorizationMode::DirectOperator,
				&request,
				&BUYER
			),
			Err(GatewayError::Unauthorized { .. })
		));

		let auth = OrderValidator::new(&fx.digests, 10)
			.validate(
				&mut fx.state,
				&AuthorizationMode::DirectOperator,
				&request,
				&operator,
			)
			.unwrap();
		assert_eq!(auth.sequence, U256::ZERO);
		assert_eq!(auth.minimum, U256::ZERO);
		assert_eq!(fx.state.ledger.current(&SHOP, &BUYER), U256::from(1));
	}
}
