//! Gateway engine.
//!
//! The engine owns the committed [`GatewayState`] behind a mutex that is held
//! for the whole of every mutating operation, relay call included, so
//! operations are totally ordered. Each operation mutates a working copy:
//! the copy is persisted before the relay bundle is submitted (the sequence
//! slot is spent before any downstream code runs) and replaces the committed
//! state only once the host has executed the bundle. If the host rejects the
//! bundle the previous snapshot is written back and nothing changes.

pub mod event_bus;

use crate::auth::DigestBuilder;
use crate::binder::bind_value;
use crate::state::{GatewayState, SnapshotStore};
use crate::treasury::ValueSplit;
use crate::validator::OrderValidator;
use crate::GatewayError;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use event_bus::EventBus;
use gateway_config::Config;
use gateway_relay::{RelayError, RelayService};
use gateway_storage::StorageService;
use gateway_types::{
	truncate_id, AdminEvent, AuthorizationMode, DirectOrder, DomainContext, Funding, GatewayEvent,
	MessageContext, Order, OrderEvent, OrderRequest, Parties, RelayCall, RelayOutcome,
	RelayReceipt, TokenStandard, TreasuryEvent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

sol! {
	interface IItemHandoff {
		function transferFrom(address from, address to, uint256 itemId) external;
	}

	interface IUnitHandoff {
		function transfer(address to, uint256 amount) external returns (bool);
	}
}

/// Payment gateway engine.
pub struct GatewayEngine {
	config: Config,
	/// Committed state.
	state: Mutex<GatewayState>,
	digests: DigestBuilder,
	storage: Arc<StorageService>,
	relay: Arc<RelayService>,
	event_bus: EventBus,
}

impl GatewayEngine {
	pub fn new(
		config: Config,
		state: GatewayState,
		storage: Arc<StorageService>,
		relay: Arc<RelayService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			config,
			digests: DigestBuilder::new(state.domain),
			state: Mutex::new(state),
			storage,
			relay,
			event_bus,
		}
	}

	/// Relays an order pre-authorized by an operator signature.
	///
	/// `ctx.value` is the value the payer attaches; it must be at least the
	/// order's portion and at most its total.
	#[instrument(skip_all, fields(
		mode = "signed",
		recipient = %truncate_id(&parties.recipient.to_string()),
		sequence = %order.sequence,
	))]
	pub async fn order_with_signature(
		&self,
		ctx: MessageContext,
		order: Order,
		parties: Parties,
		payload: Bytes,
		signature: Bytes,
	) -> Result<RelayOutcome, GatewayError> {
		let request = OrderRequest {
			order,
			parties,
			payload,
		};
		self.process_order(ctx, AuthorizationMode::Signed(signature), request)
			.await
	}

	/// Relays an order submitted by the operator itself.
	///
	/// Works while paused; consumes the pairing's current sequence slot.
	#[instrument(skip_all, fields(
		mode = "direct",
		recipient = %truncate_id(&order.recipient.to_string()),
	))]
	pub async fn order_without_signature(
		&self,
		ctx: MessageContext,
		order: DirectOrder,
		payload: Bytes,
	) -> Result<RelayOutcome, GatewayError> {
		let request = OrderRequest {
			order: Order {
				sequence: U256::ZERO,
				expiry: U256::ZERO,
				portion: U256::ZERO,
				total: order.total,
				payload_offset: order.payload_offset,
				item_id: order.item_id,
			},
			parties: Parties {
				downstream_service: order.downstream_service,
				token_context: order.token_context,
				recipient: order.recipient,
			},
			payload,
		};
		self.process_order(ctx, AuthorizationMode::DirectOperator, request)
			.await
	}

	async fn process_order(
		&self,
		ctx: MessageContext,
		mode: AuthorizationMode,
		request: OrderRequest,
	) -> Result<RelayOutcome, GatewayError> {
		let kind = mode.kind();
		let parties = request.parties;

		let result = self.relay_order(ctx, mode, request).await;
		if let Err(e) = &result {
			tracing::warn!(mode = %kind, code = e.code(), error = %e, "Order rejected");
			self.event_bus
				.publish(GatewayEvent::Order(OrderEvent::Rejected {
					mode: kind,
					token_context: parties.token_context,
					recipient: parties.recipient,
					code: e.code().to_string(),
					reason: e.to_string(),
				}))
				.ok();
		}
		result
	}

	async fn relay_order(
		&self,
		ctx: MessageContext,
		mode: AuthorizationMode,
		request: OrderRequest,
	) -> Result<RelayOutcome, GatewayError> {
		let mut state = self.state.lock().await;
		let height = self.block_height().await?;
		let mut working = state.clone();

		let auth = OrderValidator::new(&self.digests, height).validate(
			&mut working,
			&mode,
			&request,
			&ctx.sender,
		)?;

		let split = working
			.treasury
			.split(ctx.value, auth.minimum, request.order.total)?;
		working.treasury.apply(&split)?;

		let data = bind_value(&request.payload, request.order.payload_offset, split.total)?;
		let standard = self.token_standard(&request.parties.token_context).await?;
		let calls = self.order_bundle(&ctx, &request, &split, data, standard);
		let receipt = self.commit(&mut state, working, &calls).await?;

		let outcome = RelayOutcome {
			mode: auth.mode,
			sequence: auth.sequence,
			total: split.total,
			attached: split.attached,
			drawn: split.drawn,
			digest: auth.digest,
			block_number: receipt.block_number,
		};

		tracing::info!(
			mode = %outcome.mode,
			sequence = %outcome.sequence,
			total = %outcome.total,
			drawn = %outcome.drawn,
			block = outcome.block_number,
			"Order relayed"
		);
		self.event_bus
			.publish(GatewayEvent::Order(OrderEvent::Relayed {
				token_context: request.parties.token_context,
				recipient: request.parties.recipient,
				downstream_service: request.parties.downstream_service,
				outcome: outcome.clone(),
			}))
			.ok();

		Ok(outcome)
	}

	/// Token interface of an order's token context; `None` for the zero
	/// address and for contexts the host reports no standard for.
	async fn token_standard(
		&self,
		token_context: &Address,
	) -> Result<Option<TokenStandard>, GatewayError> {
		if token_context.is_zero() {
			return Ok(None);
		}
		self.relay
			.token_standard(token_context)
			.await
			.map_err(|e| GatewayError::Relay(e.to_string()))
	}

	/// Builds the downstream call followed by the handoff of the purchased
	/// goods to the recipient.
	///
	/// Unique items move with `transferFrom(instance, recipient, itemId)`;
	/// fungible units move with `transfer(recipient, total)`, the units the
	/// relayed value bought. Without a token standard nothing is handed off.
	fn order_bundle(
		&self,
		ctx: &MessageContext,
		request: &OrderRequest,
		split: &ValueSplit,
		data: Bytes,
		standard: Option<TokenStandard>,
	) -> Vec<RelayCall> {
		let instance = self.digests.domain().instance;
		let parties = &request.parties;

		let mut calls = vec![RelayCall {
			from: instance,
			target: parties.downstream_service,
			value: split.total,
			gas_limit: None,
			data,
			funding: Funding {
				payer: ctx.sender,
				attached: split.attached,
				treasury: split.drawn,
			},
		}];

		let handoff = match standard {
			Some(TokenStandard::UniqueItem) => IItemHandoff::transferFromCall {
				from: instance,
				to: parties.recipient,
				itemId: request.order.item_id,
			}
			.abi_encode(),
			Some(TokenStandard::FungibleUnit) => IUnitHandoff::transferCall {
				to: parties.recipient,
				amount: split.total,
			}
			.abi_encode(),
			None => return calls,
		};
		calls.push(RelayCall {
			from: instance,
			target: parties.token_context,
			value: U256::ZERO,
			gas_limit: None,
			data: handoff.into(),
			funding: Funding::none(),
		});

		calls
	}

	/// Unconditional operator relay paid from the treasury.
	///
	/// Bypasses the order pipeline and the pause flag. A `gas_hint` of zero
	/// means no limit; a non-zero hint is passed to the host, which may not
	/// meter it. The instance itself is not a valid target: the value would
	/// leave the treasury without leaving the instance.
	#[instrument(skip_all, fields(target = %target, value = %value))]
	pub async fn managerial_call(
		&self,
		ctx: MessageContext,
		target: Address,
		value: U256,
		gas_hint: u64,
		payload: Bytes,
	) -> Result<RelayReceipt, GatewayError> {
		let mut state = self.state.lock().await;
		state.require_operator(&ctx.sender)?;
		if target == state.domain.instance {
			return Err(GatewayError::SelfCall { target });
		}

		let mut working = state.clone();
		working.treasury.debit(value)?;

		let call = RelayCall {
			from: working.domain.instance,
			target,
			value,
			gas_limit: (gas_hint > 0).then_some(gas_hint),
			data: payload,
			funding: Funding::from_treasury(value),
		};
		let receipt = self.commit(&mut state, working, &[call]).await?;

		tracing::info!(%target, %value, block = receipt.block_number, "Managerial call executed");
		self.event_bus
			.publish(GatewayEvent::Admin(AdminEvent::ManagerialCall {
				target,
				value,
				block_number: receipt.block_number,
			}))
			.ok();

		Ok(receipt)
	}

	/// Stops the signed order path.
	pub async fn pause(&self, ctx: MessageContext) -> Result<(), GatewayError> {
		self.set_paused(ctx, true).await
	}

	/// Resumes the signed order path.
	pub async fn unpause(&self, ctx: MessageContext) -> Result<(), GatewayError> {
		self.set_paused(ctx, false).await
	}

	async fn set_paused(&self, ctx: MessageContext, paused: bool) -> Result<(), GatewayError> {
		let mut state = self.state.lock().await;
		state.require_operator(&ctx.sender)?;
		match (state.paused, paused) {
			(true, true) => return Err(GatewayError::Paused),
			(false, false) => return Err(GatewayError::NotPaused),
			_ => {},
		}

		let mut working = state.clone();
		working.paused = paused;
		self.persist(&mut state, working).await?;

		let event = if paused {
			AdminEvent::Paused { by: ctx.sender }
		} else {
			AdminEvent::Unpaused { by: ctx.sender }
		};
		tracing::info!(paused, by = %ctx.sender, "Pause state changed");
		self.event_bus.publish(GatewayEvent::Admin(event)).ok();
		Ok(())
	}

	/// Adds the attached value to the treasury. Anyone may donate while the
	/// gateway is unpaused. Returns the new treasury balance.
	#[instrument(skip_all, fields(from = %ctx.sender, amount = %ctx.value))]
	pub async fn donate(&self, ctx: MessageContext) -> Result<U256, GatewayError> {
		let mut state = self.state.lock().await;
		state.require_unpaused()?;

		let mut working = state.clone();
		working.treasury.credit(ctx.value)?;
		let balance = working.treasury.balance();

		let instance = working.domain.instance;
		let transfer = RelayCall {
			from: instance,
			target: instance,
			value: ctx.value,
			gas_limit: None,
			data: Bytes::new(),
			funding: Funding {
				payer: ctx.sender,
				attached: ctx.value,
				treasury: U256::ZERO,
			},
		};
		self.commit(&mut state, working, &[transfer]).await?;

		tracing::info!(from = %ctx.sender, amount = %ctx.value, %balance, "Donation received");
		self.event_bus
			.publish(GatewayEvent::Treasury(TreasuryEvent::Donated {
				from: ctx.sender,
				amount: ctx.value,
				balance,
			}))
			.ok();

		Ok(balance)
	}

	/// Persists `working`, submits the bundle and commits on success.
	async fn commit(
		&self,
		committed: &mut GatewayState,
		working: GatewayState,
		calls: &[RelayCall],
	) -> Result<RelayReceipt, GatewayError> {
		let snapshots = SnapshotStore::new(&self.storage, &working.domain.instance);
		snapshots.save(&working).await?;

		match self.relay.execute(calls).await {
			Ok(receipt) => {
				*committed = working;
				Ok(receipt)
			},
			Err(e) => {
				if let Err(restore) = snapshots.save(committed).await {
					tracing::error!(error = %restore, "Failed to restore gateway state snapshot");
				}
				Err(downstream_failure(e))
			},
		}
	}

	/// Persists and commits a state change that involves no relay.
	async fn persist(
		&self,
		committed: &mut GatewayState,
		working: GatewayState,
	) -> Result<(), GatewayError> {
		SnapshotStore::new(&self.storage, &working.domain.instance)
			.save(&working)
			.await?;
		*committed = working;
		Ok(())
	}

	/// Next sequence slot for a pairing.
	pub async fn sequence_of(&self, token_context: &Address, recipient: &Address) -> U256 {
		self.state.lock().await.ledger.current(token_context, recipient)
	}

	pub async fn is_paused(&self) -> bool {
		self.state.lock().await.paused
	}

	pub async fn operator(&self) -> Address {
		self.state.lock().await.operator
	}

	pub async fn treasury_balance(&self) -> U256 {
		self.state.lock().await.treasury.balance()
	}

	pub fn domain(&self) -> &DomainContext {
		self.digests.domain()
	}

	/// Digest the operator has to sign for this order.
	pub fn digest_for(&self, order: &Order, parties: &Parties, payload: &[u8]) -> B256 {
		self.digests.digest(order, parties, payload)
	}

	pub async fn block_height(&self) -> Result<u64, GatewayError> {
		self.relay
			.block_height()
			.await
			.map_err(|e| GatewayError::Relay(e.to_string()))
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
}

fn downstream_failure(e: RelayError) -> GatewayError {
	match e {
		RelayError::Configuration(msg) => GatewayError::Relay(msg),
		other => GatewayError::DownstreamCallFailure(other.to_string()),
	}
}
