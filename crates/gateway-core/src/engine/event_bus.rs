//! Broadcast channel for gateway events.
//!
//! Every subscriber sees every event published after it subscribed. Slow
//! subscribers that fall more than `capacity` events behind lose the oldest
//! ones and observe a lag error on their next receive.

use gateway_types::GatewayEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event; fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: GatewayEvent,
	) -> Result<usize, broadcast::error::SendError<GatewayEvent>> {
		self.sender.send(event)
	}
}
