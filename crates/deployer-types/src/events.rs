use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
	Address, ConfirmationResult, DeploymentRecord, InteractionReport, TransactionHash,
	VerificationOutcome,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeployerEvent {
	Delivery(DeliveryEvent),
	Deployment(DeploymentEvent),
	Verification(VerificationEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeliveryEvent {
	TransactionSubmitted {
		hash: TransactionHash,
	},
	TransactionConfirmed {
		hash: TransactionHash,
		confirmations: u64,
		block_number: u64,
	},
	TransactionFailed {
		hash: TransactionHash,
		result: ConfirmationResult,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeploymentEvent {
	Completed {
		record: DeploymentRecord,
	},
	InteractionChecked {
		contract_address: Address,
		report: InteractionReport,
	},
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VerificationEvent {
	Completed {
		contract_address: Address,
		outcome: VerificationOutcome,
	},
}

/// Broadcast bus carrying deployment lifecycle events.
///
/// Subscribers only ever observe an event after the stage it describes has
/// reached finality; stages publish on completion, never on entry.
pub struct EventBus {
	sender: broadcast::Sender<DeployerEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<DeployerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// A send with no active subscribers is not an error here; scripts run
	/// without listeners attached.
	pub fn publish(&self, event: DeployerEvent) {
		let _ = self.sender.send(event);
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
