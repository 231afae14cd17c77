//! Transaction tracking for UI state synchronization.
//!
//! Correlates a submitted transaction hash with its future confirmation and
//! resolves interested parties exactly once. The event-listener callback
//! style this replaces is modeled as a single-resolution future: a
//! subscription is a oneshot channel held in a map, removed before the send,
//! so a duplicate mined event can never fire a consumer twice. Dropping the
//! subscription (UI teardown) discards it without any callback running.

use async_trait::async_trait;
use dashmap::DashMap;
use deployer_delivery::DeliveryService;
use deployer_types::{ConfirmationResult, TransactionHandle, TransactionHash};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TrackerError {
	/// A hash may have at most one live subscription; registering a second
	/// one is a caller bug, not a runtime condition.
	#[error("Already tracking transaction {0}")]
	AlreadyTracking(TransactionHash),
}

/// Pending confirmation of one tracked transaction.
///
/// Yields the result exactly once, or `None` if the subscription was
/// cancelled before resolution.
#[derive(Debug)]
pub struct PendingConfirmation {
	receiver: oneshot::Receiver<ConfirmationResult>,
}

impl PendingConfirmation {
	pub async fn wait(self) -> Option<ConfirmationResult> {
		self.receiver.await.ok()
	}
}

/// Registry of live transaction subscriptions.
#[derive(Default)]
pub struct TrackerService {
	subscriptions: DashMap<TransactionHash, oneshot::Sender<ConfirmationResult>>,
}

impl TrackerService {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a subscription for `hash`.
	///
	/// Registration never blocks; the caller continues immediately and
	/// awaits the returned future whenever it chooses.
	pub fn track(&self, hash: TransactionHash) -> Result<PendingConfirmation, TrackerError> {
		match self.subscriptions.entry(hash.clone()) {
			dashmap::mapref::entry::Entry::Occupied(_) => {
				Err(TrackerError::AlreadyTracking(hash))
			}
			dashmap::mapref::entry::Entry::Vacant(entry) => {
				let (sender, receiver) = oneshot::channel();
				entry.insert(sender);
				debug!(tx_hash = %hash, "Tracking transaction");
				Ok(PendingConfirmation { receiver })
			}
		}
	}

	/// Delivers a result to the subscription for `hash`.
	///
	/// Returns whether a consumer was resolved. The entry is removed before
	/// sending, so at most one delivery can ever happen per subscription;
	/// duplicate events for the same hash fall through and return `false`.
	pub fn resolve(&self, hash: &TransactionHash, result: ConfirmationResult) -> bool {
		match self.subscriptions.remove(hash) {
			Some((_, sender)) => sender.send(result).is_ok(),
			None => {
				debug!(tx_hash = %hash, "Ignoring event for untracked transaction");
				false
			}
		}
	}

	/// Discards the subscription for `hash` without resolving it.
	pub fn cancel(&self, hash: &TransactionHash) -> bool {
		self.subscriptions.remove(hash).is_some()
	}

	/// Discards every live subscription. Used on UI teardown.
	pub fn clear(&self) {
		self.subscriptions.clear();
	}

	pub fn is_tracking(&self, hash: &TransactionHash) -> bool {
		self.subscriptions.contains_key(hash)
	}
}

/// Callbacks fired after a tracked transaction resolves.
#[async_trait]
pub trait UiListener: Send + Sync {
	/// Re-reads dependent contract values. Runs first.
	async fn on_state_refresh(&self);
	/// User-facing notification. Runs after the refresh.
	async fn on_notification(&self, result: &ConfirmationResult);
}

/// Couples a tracker with UI callbacks.
pub struct StateSynchronizer {
	tracker: Arc<TrackerService>,
	listener: Arc<dyn UiListener>,
}

impl StateSynchronizer {
	pub fn new(tracker: Arc<TrackerService>, listener: Arc<dyn UiListener>) -> Self {
		Self { tracker, listener }
	}

	/// Registers `hash` and returns a future that runs the listener
	/// callbacks once the transaction resolves.
	///
	/// On resolution the state refresh runs before the notification. If the
	/// subscription is cancelled first, neither runs and the future yields
	/// `None`.
	pub fn watch(
		&self,
		hash: TransactionHash,
	) -> Result<impl Future<Output = Option<ConfirmationResult>>, TrackerError> {
		let pending = self.tracker.track(hash)?;
		let listener = self.listener.clone();

		Ok(async move {
			match pending.wait().await {
				Some(result) => {
					listener.on_state_refresh().await;
					listener.on_notification(&result).await;
					Some(result)
				}
				None => None,
			}
		})
	}
}

/// Drives a tracked transaction to resolution from chain state.
///
/// Waits for the first confirmation and resolves the subscription with the
/// outcome. Transport faults resolve as `Failed` so the UI surfaces a
/// notification instead of hanging.
pub fn spawn_resolver(
	tracker: Arc<TrackerService>,
	delivery: Arc<DeliveryService>,
	handle: TransactionHandle,
) -> tokio::task::JoinHandle<()> {
	tokio::spawn(async move {
		let result = match delivery.wait_for_confirmations(&handle, 1, None).await {
			Ok(result) => result,
			Err(e) => {
				warn!(tx_hash = %handle.hash, "Confirmation wait failed: {}", e);
				ConfirmationResult::Failed(e.to_string())
			}
		};
		tracker.resolve(&handle.hash, result);
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;
	use std::time::Duration;

	fn hash(n: u8) -> TransactionHash {
		TransactionHash(vec![n; 32])
	}

	fn confirmed() -> ConfirmationResult {
		ConfirmationResult::Confirmed {
			confirmations: 1,
			block_number: 1,
		}
	}

	#[derive(Default)]
	struct RecordingListener {
		log: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl UiListener for RecordingListener {
		async fn on_state_refresh(&self) {
			self.log.lock().unwrap().push("refresh".to_string());
		}

		async fn on_notification(&self, result: &ConfirmationResult) {
			let label = if result.is_confirmed() {
				"notify:confirmed"
			} else {
				"notify:failed"
			};
			self.log.lock().unwrap().push(label.to_string());
		}
	}

	#[tokio::test]
	async fn test_resolution_delivers_once() {
		let tracker = TrackerService::new();
		let pending = tracker.track(hash(1)).unwrap();

		assert!(tracker.resolve(&hash(1), confirmed()));
		// A duplicate mined event finds no subscription.
		assert!(!tracker.resolve(&hash(1), confirmed()));

		assert_eq!(pending.wait().await, Some(confirmed()));
	}

	#[tokio::test]
	async fn test_duplicate_registration_rejected() {
		let tracker = TrackerService::new();
		let _pending = tracker.track(hash(1)).unwrap();
		let err = tracker.track(hash(1)).unwrap_err();
		assert!(matches!(err, TrackerError::AlreadyTracking(_)));
	}

	#[tokio::test]
	async fn test_reregistration_after_resolution() {
		let tracker = TrackerService::new();
		let pending = tracker.track(hash(1)).unwrap();
		tracker.resolve(&hash(1), confirmed());
		pending.wait().await.unwrap();

		// The hash is free again once resolved.
		assert!(tracker.track(hash(1)).is_ok());
	}

	#[tokio::test]
	async fn test_cancellation_yields_nothing() {
		let tracker = TrackerService::new();
		let pending = tracker.track(hash(1)).unwrap();
		assert!(tracker.cancel(&hash(1)));
		assert_eq!(pending.wait().await, None);
		assert!(!tracker.is_tracking(&hash(1)));
	}

	#[tokio::test]
	async fn test_callbacks_run_in_order() {
		let tracker = Arc::new(TrackerService::new());
		let listener = Arc::new(RecordingListener::default());
		let synchronizer = StateSynchronizer::new(tracker.clone(), listener.clone());

		let watch = synchronizer.watch(hash(1)).unwrap();
		tracker.resolve(&hash(1), confirmed());
		let result = watch.await;

		assert_eq!(result, Some(confirmed()));
		assert_eq!(
			*listener.log.lock().unwrap(),
			vec!["refresh".to_string(), "notify:confirmed".to_string()]
		);
	}

	#[tokio::test]
	async fn test_no_callbacks_after_teardown() {
		let tracker = Arc::new(TrackerService::new());
		let listener = Arc::new(RecordingListener::default());
		let synchronizer = StateSynchronizer::new(tracker.clone(), listener.clone());

		let watch = synchronizer.watch(hash(1)).unwrap();
		tracker.clear();
		assert_eq!(watch.await, None);
		assert!(listener.log.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_chain_driven_resolution() {
		use deployer_chains::MemoryChain;
		use deployer_types::{Artifact, TransactionRequest};

		let chain = Arc::new(MemoryChain::new(31337));
		let delivery = Arc::new(
			DeliveryService::new(chain.clone()).with_poll_interval(Duration::from_millis(10)),
		);
		let tracker = Arc::new(TrackerService::new());
		let listener = Arc::new(RecordingListener::default());
		let synchronizer = StateSynchronizer::new(tracker.clone(), listener.clone());

		let artifact = Artifact {
			contract_name: "SimpleStorage".into(),
			abi: serde_json::json!([]),
			bytecode: vec![0x60, 0x80],
		};
		let handle = delivery
			.submit(TransactionRequest::deploy(artifact, vec![]))
			.await
			.unwrap();

		let watch = synchronizer.watch(handle.hash.clone()).unwrap();
		spawn_resolver(tracker.clone(), delivery.clone(), handle);

		let result = watch.await.expect("resolved");
		assert!(result.is_confirmed());
		assert_eq!(listener.log.lock().unwrap().len(), 2);
	}
}
