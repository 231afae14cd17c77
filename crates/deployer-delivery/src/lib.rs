//! Transaction delivery for the deployment system.
//!
//! Wraps a chain client with the two operations every deployment step needs:
//! submitting a transaction and waiting until it has accumulated a required
//! number of block confirmations.

use deployer_types::{
	ChainClient, ChainError, ConfirmationResult, TransactionHandle, TransactionHash,
	TransactionRequest, TransactionStatus,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The transaction was rejected at submit time.
	#[error("Submission rejected: {0}")]
	Submission(String),
	/// A confirmation requirement of zero is meaningless.
	#[error("Required confirmation count must be at least 1")]
	InvalidRequirement,
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),
}

/// Submission and confirmation-wait service.
///
/// One instance per target chain. The service holds no per-transaction
/// state; every wait is self-contained and releases its polling loop when
/// it returns, whatever the outcome.
pub struct DeliveryService {
	chain: Arc<dyn ChainClient>,
	poll_interval: Duration,
	default_timeout: Duration,
}

impl DeliveryService {
	pub fn new(chain: Arc<dyn ChainClient>) -> Self {
		Self {
			chain,
			poll_interval: Duration::from_millis(500),
			default_timeout: Duration::from_secs(120),
		}
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
		self.default_timeout = timeout;
		self
	}

	/// Submits a transaction and returns its handle.
	pub async fn submit(&self, tx: TransactionRequest) -> Result<TransactionHandle, DeliveryError> {
		let handle = self.chain.submit_transaction(tx).await.map_err(|e| match e {
			ChainError::Submission(reason) => DeliveryError::Submission(reason),
			other => DeliveryError::Chain(other),
		})?;

		info!(tx_hash = %truncate_hash(&handle.hash), "Submitted transaction");
		Ok(handle)
	}

	/// Waits until `required` confirmations have accumulated.
	///
	/// Returns the lifecycle outcome as a value: `Confirmed` once the count
	/// is reached, `TimedOut` when the deadline elapses first, `Failed` when
	/// the chain reports the transaction reverted or dropped. Only transport
	/// faults use the error channel.
	pub async fn wait_for_confirmations(
		&self,
		handle: &TransactionHandle,
		required: u64,
		timeout: Option<Duration>,
	) -> Result<ConfirmationResult, DeliveryError> {
		if required == 0 {
			return Err(DeliveryError::InvalidRequirement);
		}

		let timeout = timeout.unwrap_or(self.default_timeout);
		let start_time = tokio::time::Instant::now();
		let mut attempts: u32 = 0;
		// High-water mark; the reported count never decreases even if a
		// reorg briefly lowers the live one.
		let mut best_confirmations: u64 = 0;

		info!(
			tx_hash = %truncate_hash(&handle.hash),
			"Waiting for {} confirmations (timeout: {}s)",
			required,
			timeout.as_secs()
		);

		loop {
			if start_time.elapsed() > timeout {
				info!(
					tx_hash = %truncate_hash(&handle.hash),
					"Confirmation wait timed out after {} attempts",
					attempts
				);
				return Ok(ConfirmationResult::TimedOut);
			}

			attempts += 1;
			debug!(
				tx_hash = %truncate_hash(&handle.hash),
				"Attempt {} to check transaction status",
				attempts
			);

			match self.chain.transaction_status(&handle.hash).await? {
				TransactionStatus::Pending => {
					debug!(
						tx_hash = %truncate_hash(&handle.hash),
						"Transaction not yet mined (attempt {})",
						attempts
					);
				}
				TransactionStatus::Dropped { reason } => {
					return Ok(ConfirmationResult::Failed(format!(
						"Transaction dropped: {}",
						reason
					)));
				}
				TransactionStatus::Mined(receipt) => {
					if !receipt.success {
						return Ok(ConfirmationResult::Failed(
							"Transaction reverted".to_string(),
						));
					}

					let current_block = self.chain.get_block_number().await?;
					let live = current_block.saturating_sub(receipt.block_number) + 1;
					best_confirmations = best_confirmations.max(live);

					if best_confirmations >= required {
						info!(
							tx_hash = %truncate_hash(&handle.hash),
							"Transaction confirmed after {} attempts in {}ms",
							attempts,
							start_time.elapsed().as_millis()
						);
						return Ok(ConfirmationResult::Confirmed {
							confirmations: best_confirmations,
							block_number: receipt.block_number,
						});
					}

					debug!(
						tx_hash = %truncate_hash(&handle.hash),
						"Waiting for confirmations: current block {}, tx block {}, have {}, need {}",
						current_block,
						receipt.block_number,
						best_confirmations,
						required
					);
				}
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

fn truncate_hash(hash: &TransactionHash) -> String {
	let hash_str = hex::encode(&hash.0);
	if hash_str.len() <= 8 {
		hash_str
	} else {
		format!("{}..", &hash_str[..8])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use deployer_chains::MemoryChain;
	use deployer_types::Artifact;
	use serde_json::json;

	fn storage_artifact() -> Artifact {
		Artifact {
			contract_name: "SimpleStorage".into(),
			abi: json!([]),
			bytecode: vec![0x60, 0x80],
		}
	}

	fn fast_service(chain: Arc<MemoryChain>) -> DeliveryService {
		DeliveryService::new(chain)
			.with_poll_interval(Duration::from_millis(10))
			.with_default_timeout(Duration::from_millis(500))
	}

	#[tokio::test]
	async fn test_confirmed_with_single_confirmation() {
		let chain = Arc::new(MemoryChain::new(31337));
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();

		let result = service
			.wait_for_confirmations(&handle, 1, None)
			.await
			.unwrap();
		match result {
			ConfirmationResult::Confirmed {
				confirmations,
				block_number,
			} => {
				assert!(confirmations >= 1);
				assert_eq!(block_number, 1);
			}
			other => panic!("expected confirmed, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_confirmed_only_after_required_count() {
		let chain = Arc::new(MemoryChain::new(31337).with_manual_mining());
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();

		// Two blocks give two confirmations; three are required.
		chain.mint_block().await;
		chain.mint_block().await;
		let result = service
			.wait_for_confirmations(&handle, 3, Some(Duration::from_millis(100)))
			.await
			.unwrap();
		assert_eq!(result, ConfirmationResult::TimedOut);

		chain.mint_block().await;
		let result = service
			.wait_for_confirmations(&handle, 3, None)
			.await
			.unwrap();
		match result {
			ConfirmationResult::Confirmed { confirmations, .. } => {
				assert!(confirmations >= 3);
			}
			other => panic!("expected confirmed, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_confirmations_accumulate_while_waiting() {
		let chain = Arc::new(MemoryChain::new(31337).with_manual_mining());
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();

		let miner = chain.clone();
		let minting = tokio::spawn(async move {
			for _ in 0..4 {
				tokio::time::sleep(Duration::from_millis(20)).await;
				miner.mint_block().await;
			}
		});

		let result = service
			.wait_for_confirmations(&handle, 4, None)
			.await
			.unwrap();
		minting.await.unwrap();
		assert!(result.is_confirmed());
	}

	#[tokio::test]
	async fn test_timeout_when_never_mined() {
		let chain = Arc::new(MemoryChain::new(31337).with_manual_mining());
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();

		let started = tokio::time::Instant::now();
		let result = service
			.wait_for_confirmations(&handle, 1, Some(Duration::from_millis(80)))
			.await
			.unwrap();
		assert_eq!(result, ConfirmationResult::TimedOut);
		// The poll loop must exit promptly once the deadline passes.
		assert!(started.elapsed() < Duration::from_secs(2));
	}

	#[tokio::test]
	async fn test_reverted_transaction_fails() {
		let chain = Arc::new(MemoryChain::new(31337));
		chain.revert_next_transaction().await;
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();

		let result = service
			.wait_for_confirmations(&handle, 1, None)
			.await
			.unwrap();
		assert!(matches!(result, ConfirmationResult::Failed(_)));
	}

	#[tokio::test]
	async fn test_dropped_transaction_fails() {
		let chain = Arc::new(MemoryChain::new(31337).with_manual_mining());
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();
		chain.drop_transaction(&handle.hash, "underpriced").await;

		let result = service
			.wait_for_confirmations(&handle, 1, None)
			.await
			.unwrap();
		match result {
			ConfirmationResult::Failed(reason) => assert!(reason.contains("underpriced")),
			other => panic!("expected failed, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_zero_requirement_rejected() {
		let chain = Arc::new(MemoryChain::new(31337));
		let service = fast_service(chain.clone());

		let handle = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap();

		let err = service
			.wait_for_confirmations(&handle, 0, None)
			.await
			.unwrap_err();
		assert!(matches!(err, DeliveryError::InvalidRequirement));
	}

	#[tokio::test]
	async fn test_submission_rejection_surfaces() {
		let chain = Arc::new(MemoryChain::new(31337));
		chain.reject_next_submission("insufficient funds").await;
		let service = fast_service(chain.clone());

		let err = service
			.submit(TransactionRequest::deploy(storage_artifact(), vec![]))
			.await
			.unwrap_err();
		match err {
			DeliveryError::Submission(reason) => assert!(reason.contains("insufficient")),
			other => panic!("expected submission error, got {:?}", other),
		}
	}
}
