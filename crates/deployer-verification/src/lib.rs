//! Contract source verification for the deployment system.
//!
//! This module handles registering deployed contract source with an external
//! explorer service. The central rule is idempotence: an explorer answering
//! "already verified" is a success, because re-running a deployment against
//! an already-verified contract must not read as a failure. Transport faults
//! are retried under a bounded policy; every other rejection surfaces as-is.

use async_trait::async_trait;
use deployer_types::{Address, VerificationOutcome};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Re-export implementations
pub mod implementations {
	pub mod etherscan;
	pub mod mock;
}

pub use implementations::etherscan::EtherscanVerifier;
pub use implementations::mock::MockVerifier;

/// Failure reported by a verifier backend.
#[derive(Debug, Error)]
pub enum VerifierFailure {
	/// Transport-level fault; the submission may never have reached the
	/// service. Eligible for retry.
	#[error("Network error: {0}")]
	Network(String),
	/// The service processed the submission and rejected it with a message.
	#[error("Rejected: {0}")]
	Rejected(String),
}

/// Trait defining the interface for explorer verification backends.
#[async_trait]
pub trait VerifierInterface: Send + Sync {
	/// Submits the contract at `address` for source verification.
	async fn submit_verification(
		&self,
		address: &Address,
		constructor_args: &[serde_json::Value],
	) -> Result<(), VerifierFailure>;
}

/// Backoff shape between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
	Fixed(Duration),
	Exponential { initial: Duration },
}

/// Bounded retry policy for transient verifier faults.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	/// Total attempt budget; one means no retries.
	pub max_attempts: u32,
	pub backoff: Backoff,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 1,
			backoff: Backoff::Fixed(Duration::from_secs(1)),
		}
	}
}

impl RetryPolicy {
	/// Delay to sleep after the given 1-based failed attempt.
	pub fn delay_after(&self, attempt: u32) -> Duration {
		match self.backoff {
			Backoff::Fixed(delay) => delay,
			Backoff::Exponential { initial } => {
				let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
				initial.saturating_mul(factor)
			}
		}
	}
}

/// Verification service wrapping a backend with classification and retry.
pub struct VerificationService {
	provider: Box<dyn VerifierInterface>,
	policy: RetryPolicy,
}

impl VerificationService {
	pub fn new(provider: Box<dyn VerifierInterface>) -> Self {
		Self {
			provider,
			policy: RetryPolicy::default(),
		}
	}

	pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
		self.policy = policy;
		self
	}

	/// Attempts to verify the contract at `address`.
	///
	/// Never returns an error: every path classifies into a
	/// `VerificationOutcome`, and the caller decides what an unverified
	/// contract means for it.
	pub async fn verify(
		&self,
		address: &Address,
		constructor_args: &[serde_json::Value],
	) -> VerificationOutcome {
		let mut last_fault = String::new();

		for attempt in 1..=self.policy.max_attempts {
			debug!(contract = %address, attempt, "Submitting verification");

			match self
				.provider
				.submit_verification(address, constructor_args)
				.await
			{
				Ok(()) => return VerificationOutcome::Verified,
				Err(VerifierFailure::Rejected(message)) => {
					return classify_rejection(&message);
				}
				Err(VerifierFailure::Network(reason)) => {
					warn!(
						contract = %address,
						attempt,
						"Verification attempt failed: {}",
						reason
					);
					last_fault = reason;
					if attempt < self.policy.max_attempts {
						tokio::time::sleep(self.policy.delay_after(attempt)).await;
					}
				}
			}
		}

		VerificationOutcome::TransientError(last_fault)
	}
}

/// Classifies a service rejection message.
///
/// A message containing "already verified", in any casing, means the
/// explorer already holds matching source; that is success.
fn classify_rejection(message: &str) -> VerificationOutcome {
	if message.to_lowercase().contains("already verified") {
		VerificationOutcome::AlreadyVerified
	} else {
		VerificationOutcome::FatalError(message.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use implementations::mock::MockVerifier;

	fn zero_address() -> Address {
		Address(vec![0; 20])
	}

	#[tokio::test]
	async fn test_successful_verification() {
		let provider = MockVerifier::new().then_ok();
		let service = VerificationService::new(Box::new(provider));
		let outcome = service.verify(&zero_address(), &[]).await;
		assert_eq!(outcome, VerificationOutcome::Verified);
	}

	#[tokio::test]
	async fn test_already_verified_is_success() {
		let provider =
			MockVerifier::new().then_rejected("Contract source code already verified");
		let service = VerificationService::new(Box::new(provider));
		let outcome = service.verify(&zero_address(), &[]).await;
		assert_eq!(outcome, VerificationOutcome::AlreadyVerified);
	}

	#[tokio::test]
	async fn test_already_verified_case_insensitive() {
		let provider = MockVerifier::new().then_rejected("ALREADY VERIFIED");
		let service = VerificationService::new(Box::new(provider));
		let outcome = service.verify(&zero_address(), &[]).await;
		assert_eq!(outcome, VerificationOutcome::AlreadyVerified);
	}

	#[tokio::test]
	async fn test_repeat_verification_stays_idempotent() {
		let provider = MockVerifier::new()
			.then_rejected("Contract source code already verified")
			.then_rejected("Contract source code already verified");
		let service = VerificationService::new(Box::new(provider));
		assert_eq!(
			service.verify(&zero_address(), &[]).await,
			VerificationOutcome::AlreadyVerified
		);
		assert_eq!(
			service.verify(&zero_address(), &[]).await,
			VerificationOutcome::AlreadyVerified
		);
	}

	#[tokio::test]
	async fn test_other_rejection_is_fatal_without_retry() {
		let provider = MockVerifier::new().then_rejected("Invalid source code");
		let service = VerificationService::new(Box::new(provider)).with_policy(RetryPolicy {
			max_attempts: 3,
			backoff: Backoff::Fixed(Duration::from_millis(1)),
		});
		let outcome = service.verify(&zero_address(), &[]).await;
		match outcome {
			VerificationOutcome::FatalError(message) => {
				assert!(message.contains("Invalid source code"));
			}
			other => panic!("expected fatal, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_transient_fault_retried_until_success() {
		let provider = MockVerifier::new()
			.then_network("connection reset")
			.then_network("connection reset")
			.then_ok();
		let service = VerificationService::new(Box::new(provider)).with_policy(RetryPolicy {
			max_attempts: 3,
			backoff: Backoff::Fixed(Duration::from_millis(1)),
		});
		let outcome = service.verify(&zero_address(), &[]).await;
		assert_eq!(outcome, VerificationOutcome::Verified);
	}

	#[tokio::test]
	async fn test_exhausted_retries_are_transient() {
		let provider = MockVerifier::new()
			.then_network("timeout")
			.then_network("timeout");
		let service = VerificationService::new(Box::new(provider)).with_policy(RetryPolicy {
			max_attempts: 2,
			backoff: Backoff::Fixed(Duration::from_millis(1)),
		});
		let outcome = service.verify(&zero_address(), &[]).await;
		match outcome {
			VerificationOutcome::TransientError(reason) => assert!(reason.contains("timeout")),
			other => panic!("expected transient, got {:?}", other),
		}
	}

	#[test]
	fn test_backoff_delays() {
		let fixed = RetryPolicy {
			max_attempts: 3,
			backoff: Backoff::Fixed(Duration::from_secs(2)),
		};
		assert_eq!(fixed.delay_after(1), Duration::from_secs(2));
		assert_eq!(fixed.delay_after(3), Duration::from_secs(2));

		let exponential = RetryPolicy {
			max_attempts: 4,
			backoff: Backoff::Exponential {
				initial: Duration::from_secs(1),
			},
		};
		assert_eq!(exponential.delay_after(1), Duration::from_secs(1));
		assert_eq!(exponential.delay_after(2), Duration::from_secs(2));
		assert_eq!(exponential.delay_after(3), Duration::from_secs(4));
	}
}
