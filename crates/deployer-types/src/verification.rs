//! Source verification outcome types.

use serde::{Deserialize, Serialize};

/// Outcome of a contract source verification attempt.
///
/// `AlreadyVerified` is a success: re-running a deployment against a
/// contract whose source is already registered must not read as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationOutcome {
	/// The explorer already holds matching source for this address.
	AlreadyVerified,
	/// Source was accepted and registered by this attempt.
	Verified,
	/// A transport-level fault persisted through the retry budget.
	TransientError(String),
	/// The explorer rejected the submission for a non-transient reason.
	FatalError(String),
}

impl VerificationOutcome {
	/// Whether the contract's source is registered after this outcome.
	pub fn is_verified(&self) -> bool {
		matches!(self, Self::AlreadyVerified | Self::Verified)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_verified() {
		assert!(VerificationOutcome::AlreadyVerified.is_verified());
		assert!(VerificationOutcome::Verified.is_verified());
		assert!(!VerificationOutcome::TransientError("timeout".into()).is_verified());
		assert!(!VerificationOutcome::FatalError("bad source".into()).is_verified());
	}
}
