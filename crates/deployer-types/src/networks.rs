//! Network capability profile.

use serde::{Deserialize, Serialize};

/// Capabilities of the target network, computed once from configuration.
///
/// Consumers branch on these flags instead of comparing network name
/// strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
	/// Local or throwaway chain used for iteration.
	pub is_development: bool,
	/// Whether collaborator contracts must be replaced with mocks.
	pub requires_mock_dependencies: bool,
	/// Whether an explorer credential is configured for this network.
	pub explorer_configured: bool,
}

impl NetworkProfile {
	/// Profile for a local development chain: mocks in, no explorer.
	pub fn development() -> Self {
		Self {
			is_development: true,
			requires_mock_dependencies: true,
			explorer_configured: false,
		}
	}

	/// Profile for a live network.
	pub fn live(explorer_configured: bool) -> Self {
		Self {
			is_development: false,
			requires_mock_dependencies: false,
			explorer_configured,
		}
	}

	/// Whether deployments on this network should attempt verification.
	pub fn should_verify(&self) -> bool {
		!self.is_development && self.explorer_configured
	}
}
