//! Deployer configuration types.
//!
//! These structures are deserialized from a TOML configuration file. One
//! file describes one target network; switching networks means switching
//! files, not editing code.

use deployer_types::NetworkProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployerConfig {
	pub deployer: DeployerSection,
	pub network: NetworkConfig,
	/// Explorer credentials; absent when verification is unavailable.
	pub explorer: Option<ExplorerConfig>,
	#[serde(default)]
	pub verification: VerificationConfig,
	pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployerSection {
	/// Name used in logs.
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Target network parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub name: String,
	pub chain_id: u64,
	/// RPC endpoint. Not required for in-process development chains.
	pub rpc_url: Option<String>,
	/// Signing key for submissions. Keep this in the environment, never in
	/// the file itself.
	pub private_key: Option<String>,
	#[serde(default)]
	pub development: bool,
	/// Number of block confirmations required before considering a
	/// transaction final. Higher values protect against reorganizations.
	#[serde(default = "default_confirmations")]
	pub required_confirmations: u64,
	/// Receipt poll interval while waiting for confirmations.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Upper bound on one confirmation wait.
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
	/// Live addresses of collaborator contracts, keyed by dependency name.
	#[serde(default)]
	pub dependencies: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExplorerConfig {
	pub api_url: String,
	pub api_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerificationConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// Retry budget for transient explorer faults. One attempt means no
	/// retries.
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default)]
	pub backoff: BackoffKind,
	#[serde(default = "default_backoff_initial_ms")]
	pub backoff_initial_ms: u64,
}

impl Default for VerificationConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			max_attempts: default_max_attempts(),
			backoff: BackoffKind::default(),
			backoff_initial_ms: default_backoff_initial_ms(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
	#[default]
	Fixed,
	Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactsConfig {
	/// Directory of `<ContractName>.json` artifacts.
	pub dir: String,
}

impl DeployerConfig {
	/// Computes the capability profile of the configured network.
	///
	/// Done once at load time; everything downstream branches on the
	/// profile, not on the network name.
	pub fn network_profile(&self) -> NetworkProfile {
		let explorer_configured = self
			.explorer
			.as_ref()
			.map(|e| !e.api_key.is_empty())
			.unwrap_or(false);
		NetworkProfile {
			is_development: self.network.development,
			requires_mock_dependencies: self.network.development,
			explorer_configured,
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_confirmations() -> u64 {
	1
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_confirmation_timeout_secs() -> u64 {
	120
}

fn default_true() -> bool {
	true
}

fn default_max_attempts() -> u32 {
	1
}

fn default_backoff_initial_ms() -> u64 {
	1000
}
