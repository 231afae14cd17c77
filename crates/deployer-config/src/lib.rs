// deployer-config/src/lib.rs

use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

mod types;

pub use types::{
	ArtifactsConfig, BackoffKind, DeployerConfig, DeployerSection, ExplorerConfig, NetworkConfig,
	VerificationConfig,
};

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Configuration loader with environment variable substitution
#[derive(Default)]
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "DEPLOYER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<DeployerConfig, ConfigError> {
		// Load base configuration from file
		let mut config = if let Some(file_path) = &self.file_path {
			self.load_from_file(file_path).await?
		} else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};

		// Apply environment variable overrides
		self.apply_env_overrides(&mut config)?;

		// Validate configuration
		self.validate_config(&config)?;

		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<DeployerConfig, ConfigError> {
		debug!(path = %file_path, "Reading configuration file");
		let content = tokio::fs::read_to_string(file_path).await?;

		// Substitute environment variables
		let substituted_content = self.substitute_env_vars(&content)?;

		// Parse TOML
		let config: DeployerConfig = toml::from_str(&substituted_content)
			.map_err(|e| ConfigError::ParseError(e.to_string()))?;

		Ok(config)
	}

	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn apply_env_overrides(&self, config: &mut DeployerConfig) -> Result<(), ConfigError> {
		// Apply environment variable overrides for common settings
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.deployer.log_level = log_level;
		}

		if let Ok(confirmations) = env::var(format!("{}REQUIRED_CONFIRMATIONS", self.env_prefix)) {
			config.network.required_confirmations = confirmations.parse().map_err(|e| {
				ConfigError::ValidationError(format!("Invalid confirmation count: {}", e))
			})?;
		}

		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			config.network.rpc_url = Some(rpc_url);
		}

		Ok(())
	}

	fn validate_config(&self, config: &DeployerConfig) -> Result<(), ConfigError> {
		if config.network.required_confirmations == 0 {
			return Err(ConfigError::ValidationError(
				"required_confirmations must be at least 1".to_string(),
			));
		}

		if !config.network.development {
			if config.network.rpc_url.is_none() {
				return Err(ConfigError::ValidationError(
					"Live networks require an RPC endpoint".to_string(),
				));
			}
			if config.network.private_key.is_none() {
				return Err(ConfigError::ValidationError(
					"Live networks require a signing key".to_string(),
				));
			}
		}

		if config.verification.max_attempts == 0 {
			return Err(ConfigError::ValidationError(
				"verification.max_attempts must be at least 1".to_string(),
			));
		}

		Ok(())
	}
}
