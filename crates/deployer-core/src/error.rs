// deployer-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Submission rejected: {0}")]
	Submission(String),

	#[error("Required {required} confirmations not reached in time")]
	ConfirmationTimeout { required: u64 },

	#[error("Transaction failed: {0}")]
	ConfirmationFailed(String),

	#[error("No contract address in receipt for {0}")]
	MissingContractAddress(String),

	#[error("No configured address for dependency {0}")]
	UnknownDependency(String),

	#[error("Artifact error: {0}")]
	Artifact(#[from] deployer_artifacts::ArtifactError),

	#[error("Chain error: {0}")]
	Chain(#[from] deployer_types::ChainError),

	#[error("Delivery error: {0}")]
	Delivery(String),
}

impl From<deployer_delivery::DeliveryError> for DeployError {
	fn from(e: deployer_delivery::DeliveryError) -> Self {
		match e {
			deployer_delivery::DeliveryError::Submission(reason) => Self::Submission(reason),
			deployer_delivery::DeliveryError::Chain(e) => Self::Chain(e),
			other => Self::Delivery(other.to_string()),
		}
	}
}
