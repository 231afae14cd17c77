//! Deployment orchestration core.
//!
//! Sequences one deployment through its stages: resolve constructor
//! arguments, submit, wait for confirmations, verify source, and optionally
//! exercise the deployed contract. Stage outputs are typed so each can be
//! tested against a development chain without standing up a real network.

pub mod engine;
pub mod error;

pub use engine::{
	DeployRequest, DeploymentOrchestrator, InteractionCheck, OrchestratorBuilder,
	OrchestratorConfig,
};
pub use error::DeployError;
