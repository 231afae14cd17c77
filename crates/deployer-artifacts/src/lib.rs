//! Artifact loading for the deployment system.
//!
//! This module provides abstractions for obtaining compiled contract
//! artifacts, supporting different backing stores such as a directory of
//! compiler output files or an in-memory set for tests.

use async_trait::async_trait;
use deployer_types::Artifact;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

pub use implementations::file::FileArtifactSource;
pub use implementations::memory::MemoryArtifactSource;

/// Errors that can occur while loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
	/// Error that occurs when no artifact exists for the requested name.
	#[error("Not found: {0}")]
	NotFound(String),
	/// Error that occurs when an artifact file cannot be parsed.
	#[error("Parse error: {0}")]
	Parse(String),
	/// Error that occurs in the backing store.
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Trait defining the interface for artifact backends.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
	/// Loads the artifact for the named contract.
	async fn load(&self, contract_name: &str) -> Result<Artifact, ArtifactError>;
}
