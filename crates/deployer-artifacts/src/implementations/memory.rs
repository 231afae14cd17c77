//! In-memory artifact source for tests and development chains.

use crate::{ArtifactError, ArtifactSource};
use async_trait::async_trait;
use deployer_types::Artifact;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryArtifactSource {
	artifacts: HashMap<String, Artifact>,
}

impl MemoryArtifactSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_artifact(mut self, artifact: Artifact) -> Self {
		self.artifacts
			.insert(artifact.contract_name.clone(), artifact);
		self
	}
}

#[async_trait]
impl ArtifactSource for MemoryArtifactSource {
	async fn load(&self, contract_name: &str) -> Result<Artifact, ArtifactError> {
		self.artifacts
			.get(contract_name)
			.cloned()
			.ok_or_else(|| ArtifactError::NotFound(contract_name.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_lookup() {
		let source = MemoryArtifactSource::new().with_artifact(Artifact {
			contract_name: "SimpleStorage".into(),
			abi: serde_json::json!([]),
			bytecode: vec![0x60],
		});
		assert!(source.load("SimpleStorage").await.is_ok());
		assert!(matches!(
			source.load("FundMe").await.unwrap_err(),
			ArtifactError::NotFound(_)
		));
	}
}
