//! File-backed artifact source.
//!
//! Reads `<ContractName>.json` files from a base directory. Each file holds
//! the compiler output for one contract: its ABI and deployable bytecode.

use crate::{ArtifactError, ArtifactSource};
use async_trait::async_trait;
use deployer_types::Artifact;
use std::path::PathBuf;
use tokio::fs;

pub struct FileArtifactSource {
	/// Directory containing one JSON file per contract.
	base_path: PathBuf,
}

impl FileArtifactSource {
	pub fn new(base_path: impl Into<PathBuf>) -> Self {
		Self {
			base_path: base_path.into(),
		}
	}

	fn artifact_path(&self, contract_name: &str) -> PathBuf {
		// Contract names come from configuration, not user input, but keep
		// the path component free of separators anyway.
		let safe_name = contract_name.replace(['/', '\\'], "_");
		self.base_path.join(format!("{}.json", safe_name))
	}
}

#[async_trait]
impl ArtifactSource for FileArtifactSource {
	async fn load(&self, contract_name: &str) -> Result<Artifact, ArtifactError> {
		let path = self.artifact_path(contract_name);

		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ArtifactError::NotFound(contract_name.to_string()))
			}
			Err(e) => return Err(ArtifactError::Backend(e.to_string())),
		};

		let artifact: Artifact =
			serde_json::from_slice(&data).map_err(|e| ArtifactError::Parse(e.to_string()))?;

		if artifact.contract_name != contract_name {
			return Err(ArtifactError::Parse(format!(
				"Artifact {} names contract {}",
				path.display(),
				artifact.contract_name
			)));
		}

		Ok(artifact)
	}
}
