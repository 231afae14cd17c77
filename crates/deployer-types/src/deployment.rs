//! Deployment artifacts and records.

use crate::{Address, TransactionHandle};
use serde::{Deserialize, Serialize};

/// Compiled contract artifact.
///
/// Supplied by an artifact source; compilation itself happens elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
	/// Contract name, used to look the artifact up and to label records.
	pub contract_name: String,
	/// Contract ABI as produced by the compiler.
	pub abi: serde_json::Value,
	/// Deployable bytecode.
	#[serde(with = "bytecode_hex")]
	pub bytecode: Vec<u8>,
}

/// Hex (de)serialization for bytecode, accepting an optional `0x` prefix.
mod bytecode_hex {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let s = String::deserialize(deserializer)?;
		let stripped = s.strip_prefix("0x").unwrap_or(&s);
		hex::decode(stripped).map_err(serde::de::Error::custom)
	}
}

/// Declares an external collaborator contract a deployment depends on.
///
/// On development networks the named mock artifact is deployed and its
/// address substituted; on live networks the address comes from network
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencySpec {
	/// Configuration key of the live address for this dependency.
	pub name: String,
	/// Artifact deployed in place of the live contract on development networks.
	pub mock_artifact: Option<String>,
}

/// Record of one completed deployment.
///
/// Created once the deploy transaction is confirmed. Only `verified` changes
/// afterwards, flipped by a successful verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
	pub id: uuid::Uuid,
	pub contract: String,
	pub contract_address: Address,
	pub transaction: TransactionHandle,
	pub verified: bool,
	pub constructor_args: Vec<serde_json::Value>,
	pub block_number: u64,
	pub deployed_at: u64,
}

/// Result of the post-deploy read/write/read check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionReport {
	pub before: serde_json::Value,
	pub after: serde_json::Value,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_artifact_bytecode_hex() {
		let artifact: Artifact = serde_json::from_value(serde_json::json!({
			"contract_name": "SimpleStorage",
			"abi": [],
			"bytecode": "0x6080",
		}))
		.unwrap();
		assert_eq!(artifact.bytecode, vec![0x60, 0x80]);

		let round = serde_json::to_value(&artifact).unwrap();
		assert_eq!(round["bytecode"], "0x6080");
	}
}
