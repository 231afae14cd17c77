//! Chain-related types and the client trait consumed by the orchestrator.

use crate::{Artifact, TransactionHandle, TransactionHash, TransactionStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Block number
pub type BlockNumber = u64;

/// Blockchain address representation.
///
/// Stores addresses as raw bytes to support different blockchain formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub Vec<u8>);

impl Address {
	pub fn to_hex(&self) -> String {
		hex::encode(&self.0)
	}

	pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
		let stripped = s.strip_prefix("0x").unwrap_or(s);
		Ok(Self(hex::decode(stripped)?))
	}
}

impl std::fmt::Display for Address {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", self.to_hex())
	}
}

/// What a transaction does when executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransactionKind {
	/// Create a contract from an artifact's bytecode.
	Deploy {
		artifact: Artifact,
		args: Vec<serde_json::Value>,
	},
	/// Invoke a state-changing method on an existing contract.
	Call {
		to: Address,
		abi: serde_json::Value,
		method: String,
		args: Vec<serde_json::Value>,
	},
}

/// Transaction submission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
	pub kind: TransactionKind,
	/// Native currency value attached to the transaction, in wei.
	pub value: u128,
}

impl TransactionRequest {
	pub fn deploy(artifact: Artifact, args: Vec<serde_json::Value>) -> Self {
		Self {
			kind: TransactionKind::Deploy { artifact, args },
			value: 0,
		}
	}

	pub fn call(
		to: Address,
		abi: serde_json::Value,
		method: impl Into<String>,
		args: Vec<serde_json::Value>,
	) -> Self {
		Self {
			kind: TransactionKind::Call {
				to,
				abi,
				method: method.into(),
				args,
			},
			value: 0,
		}
	}

	pub fn with_value(mut self, value: u128) -> Self {
		self.value = value;
		self
	}
}

/// Errors reported by chain clients.
#[derive(Debug, Error)]
pub enum ChainError {
	/// The transaction was rejected at submit time.
	#[error("Submission rejected: {0}")]
	Submission(String),

	#[error("Unknown contract: {0}")]
	UnknownContract(String),

	#[error("Unknown method: {0}")]
	UnknownMethod(String),

	#[error("Network error: {0}")]
	Network(String),

	#[error("Encoding error: {0}")]
	Encoding(String),
}

/// Client interface for a blockchain node.
///
/// The orchestrator, waiter and tracker consume this trait; they never talk
/// to a node directly. Implementations cover an in-process development chain
/// and an RPC-backed EVM client.
#[async_trait]
pub trait ChainClient: Send + Sync {
	/// Chain ID of the connected network.
	fn chain_id(&self) -> u64;

	/// Current block height.
	async fn get_block_number(&self) -> Result<BlockNumber, ChainError>;

	/// Submits a signed transaction and returns a handle to it.
	async fn submit_transaction(
		&self,
		tx: TransactionRequest,
	) -> Result<TransactionHandle, ChainError>;

	/// Reports the lifecycle state of a previously submitted transaction.
	async fn transaction_status(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionStatus, ChainError>;

	/// Read-only contract call.
	async fn call(
		&self,
		to: &Address,
		abi: &serde_json::Value,
		method: &str,
		args: &[serde_json::Value],
	) -> Result<serde_json::Value, ChainError>;

	/// Number of blocks confirming the transaction, zero while pending.
	///
	/// A transaction in the latest block has one confirmation.
	async fn confirmation_count(&self, hash: &TransactionHash) -> Result<u64, ChainError> {
		match self.transaction_status(hash).await? {
			TransactionStatus::Mined(receipt) => {
				let current = self.get_block_number().await?;
				Ok(current.saturating_sub(receipt.block_number) + 1)
			}
			_ => Ok(0),
		}
	}
}
