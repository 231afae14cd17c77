//! Transaction delivery types for the deployment system.
//!
//! This module defines types related to blockchain transaction submission
//! and confirmation tracking, including transaction hashes, handles and
//! receipts.

use serde::{Deserialize, Serialize};

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes to support different blockchain formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Hex rendering of the full hash without a `0x` prefix.
	pub fn to_hex(&self) -> String {
		hex::encode(&self.0)
	}

	/// Parses a hash from a hex string, with or without a `0x` prefix.
	pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
		let stripped = s.strip_prefix("0x").unwrap_or(s);
		Ok(Self(hex::decode(stripped)?))
	}
}

impl std::fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "0x{}", self.to_hex())
	}
}

/// Handle to a submitted transaction.
///
/// Created by the client that submitted the transaction and immutable
/// afterwards. The handle is what downstream confirmation waiting and
/// tracking operate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHandle {
	/// The hash of the submitted transaction.
	pub hash: TransactionHash,
	/// Unix timestamp at which the transaction was submitted.
	pub submitted_at: u64,
}

/// Transaction receipt containing execution details.
///
/// Provides information about a transaction after it has been included in a
/// block, including its success status and block number. `contract_address`
/// is populated for deployment transactions only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: TransactionHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Address of the created contract, for deployment transactions.
	pub contract_address: Option<crate::Address>,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// Lifecycle state of a submitted transaction as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
	/// Not yet included in a block.
	Pending,
	/// Included in a block; the receipt carries the inclusion details.
	Mined(TransactionReceipt),
	/// Evicted from the pool and no longer eligible for inclusion.
	Dropped { reason: String },
}

/// Outcome of waiting for confirmations on a transaction.
///
/// Produced once per wait, consumed by the orchestrator or tracker, then
/// discarded. Transport faults are not represented here; they surface on the
/// error channel of the waiter instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationResult {
	/// The required confirmation count was reached.
	Confirmed { confirmations: u64, block_number: u64 },
	/// The deadline elapsed before enough confirmations accumulated.
	TimedOut,
	/// The transaction was dropped or reverted.
	Failed(String),
}

impl ConfirmationResult {
	pub fn is_confirmed(&self) -> bool {
		matches!(self, Self::Confirmed { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_hex_round_trip() {
		let hash = TransactionHash(vec![0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(hash.to_hex(), "deadbeef");
		assert_eq!(hash.to_string(), "0xdeadbeef");
		assert_eq!(TransactionHash::from_hex("0xdeadbeef").unwrap(), hash);
		assert_eq!(TransactionHash::from_hex("deadbeef").unwrap(), hash);
	}

	#[test]
	fn test_confirmation_result_predicates() {
		let confirmed = ConfirmationResult::Confirmed {
			confirmations: 3,
			block_number: 10,
		};
		assert!(confirmed.is_confirmed());
		assert!(!ConfirmationResult::TimedOut.is_confirmed());
		assert!(!ConfirmationResult::Failed("reverted".into()).is_confirmed());
	}
}
