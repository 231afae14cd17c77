//! Chain client implementations for the deployment system.
//!
//! This module provides concrete implementations of the ChainClient trait:
//! an in-process development chain with explicit block minting, and an
//! RPC-backed EVM client using the Alloy library.

pub mod implementations {
	pub mod evm;
	pub mod memory;
}

pub use implementations::evm::EvmChain;
pub use implementations::memory::MemoryChain;

/// Utility function to truncate a transaction hash for display.
pub(crate) fn truncate_hash(hash: &deployer_types::TransactionHash) -> String {
	let hash_str = hex::encode(&hash.0);
	if hash_str.len() <= 8 {
		hash_str
	} else {
		format!("{}..", &hash_str[..8])
	}
}
