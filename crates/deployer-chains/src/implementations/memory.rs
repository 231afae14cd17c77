//! In-process development chain.
//!
//! Models the minimum a deployment pipeline needs from a local node:
//! transactions sit in a pool until a block is minted, receipts exist only
//! for mined transactions, and confirmations accumulate as further blocks
//! are minted. Contract execution is reduced to a single value register per
//! contract: state-changing calls write their first argument, read-only
//! calls return the current value. That is enough to exercise deploy,
//! confirm and read/write/read flows without an EVM.
//!
//! Failure paths are injectable so callers can exercise reverted and
//! dropped transactions deterministically.

use async_trait::async_trait;
use deployer_types::{
	Address, BlockNumber, ChainClient, ChainError, TransactionHandle, TransactionHash,
	TransactionKind, TransactionReceipt, TransactionRequest, TransactionStatus,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

struct ContractState {
	contract_name: String,
	constructor_args: Vec<serde_json::Value>,
	/// Single value register; starts at 0 like a fresh storage slot.
	value: serde_json::Value,
}

struct PoolEntry {
	request: TransactionRequest,
	status: TransactionStatus,
}

struct ChainState {
	block_number: BlockNumber,
	pool: Vec<TransactionHash>,
	transactions: HashMap<TransactionHash, PoolEntry>,
	contracts: HashMap<Address, ContractState>,
	tx_counter: u64,
	/// Mint a block immediately on every submission, hardhat-style.
	auto_mine: bool,
	/// When set, the next submission is rejected with this reason.
	reject_next: Option<String>,
	/// When set, the next mined transaction reverts.
	revert_next: bool,
}

/// In-memory development chain client.
pub struct MemoryChain {
	chain_id: u64,
	state: RwLock<ChainState>,
}

impl MemoryChain {
	pub fn new(chain_id: u64) -> Self {
		Self {
			chain_id,
			state: RwLock::new(ChainState {
				block_number: 0,
				pool: Vec::new(),
				transactions: HashMap::new(),
				contracts: HashMap::new(),
				tx_counter: 0,
				auto_mine: true,
				reject_next: None,
				revert_next: false,
			}),
		}
	}

	/// Disables automatic minting; blocks then only advance via `mint_block`.
	pub fn with_manual_mining(mut self) -> Self {
		self.state.get_mut().auto_mine = false;
		self
	}

	/// Mints one block, including every pooled transaction.
	pub async fn mint_block(&self) {
		let mut state = self.state.write().await;
		Self::mint_block_locked(&mut state);
	}

	/// Rejects the next submission at submit time.
	pub async fn reject_next_submission(&self, reason: impl Into<String>) {
		self.state.write().await.reject_next = Some(reason.into());
	}

	/// Makes the next mined transaction revert.
	pub async fn revert_next_transaction(&self) {
		self.state.write().await.revert_next = true;
	}

	/// Evicts a pooled transaction without mining it.
	pub async fn drop_transaction(&self, hash: &TransactionHash, reason: impl Into<String>) {
		let mut state = self.state.write().await;
		state.pool.retain(|pooled| pooled != hash);
		if let Some(entry) = state.transactions.get_mut(hash) {
			entry.status = TransactionStatus::Dropped {
				reason: reason.into(),
			};
		}
	}

	fn mint_block_locked(state: &mut ChainState) {
		state.block_number += 1;
		let block_number = state.block_number;
		let pooled: Vec<TransactionHash> = state.pool.drain(..).collect();

		for hash in pooled {
			let revert = std::mem::take(&mut state.revert_next);
			let entry = match state.transactions.get(&hash) {
				Some(entry) => entry,
				None => continue,
			};

			if revert {
				let receipt = TransactionReceipt {
					hash: hash.clone(),
					block_number,
					contract_address: None,
					success: false,
				};
				state.transactions.get_mut(&hash).unwrap().status =
					TransactionStatus::Mined(receipt);
				continue;
			}

			let contract_address = match &entry.request.kind {
				TransactionKind::Deploy { artifact, args } => {
					let address = Self::derive_address(&hash);
					state.contracts.insert(
						address.clone(),
						ContractState {
							contract_name: artifact.contract_name.clone(),
							constructor_args: args.clone(),
							value: serde_json::json!(0),
						},
					);
					Some(address)
				}
				TransactionKind::Call { to, method, args, .. } => {
					if let Some(contract) = state.contracts.get_mut(to) {
						if let Some(first) = args.first() {
							contract.value = first.clone();
						}
						debug!(contract = %to, method = %method, "Applied call");
					}
					None
				}
			};

			let receipt = TransactionReceipt {
				hash: hash.clone(),
				block_number,
				contract_address,
				success: true,
			};
			state.transactions.get_mut(&hash).unwrap().status = TransactionStatus::Mined(receipt);
		}
	}

	fn derive_hash(counter: u64, chain_id: u64) -> TransactionHash {
		let mut bytes = vec![0u8; 32];
		bytes[..8].copy_from_slice(&chain_id.to_be_bytes());
		bytes[24..].copy_from_slice(&counter.to_be_bytes());
		TransactionHash(bytes)
	}

	fn derive_address(hash: &TransactionHash) -> Address {
		// Unique per transaction since hashes are unique per submission.
		let mut bytes = hash.0[hash.0.len().saturating_sub(20)..].to_vec();
		bytes.resize(20, 0);
		bytes[0] = 0x5a;
		Address(bytes)
	}

	/// Name of the contract deployed at `address`, for assertions.
	pub async fn contract_name(&self, address: &Address) -> Option<String> {
		self.state
			.read()
			.await
			.contracts
			.get(address)
			.map(|c| c.contract_name.clone())
	}

	/// Constructor arguments recorded at deployment, for assertions.
	pub async fn constructor_args(&self, address: &Address) -> Option<Vec<serde_json::Value>> {
		self.state
			.read()
			.await
			.contracts
			.get(address)
			.map(|c| c.constructor_args.clone())
	}
}

#[async_trait]
impl ChainClient for MemoryChain {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn get_block_number(&self) -> Result<BlockNumber, ChainError> {
		Ok(self.state.read().await.block_number)
	}

	async fn submit_transaction(
		&self,
		tx: TransactionRequest,
	) -> Result<TransactionHandle, ChainError> {
		let mut state = self.state.write().await;

		if let Some(reason) = state.reject_next.take() {
			return Err(ChainError::Submission(reason));
		}

		if let TransactionKind::Deploy { artifact, .. } = &tx.kind {
			if artifact.bytecode.is_empty() {
				return Err(ChainError::Submission(format!(
					"Artifact {} has no bytecode",
					artifact.contract_name
				)));
			}
		}
		if let TransactionKind::Call { to, .. } = &tx.kind {
			if !state.contracts.contains_key(to) {
				return Err(ChainError::Submission(format!("No contract at {}", to)));
			}
		}

		state.tx_counter += 1;
		let hash = Self::derive_hash(state.tx_counter, self.chain_id);
		state.transactions.insert(
			hash.clone(),
			PoolEntry {
				request: tx,
				status: TransactionStatus::Pending,
			},
		);
		state.pool.push(hash.clone());

		if state.auto_mine {
			Self::mint_block_locked(&mut state);
		}

		Ok(TransactionHandle {
			hash,
			submitted_at: chrono::Utc::now().timestamp() as u64,
		})
	}

	async fn transaction_status(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionStatus, ChainError> {
		let state = self.state.read().await;
		state
			.transactions
			.get(hash)
			.map(|entry| entry.status.clone())
			.ok_or_else(|| ChainError::Network(format!("Unknown transaction {}", hash)))
	}

	async fn call(
		&self,
		to: &Address,
		_abi: &serde_json::Value,
		method: &str,
		_args: &[serde_json::Value],
	) -> Result<serde_json::Value, ChainError> {
		let state = self.state.read().await;
		let contract = state
			.contracts
			.get(to)
			.ok_or_else(|| ChainError::UnknownContract(to.to_string()))?;
		debug!(contract = %to, method = %method, "Read call");
		Ok(contract.value.clone())
	}
}
