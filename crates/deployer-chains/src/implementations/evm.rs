//! EVM chain client backed by the Alloy library.
//!
//! Handles transaction signing, submission and receipt queries over HTTP
//! RPC. Method-level calls are ABI-encoded from the artifact's ABI; argument
//! values arrive as JSON and are coerced to their Solidity types.

use crate::truncate_hash;
use alloy::{
	dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier},
	json_abi::JsonAbi,
	network::EthereumWallet,
	primitives::{Address as AlloyAddress, Bytes, TxKind, B256, U256},
	providers::{DynProvider, Provider, ProviderBuilder},
	rpc::types::{TransactionInput, TransactionRequest as AlloyTransactionRequest},
	signers::{local::PrivateKeySigner, Signer},
};
use async_trait::async_trait;
use deployer_types::{
	Address, BlockNumber, ChainClient, ChainError, TransactionHandle, TransactionHash,
	TransactionKind, TransactionReceipt, TransactionRequest, TransactionStatus,
};
use tracing::{debug, info};

pub struct EvmChain {
	provider: DynProvider,
	chain_id: u64,
}

impl EvmChain {
	/// Connects to an RPC endpoint with a local signing key.
	pub fn new(rpc_url: &str, chain_id: u64, private_key: &str) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Network(format!("Invalid RPC URL: {}", e)))?;

		let signer: PrivateKeySigner = private_key
			.parse()
			.map_err(|e| ChainError::Encoding(format!("Invalid signing key: {}", e)))?;
		let signer = signer.with_chain_id(Some(chain_id));
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		Ok(Self { provider, chain_id })
	}

	fn build_request(&self, tx: &TransactionRequest) -> Result<AlloyTransactionRequest, ChainError> {
		let (to, data) = match &tx.kind {
			TransactionKind::Deploy { artifact, args } => {
				let abi = parse_abi(&artifact.abi)?;
				let mut data = artifact.bytecode.clone();
				data.extend(encode_constructor_args(&abi, args)?);
				(TxKind::Create, data)
			}
			TransactionKind::Call {
				to,
				abi,
				method,
				args,
			} => {
				let abi = parse_abi(abi)?;
				let data = encode_call(&abi, method, args)?;
				(TxKind::Call(to_alloy_address(to)?), data)
			}
		};

		Ok(AlloyTransactionRequest {
			chain_id: Some(self.chain_id),
			to: Some(to),
			value: Some(U256::from(tx.value)),
			input: TransactionInput {
				input: Some(Bytes::from(data)),
				data: None,
			},
			..Default::default()
		})
	}
}

#[async_trait]
impl ChainClient for EvmChain {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn get_block_number(&self) -> Result<BlockNumber, ChainError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| ChainError::Network(e.to_string()))
	}

	async fn submit_transaction(
		&self,
		tx: TransactionRequest,
	) -> Result<TransactionHandle, ChainError> {
		let request = self.build_request(&tx)?;

		// The provider's wallet handles signing and gas filling.
		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| ChainError::Submission(e.to_string()))?;

		let hash = TransactionHash(pending.tx_hash().0.to_vec());
		info!(tx_hash = %truncate_hash(&hash), "Submitted transaction");

		Ok(TransactionHandle {
			hash,
			submitted_at: chrono::Utc::now().timestamp() as u64,
		})
	}

	async fn transaction_status(
		&self,
		hash: &TransactionHash,
	) -> Result<TransactionStatus, ChainError> {
		let tx_hash = to_b256(hash)?;

		let receipt = self
			.provider
			.get_transaction_receipt(tx_hash)
			.await
			.map_err(|e| ChainError::Network(e.to_string()))?;

		if let Some(receipt) = receipt {
			return Ok(TransactionStatus::Mined(TransactionReceipt {
				hash: hash.clone(),
				block_number: receipt.block_number.unwrap_or_default(),
				contract_address: receipt
					.contract_address
					.map(|a| Address(a.as_slice().to_vec())),
				success: receipt.status(),
			}));
		}

		// No receipt: still pending if the node knows the transaction,
		// otherwise it fell out of the pool.
		let known = self
			.provider
			.get_transaction_by_hash(tx_hash)
			.await
			.map_err(|e| ChainError::Network(e.to_string()))?;

		match known {
			Some(_) => {
				debug!(tx_hash = %truncate_hash(hash), "Transaction not yet mined");
				Ok(TransactionStatus::Pending)
			}
			None => Ok(TransactionStatus::Dropped {
				reason: "Transaction no longer known to the node".to_string(),
			}),
		}
	}

	async fn call(
		&self,
		to: &Address,
		abi: &serde_json::Value,
		method: &str,
		args: &[serde_json::Value],
	) -> Result<serde_json::Value, ChainError> {
		let parsed = parse_abi(abi)?;
		let function = find_function(&parsed, method)?;
		let data = function
			.abi_encode_input(&coerce_args(&function.inputs, args)?)
			.map_err(|e| ChainError::Encoding(e.to_string()))?;

		let request = AlloyTransactionRequest {
			to: Some(TxKind::Call(to_alloy_address(to)?)),
			input: TransactionInput {
				input: Some(Bytes::from(data)),
				data: None,
			},
			..Default::default()
		};

		let output = self
			.provider
			.call(request)
			.await
			.map_err(|e| ChainError::Network(e.to_string()))?;

		let decoded = function
			.abi_decode_output(&output)
			.map_err(|e| ChainError::Encoding(e.to_string()))?;

		Ok(match decoded.first() {
			Some(value) => sol_value_to_json(value),
			None => serde_json::Value::Null,
		})
	}
}

fn parse_abi(abi: &serde_json::Value) -> Result<JsonAbi, ChainError> {
	serde_json::from_value(abi.clone())
		.map_err(|e| ChainError::Encoding(format!("Invalid ABI: {}", e)))
}

fn find_function<'a>(
	abi: &'a JsonAbi,
	method: &str,
) -> Result<&'a alloy::json_abi::Function, ChainError> {
	abi.function(method)
		.and_then(|overloads| overloads.first())
		.ok_or_else(|| ChainError::UnknownMethod(method.to_string()))
}

fn to_alloy_address(address: &Address) -> Result<AlloyAddress, ChainError> {
	if address.0.len() != 20 {
		return Err(ChainError::Encoding(format!(
			"Address {} is not 20 bytes",
			address
		)));
	}
	Ok(AlloyAddress::from_slice(&address.0))
}

fn to_b256(hash: &TransactionHash) -> Result<B256, ChainError> {
	if hash.0.len() != 32 {
		return Err(ChainError::Encoding(format!(
			"Hash {} is not 32 bytes",
			hash
		)));
	}
	Ok(B256::from_slice(&hash.0))
}

fn encode_constructor_args(
	abi: &JsonAbi,
	args: &[serde_json::Value],
) -> Result<Vec<u8>, ChainError> {
	let constructor = match &abi.constructor {
		Some(constructor) => constructor,
		None if args.is_empty() => return Ok(Vec::new()),
		None => {
			return Err(ChainError::Encoding(
				"Constructor arguments supplied for a contract without a constructor".to_string(),
			))
		}
	};

	let values = coerce_args(&constructor.inputs, args)?;
	constructor
		.abi_encode_input(&values)
		.map_err(|e| ChainError::Encoding(e.to_string()))
}

fn encode_call(
	abi: &JsonAbi,
	method: &str,
	args: &[serde_json::Value],
) -> Result<Vec<u8>, ChainError> {
	let function = find_function(abi, method)?;
	let values = coerce_args(&function.inputs, args)?;
	function
		.abi_encode_input(&values)
		.map_err(|e| ChainError::Encoding(e.to_string()))
}

fn coerce_args(
	params: &[alloy::json_abi::Param],
	args: &[serde_json::Value],
) -> Result<Vec<DynSolValue>, ChainError> {
	if params.len() != args.len() {
		return Err(ChainError::Encoding(format!(
			"Expected {} arguments, got {}",
			params.len(),
			args.len()
		)));
	}

	params
		.iter()
		.zip(args)
		.map(|(param, arg)| {
			let ty = param
				.resolve()
				.map_err(|e| ChainError::Encoding(e.to_string()))?;
			json_to_sol(&ty, arg)
		})
		.collect()
}

fn json_to_sol(ty: &DynSolType, arg: &serde_json::Value) -> Result<DynSolValue, ChainError> {
	let text = match arg {
		serde_json::Value::String(s) => s.clone(),
		serde_json::Value::Number(n) => n.to_string(),
		serde_json::Value::Bool(b) => b.to_string(),
		other => {
			return Err(ChainError::Encoding(format!(
				"Unsupported argument value: {}",
				other
			)))
		}
	};

	ty.coerce_str(&text)
		.map_err(|e| ChainError::Encoding(format!("Cannot coerce {} to {}: {}", text, ty, e)))
}

fn sol_value_to_json(value: &DynSolValue) -> serde_json::Value {
	match value {
		DynSolValue::Bool(b) => serde_json::Value::Bool(*b),
		DynSolValue::Uint(v, _) => match u64::try_from(*v) {
			Ok(small) => serde_json::json!(small),
			Err(_) => serde_json::Value::String(v.to_string()),
		},
		DynSolValue::Int(v, _) => serde_json::Value::String(v.to_string()),
		DynSolValue::Address(a) => serde_json::Value::String(format!("{:#x}", a)),
		DynSolValue::String(s) => serde_json::Value::String(s.clone()),
		DynSolValue::Bytes(bytes) => {
			serde_json::Value::String(format!("0x{}", hex::encode(bytes)))
		}
		DynSolValue::FixedBytes(word, size) => {
			serde_json::Value::String(format!("0x{}", hex::encode(&word.as_slice()[..*size])))
		}
		DynSolValue::Tuple(values) | DynSolValue::Array(values)
		| DynSolValue::FixedArray(values) => {
			serde_json::Value::Array(values.iter().map(sol_value_to_json).collect())
		}
		other => serde_json::Value::String(format!("{:?}", other)),
	}
}
