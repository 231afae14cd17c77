//! Etherscan-style verifier backend.
//!
//! Talks to an explorer API that answers `{"status": "1", ...}` on success
//! and `{"status": "0", "result": "<message>"}` on rejection. The service
//! message is passed through untouched so the classification layer can
//! recognize "already verified" responses.

use crate::{VerifierFailure, VerifierInterface};
use async_trait::async_trait;
use deployer_types::Address;
use serde::Deserialize;
use tracing::debug;

pub struct EtherscanVerifier {
	client: reqwest::Client,
	api_url: String,
	api_key: String,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
	status: String,
	#[serde(default)]
	result: String,
}

impl EtherscanVerifier {
	pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
		Self {
			client: reqwest::Client::new(),
			api_url: api_url.into(),
			api_key: api_key.into(),
		}
	}
}

#[async_trait]
impl VerifierInterface for EtherscanVerifier {
	async fn submit_verification(
		&self,
		address: &Address,
		constructor_args: &[serde_json::Value],
	) -> Result<(), VerifierFailure> {
		let encoded_args = serde_json::to_string(constructor_args)
			.map_err(|e| VerifierFailure::Network(format!("Failed to encode args: {}", e)))?;

		let contract_address = address.to_string();
		let params = [
			("module", "contract"),
			("action", "verifysourcecode"),
			("apikey", self.api_key.as_str()),
			("contractaddress", contract_address.as_str()),
			("constructorArguements", encoded_args.as_str()),
		];

		debug!(contract = %address, "Posting verification request");

		let response = self
			.client
			.post(&self.api_url)
			.form(&params)
			.send()
			.await
			.map_err(|e| VerifierFailure::Network(e.to_string()))?;

		let body: ExplorerResponse = response
			.json()
			.await
			.map_err(|e| VerifierFailure::Network(format!("Malformed explorer reply: {}", e)))?;

		if body.status == "1" {
			Ok(())
		} else {
			Err(VerifierFailure::Rejected(body.result))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_response_parsing() {
		let ok: ExplorerResponse =
			serde_json::from_str(r#"{"status": "1", "message": "OK", "result": "guid"}"#).unwrap();
		assert_eq!(ok.status, "1");

		let rejected: ExplorerResponse = serde_json::from_str(
			r#"{"status": "0", "result": "Contract source code already verified"}"#,
		)
		.unwrap();
		assert_eq!(rejected.status, "0");
		assert!(rejected.result.contains("already verified"));
	}
}
