//! Scriptable verifier backend for tests and dry runs.

use crate::{VerifierFailure, VerifierInterface};
use async_trait::async_trait;
use deployer_types::Address;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Scripted {
	Ok,
	Rejected(String),
	Network(String),
}

/// Verifier that replays a scripted sequence of responses.
///
/// Once the script is exhausted the last entry repeats, so a single
/// `then_rejected("... already verified")` models an explorer that stays
/// verified forever.
#[derive(Default)]
pub struct MockVerifier {
	script: Mutex<VecDeque<Scripted>>,
	calls: Mutex<Vec<(Address, Vec<serde_json::Value>)>>,
}

impl MockVerifier {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn then_ok(self) -> Self {
		self.script.lock().unwrap().push_back(Scripted::Ok);
		self
	}

	pub fn then_rejected(self, message: impl Into<String>) -> Self {
		self.script
			.lock()
			.unwrap()
			.push_back(Scripted::Rejected(message.into()));
		self
	}

	pub fn then_network(self, reason: impl Into<String>) -> Self {
		self.script
			.lock()
			.unwrap()
			.push_back(Scripted::Network(reason.into()));
		self
	}

	/// Number of submissions received so far.
	pub fn call_count(&self) -> usize {
		self.calls.lock().unwrap().len()
	}
}

#[async_trait]
impl VerifierInterface for MockVerifier {
	async fn submit_verification(
		&self,
		address: &Address,
		constructor_args: &[serde_json::Value],
	) -> Result<(), VerifierFailure> {
		self.calls
			.lock()
			.unwrap()
			.push((address.clone(), constructor_args.to_vec()));

		let mut script = self.script.lock().unwrap();
		let entry = if script.len() > 1 {
			script.pop_front().unwrap()
		} else {
			match script.front() {
				Some(_) => script.pop_front().unwrap(),
				None => return Ok(()),
			}
		};

		let result = match &entry {
			Scripted::Ok => Ok(()),
			Scripted::Rejected(message) => Err(VerifierFailure::Rejected(message.clone())),
			Scripted::Network(reason) => Err(VerifierFailure::Network(reason.clone())),
		};

		// Keep the final entry around for repeat calls.
		if script.is_empty() {
			script.push_back(entry);
		}

		result
	}
}
