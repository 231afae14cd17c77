// deployer-core/src/engine.rs

use crate::error::DeployError;
use deployer_artifacts::ArtifactSource;
use deployer_delivery::DeliveryService;
use deployer_types::{
	Address, Artifact, ChainClient, ConfirmationResult, DeliveryEvent, DependencySpec,
	DeployerEvent, DeploymentEvent, DeploymentRecord, EventBus, InteractionReport, NetworkProfile,
	TransactionHandle, TransactionRequest, TransactionStatus, VerificationEvent,
};
use deployer_verification::VerificationService;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Orchestrator-level settings, independent of which network is targeted.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
	/// Confirmations required before any transaction counts as final.
	pub required_confirmations: u64,
	/// Whether deployments attempt explorer verification at all.
	pub verify_on_deploy: bool,
	/// Upper bound on one confirmation wait; `None` uses the delivery
	/// service default.
	pub confirmation_timeout: Option<Duration>,
	/// Live addresses of collaborator contracts, keyed by dependency name.
	pub dependency_addresses: HashMap<String, Address>,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			required_confirmations: 1,
			verify_on_deploy: true,
			confirmation_timeout: None,
			dependency_addresses: HashMap::new(),
		}
	}
}

/// One deployment to perform.
#[derive(Debug, Clone)]
pub struct DeployRequest {
	pub contract: String,
	/// Explicit constructor arguments, appended after resolved dependencies.
	/// Contracts without a constructor leave this empty.
	pub constructor_args: Vec<serde_json::Value>,
	/// Collaborator contracts whose addresses become leading constructor
	/// arguments.
	pub dependencies: Vec<DependencySpec>,
	/// Optional post-deploy read/write/read check.
	pub interaction: Option<InteractionCheck>,
}

impl DeployRequest {
	pub fn new(contract: impl Into<String>) -> Self {
		Self {
			contract: contract.into(),
			constructor_args: Vec::new(),
			dependencies: Vec::new(),
			interaction: None,
		}
	}

	pub fn with_args(mut self, args: Vec<serde_json::Value>) -> Self {
		self.constructor_args = args;
		self
	}

	pub fn with_dependency(mut self, dependency: DependencySpec) -> Self {
		self.dependencies.push(dependency);
		self
	}

	pub fn with_interaction(mut self, interaction: InteractionCheck) -> Self {
		self.interaction = Some(interaction);
		self
	}
}

/// Post-deploy smoke check: read a value, change it, read it back.
#[derive(Debug, Clone)]
pub struct InteractionCheck {
	pub read_method: String,
	pub write_method: String,
	pub write_args: Vec<serde_json::Value>,
}

/// Output of the submit stage.
pub struct SubmittedDeployment {
	pub handle: TransactionHandle,
}

/// Output of the confirmation stage.
pub struct ConfirmedDeployment {
	pub handle: TransactionHandle,
	pub contract_address: Address,
	pub block_number: u64,
	pub confirmations: u64,
}

/// Core orchestrator sequencing deployments through their stages.
pub struct DeploymentOrchestrator {
	chain: Arc<dyn ChainClient>,
	delivery: DeliveryService,
	artifacts: Arc<dyn ArtifactSource>,
	verifier: Option<Arc<VerificationService>>,
	profile: NetworkProfile,
	config: OrchestratorConfig,
	event_bus: EventBus,
}

impl DeploymentOrchestrator {
	/// Event bus carrying lifecycle events for this orchestrator.
	pub fn events(&self) -> &EventBus {
		&self.event_bus
	}

	/// Runs one deployment to completion.
	///
	/// Submission and confirmation failures abort and surface as errors; a
	/// failed verification does not. The returned record is the single
	/// source of truth for what was deployed.
	pub async fn deploy(&self, request: &DeployRequest) -> Result<DeploymentRecord, DeployError> {
		info!(contract = %request.contract, "Deploying contract");

		let artifact = self.artifacts.load(&request.contract).await?;
		let args = self.resolve_constructor_args(request).await?;

		let submitted = self.submit_stage(&artifact, args.clone()).await?;
		let confirmed = self.confirm_stage(&submitted.handle).await?;

		let mut record = DeploymentRecord {
			id: uuid::Uuid::new_v4(),
			contract: request.contract.clone(),
			contract_address: confirmed.contract_address.clone(),
			transaction: confirmed.handle.clone(),
			verified: false,
			constructor_args: args,
			block_number: confirmed.block_number,
			deployed_at: chrono::Utc::now().timestamp() as u64,
		};

		info!(
			contract = %record.contract,
			address = %record.contract_address,
			"Deployed contract"
		);

		self.verify_stage(&mut record).await;

		self.event_bus
			.publish(DeployerEvent::Deployment(DeploymentEvent::Completed {
				record: record.clone(),
			}));

		if let Some(check) = &request.interaction {
			let report = self
				.interact_stage(&artifact, &record.contract_address, check)
				.await?;
			self.event_bus.publish(DeployerEvent::Deployment(
				DeploymentEvent::InteractionChecked {
					contract_address: record.contract_address.clone(),
					report,
				},
			));
		}

		Ok(record)
	}

	/// Resolves the full constructor argument list for a request.
	///
	/// Dependencies come first, in declaration order, then the explicit
	/// arguments. On networks that require mocks, each dependency with a
	/// mock artifact is deployed fresh and its address substituted;
	/// otherwise the configured live address is used.
	pub async fn resolve_constructor_args(
		&self,
		request: &DeployRequest,
	) -> Result<Vec<serde_json::Value>, DeployError> {
		let mut resolved = Vec::new();

		for dependency in &request.dependencies {
			let address = if self.profile.requires_mock_dependencies {
				match &dependency.mock_artifact {
					Some(mock_name) => self.deploy_mock(mock_name).await?,
					None => self.configured_dependency(&dependency.name)?,
				}
			} else {
				self.configured_dependency(&dependency.name)?
			};
			resolved.push(serde_json::Value::String(address.to_string()));
		}

		resolved.extend(request.constructor_args.iter().cloned());
		Ok(resolved)
	}

	fn configured_dependency(&self, name: &str) -> Result<Address, DeployError> {
		self.config
			.dependency_addresses
			.get(name)
			.cloned()
			.ok_or_else(|| DeployError::UnknownDependency(name.to_string()))
	}

	/// Deploys a mock collaborator and returns its address.
	async fn deploy_mock(&self, artifact_name: &str) -> Result<Address, DeployError> {
		info!(contract = %artifact_name, "Deploying mock dependency");
		let artifact = self.artifacts.load(artifact_name).await?;
		let submitted = self.submit_stage(&artifact, Vec::new()).await?;
		let confirmed = self.confirm_stage(&submitted.handle).await?;
		Ok(confirmed.contract_address)
	}

	/// Stage 1: submit the deploy transaction.
	pub async fn submit_stage(
		&self,
		artifact: &Artifact,
		args: Vec<serde_json::Value>,
	) -> Result<SubmittedDeployment, DeployError> {
		let handle = self
			.delivery
			.submit(TransactionRequest::deploy(artifact.clone(), args))
			.await?;

		self.event_bus
			.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionSubmitted {
				hash: handle.hash.clone(),
			}));

		Ok(SubmittedDeployment { handle })
	}

	/// Stage 2: wait until the deploy transaction is final.
	///
	/// Anything but `Confirmed` aborts the deployment; no partial record
	/// escapes this stage.
	pub async fn confirm_stage(
		&self,
		handle: &TransactionHandle,
	) -> Result<ConfirmedDeployment, DeployError> {
		let result = self
			.delivery
			.wait_for_confirmations(
				handle,
				self.config.required_confirmations,
				self.config.confirmation_timeout,
			)
			.await?;

		let (confirmations, block_number) = match result {
			ConfirmationResult::Confirmed {
				confirmations,
				block_number,
			} => (confirmations, block_number),
			other => {
				self.event_bus
					.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionFailed {
						hash: handle.hash.clone(),
						result: other.clone(),
					}));
				return Err(match other {
					ConfirmationResult::TimedOut => DeployError::ConfirmationTimeout {
						required: self.config.required_confirmations,
					},
					ConfirmationResult::Failed(reason) => {
						DeployError::ConfirmationFailed(reason)
					}
					ConfirmationResult::Confirmed { .. } => unreachable!(),
				});
			}
		};

		let contract_address = match self.chain.transaction_status(&handle.hash).await? {
			TransactionStatus::Mined(receipt) => receipt.contract_address,
			_ => None,
		}
		.ok_or_else(|| DeployError::MissingContractAddress(handle.hash.to_string()))?;

		self.event_bus
			.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionConfirmed {
				hash: handle.hash.clone(),
				confirmations,
				block_number,
			}));

		Ok(ConfirmedDeployment {
			handle: handle.clone(),
			contract_address,
			block_number,
			confirmations,
		})
	}

	/// Stage 3: explorer verification.
	///
	/// Only runs when enabled, off development networks, with a credential
	/// configured. Failures are recorded and logged, never propagated; the
	/// deployment stands either way.
	pub async fn verify_stage(&self, record: &mut DeploymentRecord) {
		if !self.config.verify_on_deploy || !self.profile.should_verify() {
			return;
		}

		let verifier = match &self.verifier {
			Some(verifier) => verifier,
			None => return,
		};

		let outcome = verifier
			.verify(&record.contract_address, &record.constructor_args)
			.await;

		record.verified = outcome.is_verified();
		if !record.verified {
			warn!(
				contract = %record.contract,
				address = %record.contract_address,
				"Verification did not complete: {:?}",
				outcome
			);
		}

		self.event_bus
			.publish(DeployerEvent::Verification(VerificationEvent::Completed {
				contract_address: record.contract_address.clone(),
				outcome,
			}));
	}

	/// Stage 4: read/write/read smoke check against the deployed contract.
	///
	/// The write follows the same confirmation contract as the deployment
	/// itself.
	pub async fn interact_stage(
		&self,
		artifact: &Artifact,
		contract_address: &Address,
		check: &InteractionCheck,
	) -> Result<InteractionReport, DeployError> {
		let before = self
			.chain
			.call(contract_address, &artifact.abi, &check.read_method, &[])
			.await?;
		info!(method = %check.read_method, value = %before, "Current value");

		let handle = self
			.delivery
			.submit(TransactionRequest::call(
				contract_address.clone(),
				artifact.abi.clone(),
				check.write_method.as_str(),
				check.write_args.clone(),
			))
			.await?;
		self.event_bus
			.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionSubmitted {
				hash: handle.hash.clone(),
			}));
		self.confirm_stage_for_call(&handle).await?;

		let after = self
			.chain
			.call(contract_address, &artifact.abi, &check.read_method, &[])
			.await?;
		info!(method = %check.read_method, value = %after, "Updated value");

		Ok(InteractionReport { before, after })
	}

	/// Confirmation wait for non-deploy transactions; no address expected.
	async fn confirm_stage_for_call(&self, handle: &TransactionHandle) -> Result<(), DeployError> {
		let result = self
			.delivery
			.wait_for_confirmations(
				handle,
				self.config.required_confirmations,
				self.config.confirmation_timeout,
			)
			.await?;

		match result {
			ConfirmationResult::Confirmed {
				confirmations,
				block_number,
			} => {
				self.event_bus
					.publish(DeployerEvent::Delivery(DeliveryEvent::TransactionConfirmed {
						hash: handle.hash.clone(),
						confirmations,
						block_number,
					}));
				Ok(())
			}
			ConfirmationResult::TimedOut => Err(DeployError::ConfirmationTimeout {
				required: self.config.required_confirmations,
			}),
			ConfirmationResult::Failed(reason) => Err(DeployError::ConfirmationFailed(reason)),
		}
	}
}

/// Builder for DeploymentOrchestrator
pub struct OrchestratorBuilder {
	chain: Option<Arc<dyn ChainClient>>,
	artifacts: Option<Arc<dyn ArtifactSource>>,
	verifier: Option<Arc<VerificationService>>,
	profile: Option<NetworkProfile>,
	config: OrchestratorConfig,
	poll_interval: Option<Duration>,
	event_capacity: usize,
}

impl OrchestratorBuilder {
	pub fn new() -> Self {
		Self {
			chain: None,
			artifacts: None,
			verifier: None,
			profile: None,
			config: OrchestratorConfig::default(),
			poll_interval: None,
			event_capacity: 64,
		}
	}

	pub fn with_chain(mut self, chain: Arc<dyn ChainClient>) -> Self {
		self.chain = Some(chain);
		self
	}

	pub fn with_artifacts(mut self, artifacts: Arc<dyn ArtifactSource>) -> Self {
		self.artifacts = Some(artifacts);
		self
	}

	pub fn with_verifier(mut self, verifier: Arc<VerificationService>) -> Self {
		self.verifier = Some(verifier);
		self
	}

	pub fn with_profile(mut self, profile: NetworkProfile) -> Self {
		self.profile = Some(profile);
		self
	}

	pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = Some(interval);
		self
	}

	pub fn build(self) -> Result<DeploymentOrchestrator, DeployError> {
		let chain = self
			.chain
			.ok_or_else(|| DeployError::Configuration("No chain client configured".into()))?;
		let artifacts = self
			.artifacts
			.ok_or_else(|| DeployError::Configuration("No artifact source configured".into()))?;
		let profile = self
			.profile
			.ok_or_else(|| DeployError::Configuration("No network profile configured".into()))?;

		let mut delivery = DeliveryService::new(chain.clone());
		if let Some(interval) = self.poll_interval {
			delivery = delivery.with_poll_interval(interval);
		}
		if let Some(timeout) = self.config.confirmation_timeout {
			delivery = delivery.with_default_timeout(timeout);
		}

		Ok(DeploymentOrchestrator {
			chain,
			delivery,
			artifacts,
			verifier: self.verifier,
			profile,
			config: self.config,
			event_bus: EventBus::new(self.event_capacity),
		})
	}
}

impl Default for OrchestratorBuilder {
	fn default() -> Self {
		Self::new()
	}
}
