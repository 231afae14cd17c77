//! End-to-end orchestrator tests against the in-process development chain.

use deployer_artifacts::MemoryArtifactSource;
use deployer_chains::MemoryChain;
use deployer_core::{
	DeployError, DeployRequest, DeploymentOrchestrator, InteractionCheck, OrchestratorBuilder,
	OrchestratorConfig,
};
use deployer_types::{
	Address, Artifact, DeliveryEvent, DependencySpec, DeployerEvent, DeploymentEvent,
	NetworkProfile,
};
use deployer_verification::{MockVerifier, VerificationService};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn artifact(name: &str) -> Artifact {
	Artifact {
		contract_name: name.to_string(),
		abi: json!([]),
		bytecode: vec![0x60, 0x80, 0x60, 0x40],
	}
}

fn artifacts() -> Arc<MemoryArtifactSource> {
	Arc::new(
		MemoryArtifactSource::new()
			.with_artifact(artifact("SimpleStorage"))
			.with_artifact(artifact("FundMe"))
			.with_artifact(artifact("MockV3Aggregator")),
	)
}

struct Setup {
	chain: Arc<MemoryChain>,
	orchestrator: DeploymentOrchestrator,
}

fn setup(profile: NetworkProfile, verifier: Option<MockVerifier>) -> Setup {
	setup_with_config(profile, verifier, OrchestratorConfig::default())
}

fn setup_with_config(
	profile: NetworkProfile,
	verifier: Option<MockVerifier>,
	config: OrchestratorConfig,
) -> Setup {
	let chain = Arc::new(MemoryChain::new(31337));
	let mut builder = OrchestratorBuilder::new()
		.with_chain(chain.clone())
		.with_artifacts(artifacts())
		.with_profile(profile)
		.with_config(config)
		.with_poll_interval(Duration::from_millis(10));

	if let Some(verifier) = verifier {
		builder = builder.with_verifier(Arc::new(VerificationService::new(Box::new(verifier))));
	}

	Setup {
		chain,
		orchestrator: builder.build().unwrap(),
	}
}

#[tokio::test]
async fn test_happy_path_without_verification() {
	let setup = setup(NetworkProfile::development(), None);
	let record = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();

	assert_eq!(record.contract, "SimpleStorage");
	assert!(!record.verified);
	assert!(record.constructor_args.is_empty());
	assert_eq!(record.contract_address.0.len(), 20);
	assert_eq!(
		setup.chain.contract_name(&record.contract_address).await,
		Some("SimpleStorage".to_string())
	);
}

#[tokio::test]
async fn test_read_write_read_interaction() {
	let setup = setup(NetworkProfile::development(), None);
	let orchestrator = setup.orchestrator;
	let mut events = orchestrator.events().subscribe();

	let request = DeployRequest::new("SimpleStorage").with_interaction(InteractionCheck {
		read_method: "retrieve".into(),
		write_method: "store".into(),
		write_args: vec![json!(7)],
	});
	orchestrator.deploy(&request).await.unwrap();

	let mut report = None;
	while let Ok(event) = events.try_recv() {
		if let DeployerEvent::Deployment(DeploymentEvent::InteractionChecked {
			report: checked,
			..
		}) = event
		{
			report = Some(checked);
		}
	}
	let report = report.expect("interaction report");
	assert_eq!(report.before, json!(0));
	assert_eq!(report.after, json!(7));
	assert_eq!(report.after.to_string(), "7");
}

#[tokio::test]
async fn test_verification_fatal_does_not_fail_deploy() {
	let verifier = MockVerifier::new().then_rejected("Invalid source code");
	let setup = setup(NetworkProfile::live(true), Some(verifier));
	let record = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();

	// Deployment stands; only the verified flag reflects the failure.
	assert!(!record.verified);
	assert_eq!(record.contract_address.0.len(), 20);
	assert_eq!(
		setup.chain.contract_name(&record.contract_address).await,
		Some("SimpleStorage".to_string())
	);
}

#[tokio::test]
async fn test_verification_success_flips_flag() {
	let verifier = MockVerifier::new().then_ok();
	let setup = setup(NetworkProfile::live(true), Some(verifier));
	let record = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();
	assert!(record.verified);
}

#[tokio::test]
async fn test_already_verified_counts_as_verified() {
	let verifier = MockVerifier::new().then_rejected("Contract source code already verified");
	let setup = setup(NetworkProfile::live(true), Some(verifier));
	let record = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();
	assert!(record.verified);
}

#[tokio::test]
async fn test_no_verification_on_development_network() {
	let verifier = MockVerifier::new().then_ok();
	let setup = setup(NetworkProfile::development(), Some(verifier));
	let record = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();
	assert!(!record.verified);
}

#[tokio::test]
async fn test_verify_on_deploy_disabled() {
	let verifier = MockVerifier::new().then_ok();
	let config = OrchestratorConfig {
		verify_on_deploy: false,
		..OrchestratorConfig::default()
	};
	let setup = setup_with_config(NetworkProfile::live(true), Some(verifier), config);
	let record = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();
	assert!(!record.verified);
}

#[tokio::test]
async fn test_mock_dependency_substitution() {
	let setup = setup(NetworkProfile::development(), None);
	let request = DeployRequest::new("FundMe").with_dependency(DependencySpec {
		name: "eth_usd_price_feed".into(),
		mock_artifact: Some("MockV3Aggregator".into()),
	});
	let record = setup.orchestrator.deploy(&request).await.unwrap();

	// The mock's address leads the constructor arguments.
	assert_eq!(record.constructor_args.len(), 1);
	let mock_address =
		Address::from_hex(record.constructor_args[0].as_str().unwrap()).unwrap();
	assert_eq!(
		setup.chain.contract_name(&mock_address).await,
		Some("MockV3Aggregator".to_string())
	);
	assert_ne!(mock_address, record.contract_address);
}

#[tokio::test]
async fn test_live_dependency_from_configuration() {
	let live_feed = Address(vec![0xaa; 20]);
	let config = OrchestratorConfig {
		dependency_addresses: HashMap::from([(
			"eth_usd_price_feed".to_string(),
			live_feed.clone(),
		)]),
		..OrchestratorConfig::default()
	};
	let setup = setup_with_config(NetworkProfile::live(false), None, config);

	let request = DeployRequest::new("FundMe").with_dependency(DependencySpec {
		name: "eth_usd_price_feed".into(),
		mock_artifact: Some("MockV3Aggregator".into()),
	});
	let record = setup.orchestrator.deploy(&request).await.unwrap();

	assert_eq!(
		record.constructor_args[0],
		json!(live_feed.to_string())
	);
}

#[tokio::test]
async fn test_missing_dependency_address_fails() {
	let setup = setup(NetworkProfile::live(false), None);
	let request = DeployRequest::new("FundMe").with_dependency(DependencySpec {
		name: "eth_usd_price_feed".into(),
		mock_artifact: None,
	});
	let err = setup.orchestrator.deploy(&request).await.unwrap_err();
	assert!(matches!(err, DeployError::UnknownDependency(_)));
}

#[tokio::test]
async fn test_confirmation_timeout_aborts_without_record() {
	let chain = Arc::new(MemoryChain::new(31337).with_manual_mining());
	let orchestrator = OrchestratorBuilder::new()
		.with_chain(chain.clone())
		.with_artifacts(artifacts())
		.with_profile(NetworkProfile::development())
		.with_config(OrchestratorConfig {
			confirmation_timeout: Some(Duration::from_millis(80)),
			..OrchestratorConfig::default()
		})
		.with_poll_interval(Duration::from_millis(10))
		.build()
		.unwrap();

	let err = orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap_err();
	assert!(matches!(err, DeployError::ConfirmationTimeout { .. }));
}

#[tokio::test]
async fn test_reverted_deploy_fails_distinctly() {
	let setup = setup(NetworkProfile::development(), None);
	setup.chain.revert_next_transaction().await;
	let err = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap_err();
	assert!(matches!(err, DeployError::ConfirmationFailed(_)));
}

#[tokio::test]
async fn test_rejected_submission_aborts() {
	let setup = setup(NetworkProfile::development(), None);
	setup.chain.reject_next_submission("malformed payload").await;
	let err = setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap_err();
	assert!(matches!(err, DeployError::Submission(_)));
}

#[tokio::test]
async fn test_unknown_artifact_fails() {
	let setup = setup(NetworkProfile::development(), None);
	let err = setup
		.orchestrator
		.deploy(&DeployRequest::new("DoesNotExist"))
		.await
		.unwrap_err();
	assert!(matches!(err, DeployError::Artifact(_)));
}

#[tokio::test]
async fn test_events_follow_stage_order() {
	let verifier = MockVerifier::new().then_ok();
	let setup = setup(NetworkProfile::live(true), Some(verifier));
	let mut events = setup.orchestrator.events().subscribe();

	setup
		.orchestrator
		.deploy(&DeployRequest::new("SimpleStorage"))
		.await
		.unwrap();

	let mut labels = Vec::new();
	while let Ok(event) = events.try_recv() {
		labels.push(match event {
			DeployerEvent::Delivery(DeliveryEvent::TransactionSubmitted { .. }) => "submitted",
			DeployerEvent::Delivery(DeliveryEvent::TransactionConfirmed { .. }) => "confirmed",
			DeployerEvent::Delivery(DeliveryEvent::TransactionFailed { .. }) => "failed",
			DeployerEvent::Verification(_) => "verified",
			DeployerEvent::Deployment(DeploymentEvent::Completed { .. }) => "completed",
			DeployerEvent::Deployment(DeploymentEvent::InteractionChecked { .. }) => "checked",
		});
	}
	assert_eq!(labels, vec!["submitted", "confirmed", "verified", "completed"]);
}
