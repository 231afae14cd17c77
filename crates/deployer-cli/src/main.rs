use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deployer_artifacts::FileArtifactSource;
use deployer_chains::{EvmChain, MemoryChain};
use deployer_config::{BackoffKind, ConfigLoader, DeployerConfig};
use deployer_core::{
	DeployRequest, DeploymentOrchestrator, InteractionCheck, OrchestratorBuilder,
	OrchestratorConfig,
};
use deployer_types::{Address, ChainClient, DependencySpec};
use deployer_verification::{
	Backoff, EtherscanVerifier, RetryPolicy, VerificationService,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "contract-deployer")]
#[command(about = "Contract deployment lifecycle orchestrator", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	#[arg(long, env = "DEPLOYER_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Deploy a contract and wait for confirmations
	Deploy {
		/// Contract name; its artifact must exist in the artifact directory
		contract: String,

		/// Constructor argument, repeatable; parsed as JSON with plain-string fallback
		#[arg(long = "arg")]
		args: Vec<String>,

		/// Dependency as `name` or `name:MockArtifact`, repeatable
		#[arg(long = "dependency")]
		dependencies: Vec<String>,

		/// Read method of the post-deploy check
		#[arg(long, requires = "write_method")]
		read_method: Option<String>,

		/// Write method of the post-deploy check
		#[arg(long, requires = "read_method")]
		write_method: Option<String>,

		/// Argument for the write method, repeatable
		#[arg(long = "write-arg")]
		write_args: Vec<String>,
	},
	/// Verify an already deployed contract
	Verify {
		/// Address of the deployed contract
		address: String,

		/// Constructor argument, repeatable
		#[arg(long = "arg")]
		args: Vec<String>,
	},
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.context("Failed to load configuration")?;

	match cli.command {
		Commands::Deploy {
			contract,
			args,
			dependencies,
			read_method,
			write_method,
			write_args,
		} => {
			let request = build_request(
				contract,
				args,
				dependencies,
				read_method,
				write_method,
				write_args,
			)?;
			deploy(config, request).await
		}
		Commands::Verify { address, args } => verify(config, address, args).await,
		Commands::Validate => validate(config),
	}
}

async fn deploy(config: DeployerConfig, request: DeployRequest) -> Result<()> {
	info!(
		deployer = %config.deployer.name,
		network = %config.network.name,
		"Starting deployment"
	);

	let orchestrator = build_orchestrator(&config)?;

	let record = orchestrator
		.deploy(&request)
		.await
		.context("Deployment failed")?;

	println!("{}", serde_json::to_string_pretty(&record)?);
	Ok(())
}

async fn verify(config: DeployerConfig, address: String, args: Vec<String>) -> Result<()> {
	let address = Address::from_hex(&address).context("Invalid contract address")?;
	let args: Vec<serde_json::Value> = args.iter().map(|s| parse_value(s)).collect();

	let service =
		build_verifier(&config).context("No explorer configured for this network")?;

	let outcome = service.verify(&address, &args).await;
	println!("{}", serde_json::to_string_pretty(&outcome)?);

	if !outcome.is_verified() {
		bail!("Verification did not complete: {:?}", outcome);
	}
	Ok(())
}

fn validate(config: DeployerConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Deployer name: {}", config.deployer.name);
	info!(
		"Network: {} (chain id {})",
		config.network.name, config.network.chain_id
	);
	info!(
		"Required confirmations: {}",
		config.network.required_confirmations
	);

	let profile = config.network_profile();
	info!("Development network: {}", profile.is_development);
	info!("Explorer configured: {}", profile.explorer_configured);
	info!(
		"Verification on deploy: {}",
		config.verification.enabled && profile.should_verify()
	);

	Ok(())
}

fn build_request(
	contract: String,
	args: Vec<String>,
	dependencies: Vec<String>,
	read_method: Option<String>,
	write_method: Option<String>,
	write_args: Vec<String>,
) -> Result<DeployRequest> {
	let mut request =
		DeployRequest::new(contract).with_args(args.iter().map(|s| parse_value(s)).collect());

	for dependency in dependencies {
		let (name, mock) = match dependency.split_once(':') {
			Some((name, mock)) => (name.to_string(), Some(mock.to_string())),
			None => (dependency, None),
		};
		request = request.with_dependency(DependencySpec {
			name,
			mock_artifact: mock,
		});
	}

	if let (Some(read_method), Some(write_method)) = (read_method, write_method) {
		request = request.with_interaction(InteractionCheck {
			read_method,
			write_method,
			write_args: write_args.iter().map(|s| parse_value(s)).collect(),
		});
	}

	Ok(request)
}

fn build_orchestrator(config: &DeployerConfig) -> Result<DeploymentOrchestrator> {
	let chain = build_chain(config)?;

	let mut dependency_addresses = HashMap::new();
	for (name, hex) in &config.network.dependencies {
		let address = Address::from_hex(hex)
			.with_context(|| format!("Invalid address for dependency {}", name))?;
		dependency_addresses.insert(name.clone(), address);
	}

	let orchestrator_config = OrchestratorConfig {
		required_confirmations: config.network.required_confirmations,
		verify_on_deploy: config.verification.enabled,
		confirmation_timeout: Some(Duration::from_secs(config.network.confirmation_timeout_secs)),
		dependency_addresses,
	};

	let mut builder = OrchestratorBuilder::new()
		.with_chain(chain)
		.with_artifacts(Arc::new(FileArtifactSource::new(&config.artifacts.dir)))
		.with_profile(config.network_profile())
		.with_config(orchestrator_config)
		.with_poll_interval(Duration::from_millis(config.network.poll_interval_ms));

	if let Some(verifier) = build_verifier(config) {
		builder = builder.with_verifier(Arc::new(verifier));
	}

	builder.build().context("Failed to build orchestrator")
}

fn build_chain(config: &DeployerConfig) -> Result<Arc<dyn ChainClient>> {
	if config.network.development {
		info!("Using in-process development chain");
		return Ok(Arc::new(MemoryChain::new(config.network.chain_id)));
	}

	let rpc_url = config
		.network
		.rpc_url
		.as_deref()
		.context("Missing RPC endpoint")?;
	let private_key = config
		.network
		.private_key
		.as_deref()
		.context("Missing signing key")?;

	let chain = EvmChain::new(rpc_url, config.network.chain_id, private_key)
		.context("Failed to connect chain client")?;
	Ok(Arc::new(chain))
}

fn build_verifier(config: &DeployerConfig) -> Option<VerificationService> {
	let explorer = config.explorer.as_ref()?;

	let backoff = match config.verification.backoff {
		BackoffKind::Fixed => Backoff::Fixed(Duration::from_millis(
			config.verification.backoff_initial_ms,
		)),
		BackoffKind::Exponential => Backoff::Exponential {
			initial: Duration::from_millis(config.verification.backoff_initial_ms),
		},
	};

	let provider = EtherscanVerifier::new(explorer.api_url.clone(), explorer.api_key.clone());
	Some(
		VerificationService::new(Box::new(provider)).with_policy(RetryPolicy {
			max_attempts: config.verification.max_attempts,
			backoff,
		}),
	)
}

fn parse_value(raw: &str) -> serde_json::Value {
	serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
