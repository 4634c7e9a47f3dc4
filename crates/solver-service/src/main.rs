use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solver_config::{ConfigLoader, SolverConfig};
use solver_core::{reset_checkpoint, SolverEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{
	layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

#[derive(Parser)]
#[command(name = "oif-solver")]
#[command(about = "OIF cross-chain order solver", long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/local.toml")]
	config: PathBuf,

	/// Log filter; `RUST_LOG` takes precedence
	#[arg(long, env = "SOLVER_LOG_LEVEL")]
	log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the solver
	Start,
	/// Validate the configuration file
	Validate,
	/// Forget a chain's checkpoint so its listener replays from `start_block`
	ResetCheckpoint {
		/// Chain name as it appears under `[chains]`
		#[arg(long)]
		chain: String,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	let rust_log = std::env::var("RUST_LOG").ok();

	// Installed before the config is read so loader logs are kept; the
	// config's own level is applied once it is known.
	let filter = setup_tracing(log_directive(
		rust_log.as_deref(),
		cli.log_level.as_deref(),
		None,
	));

	let config = load_config(&cli.config).await?;

	if let Some(configured) = &config.solver.log_level {
		let directive = log_directive(
			rust_log.as_deref(),
			cli.log_level.as_deref(),
			Some(configured.as_str()),
		);
		filter
			.reload(EnvFilter::new(directive))
			.context("Failed to apply configured log level")?;
	}

	match cli.command {
		Some(Commands::Start) | None => start_solver(config).await,
		Some(Commands::Validate) => {
			print_summary(&cli.config, &config);
			Ok(())
		}
		Some(Commands::ResetCheckpoint { chain }) => reset_checkpoint(&config, &chain)
			.await
			.with_context(|| format!("Failed to reset checkpoint for '{}'", chain)),
	}
}

async fn load_config(path: &Path) -> Result<SolverConfig> {
	ConfigLoader::new()
		.with_file(path)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn start_solver(config: SolverConfig) -> Result<()> {
	info!(
		solver = %config.solver.name,
		chains = config.chains.len(),
		"Starting OIF solver"
	);

	let engine = Arc::new(SolverEngine::from_config(config).context("Failed to build solver")?);

	let mut runner = {
		let engine = engine.clone();
		tokio::spawn(async move { engine.run().await })
	};

	tokio::select! {
		result = &mut runner => {
			return result
				.context("Solver task panicked")?
				.context("Solver stopped unexpectedly");
		}
		_ = shutdown_signal() => {
			info!("Shutdown signal received, stopping listeners");
		}
	}

	engine.shutdown().await.context("Failed to shut down solver")?;
	runner
		.await
		.context("Solver task panicked")?
		.context("Solver failed while stopping")?;

	info!("OIF solver stopped");
	Ok(())
}

fn print_summary(path: &Path, config: &SolverConfig) {
	info!(path = %path.display(), "Configuration is valid");
	info!(
		solver = %config.solver.name,
		storage = ?config.storage.backend,
		"Solver settings"
	);
	for (name, chain) in &config.chains {
		info!(
			chain = %name,
			family = %chain.family,
			chain_id = chain.chain_id,
			listen = chain.listen,
			fills = chain.relayer_url.is_some() || chain.family == solver_types::ChainFamily::Evm,
			"Chain"
		);
	}
}

/// Picks the log filter: `RUST_LOG`, then the flag or `SOLVER_LOG_LEVEL`,
/// then the config file, then `info`.
fn log_directive<'a>(
	rust_log: Option<&'a str>,
	flag: Option<&'a str>,
	configured: Option<&'a str>,
) -> &'a str {
	[rust_log, flag, configured]
		.into_iter()
		.flatten()
		.find(|directive| !directive.trim().is_empty())
		.unwrap_or("info")
}

fn setup_tracing(directive: &str) -> reload::Handle<EnvFilter, Registry> {
	let (filter, handle) = reload::Layer::new(EnvFilter::new(directive));

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	handle
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!(error = %e, "Failed to listen for Ctrl+C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				warn!(error = %e, "Failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
