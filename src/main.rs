use anyhow::{Context, Result};
use clap::Parser;
use slsdeploy::{
    cli::{Cli, Commands, ServiceArgs},
    config::Config,
    descriptor::ServiceDescriptor,
    service::Orchestrator,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Deploy { service } => {
            let mut orchestrator = open(service)?;
            let stack_id = orchestrator.stack_id();
            orchestrator
                .deploy()
                .await
                .with_context(|| format!("Failed to deploy {}", stack_id))?;

            for (key, function) in orchestrator.functions() {
                info!("Function {}: {}", key, function.name);
            }
            // Run suffix goes last on stdout
            println!("{}", orchestrator.run_suffix());
        }
        Commands::Remove { service } => {
            let orchestrator = open(service)?;
            let stack_id = orchestrator.stack_id();
            orchestrator
                .remove()
                .await
                .with_context(|| format!("Failed to remove {}", stack_id))?;
        }
        Commands::List { service } => {
            let orchestrator = open(service)?;
            let stack_id = orchestrator.stack_id();
            orchestrator
                .list_functions()
                .await
                .with_context(|| format!("Failed to list functions of {}", stack_id))?;
        }
        Commands::Info { service } => {
            let config = Config::load()?;
            let provider = service.provider.unwrap_or(config.provider);
            let descriptor = ServiceDescriptor::load(service_dir(&service.path), &provider)
                .context("Failed to load service descriptor")?;

            println!("{}", serde_json::to_string_pretty(&descriptor.summary())?);
        }
        Commands::Version => {
            println!("slsdeploy {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn service_dir(path: &Option<PathBuf>) -> PathBuf {
    path.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Build an orchestrator from the config file overlaid with command-line flags
fn open(service: ServiceArgs) -> Result<Orchestrator> {
    let config = Config::load().context("Failed to load config")?;
    let dir = service_dir(&service.path);
    let provider = service.provider.unwrap_or(config.provider);

    let mut options = config.options;
    options.extend(service.options);

    let orchestrator = Orchestrator::new(&provider, &dir)
        .with_context(|| format!("Failed to load service at {:?}", dir))?
        .with_retry_policy(config.retry.policy())
        .with_options(options);

    info!(
        "Loaded service {} (project: {}, stage: {})",
        orchestrator.stack_id(),
        orchestrator.project(),
        orchestrator.stage()
    );
    Ok(orchestrator)
}
