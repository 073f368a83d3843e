//! stakeup deploys the Staking contract through an Ethereum JSON-RPC node.

mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use cli::Cli;
use stakeup_deploy::{
    DeployConfig, DeployError, Deployer, DeploymentReport, ExecutionContext, HardhatArtifacts,
    RpcNode,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger. Warnings and errors go to stderr, the rest to stdout.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(
            std::io::stderr
                .with_max_level(tracing::Level::WARN)
                .or_else(std::io::stdout),
        )
        .init();

    match deploy(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if err
                .downcast_ref::<DeployError>()
                .is_some_and(DeployError::after_submission)
            {
                tracing::warn!(
                    "A deployment transaction may already have been mined, check the node before retrying"
                );
            }
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn deploy(cli: Cli) -> Result<DeploymentReport> {
    let mut config = DeployConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    tracing::debug!(
        rpc_url = %config.rpc_url,
        artifacts = %config.artifacts.display(),
        contract = %config.contract,
        confirmations = config.confirmations,
        "Starting deployment..."
    );

    let node = RpcNode::new(&config)?;
    let context = ExecutionContext::new(
        node.clone(),
        HardhatArtifacts::new(&config.artifacts),
        node,
    );

    let mut deployer = Deployer::new(context).contract(&config.contract);
    if let Some(path) = &config.manifest {
        deployer = deployer.manifest(path);
    }

    Ok(deployer.run().await?)
}
