use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::Parser;
use stakeup_deploy::DeployConfig;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Command line interface.
///
/// Deployment settings left unset here fall back to the configuration file,
/// then to `STAKEUP_*` environment variables, then to built-in defaults.
#[derive(Parser)]
#[command(name = "stakeup")]
#[command(
    author,
    version,
    about = "Deploy the Staking contract through an Ethereum JSON-RPC node"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "STAKEUP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a Stakeup.toml configuration file.
    ///
    /// If not provided, ./Stakeup.toml is used when it exists.
    #[arg(long, alias = "conf", env = "STAKEUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// The URL of the JSON-RPC endpoint to deploy through.
    ///
    /// Defaults to a local node at http://127.0.0.1:8545.
    #[arg(long, alias = "rpc")]
    pub rpc_url: Option<Url>,

    /// The directory holding the compiled contract artifacts.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// The contract to deploy, bare (Staking) or fully qualified
    /// (contracts/Staking.sol:Staking).
    #[arg(long, alias = "name")]
    pub contract: Option<String>,

    /// Deploy from this unlocked account instead of the node's first one.
    #[arg(long)]
    pub from: Option<Address>,

    /// The number of confirmations to wait for, including the inclusion block.
    #[arg(long)]
    pub confirmations: Option<u64>,

    /// Write a JSON deployment manifest to this path after a successful deployment.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

impl Cli {
    /// Override configuration values with the flags that were passed.
    pub fn apply(&self, config: &mut DeployConfig) {
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc_url = rpc_url.clone();
        }
        if let Some(artifacts) = &self.artifacts {
            config.artifacts = artifacts.clone();
        }
        if let Some(contract) = &self.contract {
            config.contract = contract.clone();
        }
        if let Some(from) = self.from {
            config.from = Some(from);
        }
        if let Some(confirmations) = self.confirmations {
            config.confirmations = confirmations;
        }
        if let Some(manifest) = &self.manifest {
            config.manifest = Some(manifest.clone());
        }
    }
}
