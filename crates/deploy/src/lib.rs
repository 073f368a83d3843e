//! stakeup-deploy - Contract deployment library.
//!
//! This crate deploys a compiled contract (the `Staking` contract by default)
//! through an Ethereum JSON-RPC node and reports the address it landed at.
//!
//! # Example
//!
//! ```no_run
//! use stakeup_deploy::{DeployConfig, Deployer, ExecutionContext, HardhatArtifacts, RpcNode};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DeployConfig::default();
//! let node = RpcNode::new(&config)?;
//! let context = ExecutionContext::new(node.clone(), HardhatArtifacts::new(&config.artifacts), node);
//!
//! let report = Deployer::new(context).run().await?;
//! println!("{}", report.address());
//! # Ok(())
//! # }
//! ```

mod artifacts;
mod config;
mod context;
mod deployer;
mod error;
mod manifest;
pub mod rpc;

pub use artifacts::{Artifact, DEFAULT_ARTIFACTS_DIR, HardhatArtifacts};
pub use config::{
    CONFIG_FILENAME, DEFAULT_CONTRACT_NAME, DEFAULT_RPC_URL, DeployConfig, ENV_PREFIX,
    MAX_CONFIRMATIONS,
};
pub use context::{
    ArtifactRegistry, ContractDeployer, DeployedContract, ExecutionContext, Signer, SignerSource,
};
pub use deployer::Deployer;
pub use error::DeployError;
pub use manifest::{DeploymentManifest, DeploymentReport, bytecode_hash};
pub use rpc::RpcNode;
