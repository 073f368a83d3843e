//! The execution context a [`Deployer`](crate::Deployer) runs against.
//!
//! The context is passed in explicitly at construction time. Each collaborator
//! sits behind a trait so that tests can substitute doubles for the node and
//! the artifact store.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Artifact, DeployError};

/// An account identity able to authorize a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signer {
    pub address: Address,
}

impl From<Address> for Signer {
    fn from(address: Address) -> Self {
        Self { address }
    }
}

/// A contract instance confirmed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    /// Address the contract was created at.
    pub address: Address,
    /// Hash of the creation transaction.
    pub tx_hash: B256,
    /// Block the creation transaction was included in.
    pub block_number: u64,
    /// Chain the contract lives on.
    pub chain_id: u64,
}

/// Source of signing accounts.
pub trait SignerSource: Send + Sync {
    /// All signers available, in preference order. The first one is the default.
    fn signers(&self) -> impl Future<Output = Result<Vec<Signer>>> + Send;
}

/// Registry of compiled contract artifacts, keyed by name.
pub trait ArtifactRegistry: Send + Sync {
    /// Resolve the artifact for a bare or fully qualified contract name.
    fn resolve(&self, name: &str) -> Result<Artifact, DeployError>;
}

/// Submits contract-creation transactions and waits for their confirmation.
pub trait ContractDeployer: Send + Sync {
    /// Deploy `artifact` with no constructor arguments, signed by `signer`.
    ///
    /// `code` is the creation code already decoded from the artifact by
    /// [`Artifact::ensure_deployable`]. Resolves once the contract is confirmed
    /// on chain.
    fn deploy(
        &self,
        signer: &Signer,
        artifact: &Artifact,
        code: &Bytes,
    ) -> impl Future<Output = Result<DeployedContract>> + Send;
}

/// Everything a deployment needs from its environment.
#[derive(Debug, Clone)]
pub struct ExecutionContext<S, R, D> {
    pub signers: S,
    pub artifacts: R,
    pub chain: D,
}

impl<S, R, D> ExecutionContext<S, R, D>
where
    S: SignerSource,
    R: ArtifactRegistry,
    D: ContractDeployer,
{
    pub fn new(signers: S, artifacts: R, chain: D) -> Self {
        Self {
            signers,
            artifacts,
            chain,
        }
    }
}
