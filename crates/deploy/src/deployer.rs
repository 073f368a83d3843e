use std::path::PathBuf;

use crate::{
    ArtifactRegistry, ContractDeployer, DeployError, DeploymentManifest, DeploymentReport,
    ExecutionContext, SignerSource, config::DEFAULT_CONTRACT_NAME, manifest::bytecode_hash,
};

/// Deploys a single compiled contract from the default signer.
///
/// The flow is linear: acquire signer, resolve the artifact, deploy with no
/// constructor arguments, wait for confirmation, log the address. Nothing is
/// retried and nothing is deduplicated: every call to [`Deployer::run`]
/// submits a fresh creation transaction.
#[derive(Debug, Clone)]
pub struct Deployer<S, R, D> {
    context: ExecutionContext<S, R, D>,
    contract: String,
    manifest: Option<PathBuf>,
}

impl<S, R, D> Deployer<S, R, D>
where
    S: SignerSource,
    R: ArtifactRegistry,
    D: ContractDeployer,
{
    /// Create a deployer for the `Staking` contract.
    pub fn new(context: ExecutionContext<S, R, D>) -> Self {
        Self {
            context,
            contract: DEFAULT_CONTRACT_NAME.to_string(),
            manifest: None,
        }
    }

    /// Deploy `name` instead of `Staking`. Accepts bare or fully qualified names.
    pub fn contract(mut self, name: impl Into<String>) -> Self {
        self.contract = name.into();
        self
    }

    /// Persist a [`DeploymentManifest`] at `path` after a successful deployment.
    pub fn manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    pub fn context(&self) -> &ExecutionContext<S, R, D> {
        &self.context
    }

    pub async fn run(&self) -> Result<DeploymentReport, DeployError> {
        let signer = self
            .context
            .signers
            .signers()
            .await
            .map_err(DeployError::Provider)?
            .into_iter()
            .next()
            .ok_or(DeployError::NoSignerAvailable)?;

        tracing::info!("Deploying contracts with: {}", signer.address);

        let artifact = self.context.artifacts.resolve(&self.contract)?;
        let code = artifact.ensure_deployable()?;

        tracing::debug!(
            contract = %artifact.fully_qualified_name(),
            code_size = code.len(),
            "Submitting deployment"
        );

        let deployed = self
            .context
            .chain
            .deploy(&signer, &artifact, &code)
            .await
            .map_err(|source| DeployError::DeploymentFailed {
                name: self.contract.clone(),
                source,
            })?;

        tracing::info!("{} deployed to: {}", artifact.contract_name, deployed.address);

        let report = DeploymentReport {
            contract: self.contract.clone(),
            deployer: signer.address,
            deployed,
            bytecode_hash: bytecode_hash(&code),
        };

        if let Some(path) = &self.manifest {
            DeploymentManifest::new(report.clone())
                .save_to_file(path)
                .map_err(DeployError::Manifest)?;
        }

        Ok(report)
    }
}
