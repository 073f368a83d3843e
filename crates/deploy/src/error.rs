//! Error taxonomy for a deployment run.

/// Failure of a [`Deployer::run`](crate::Deployer::run).
///
/// Every variant is terminal: the deployer never retries and never recovers
/// locally.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The execution context exposed no signing account.
    #[error("no signer available: the provider exposes no unlocked account")]
    NoSignerAvailable,

    /// The signer source could not be queried at all.
    #[error("failed to query signer accounts from the provider")]
    Provider(#[source] anyhow::Error),

    /// No compiled artifact is registered under the requested name.
    #[error("artifact for contract `{name}` not found, was it compiled?")]
    ArtifactNotFound { name: String },

    /// The artifacts directory exists but could not be scanned.
    #[error("failed to read the artifacts directory")]
    ArtifactStore(#[source] anyhow::Error),

    /// A bare contract name matched more than one artifact.
    #[error(
        "contract name `{name}` is ambiguous, use one of the fully qualified names: {}",
        .candidates.join(", ")
    )]
    AmbiguousArtifact {
        name: String,
        candidates: Vec<String>,
    },

    /// The artifact exists but cannot be deployed with zero constructor arguments.
    #[error("artifact for contract `{name}` cannot be deployed: {reason}")]
    InvalidArtifact { name: String, reason: String },

    /// Submitting or confirming the deployment transaction failed.
    #[error("deployment of contract `{name}` failed")]
    DeploymentFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// The contract was deployed but the manifest could not be written.
    #[error("failed to write deployment manifest")]
    Manifest(#[source] anyhow::Error),
}

impl DeployError {
    /// Whether a deployment transaction may already have been submitted when
    /// this error was produced.
    pub fn after_submission(&self) -> bool {
        matches!(self, Self::DeploymentFailed { .. } | Self::Manifest(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = DeployError::AmbiguousArtifact {
            name: "Staking".to_string(),
            candidates: vec![
                "contracts/Staking.sol:Staking".to_string(),
                "contracts/v2/Staking.sol:Staking".to_string(),
            ],
        };

        let message = err.to_string();
        assert!(message.contains("contracts/Staking.sol:Staking"));
        assert!(message.contains("contracts/v2/Staking.sol:Staking"));
    }

    #[test]
    fn test_deployment_failed_keeps_cause() {
        let err = DeployError::DeploymentFailed {
            name: "Staking".to_string(),
            source: anyhow::anyhow!("insufficient funds for gas * price + value"),
        };

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.contains("deployment of contract `Staking` failed"));
        assert!(chain.contains("insufficient funds"));
    }

    #[test]
    fn test_artifact_store_is_not_an_artifact_problem() {
        let err = DeployError::ArtifactStore(anyhow::anyhow!(
            "Failed to scan artifacts directory artifacts: permission denied"
        ));

        let chain = format!("{:#}", anyhow::Error::new(err));
        assert!(chain.starts_with("failed to read the artifacts directory"));
        assert!(chain.contains("permission denied"));
        assert!(!chain.contains("cannot be deployed"));
    }

    #[test]
    fn test_after_submission() {
        assert!(!DeployError::NoSignerAvailable.after_submission());
        assert!(
            !DeployError::ArtifactNotFound {
                name: "Staking".to_string()
            }
            .after_submission()
        );
        assert!(DeployError::Manifest(anyhow::anyhow!("disk full")).after_submission());
    }
}
