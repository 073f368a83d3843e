use std::path::Path;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::DeployedContract;

/// Outcome of a successful deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    /// Name the contract was requested under.
    pub contract: String,
    /// Account that signed the creation transaction.
    pub deployer: Address,
    /// The confirmed contract instance.
    #[serde(flatten)]
    pub deployed: DeployedContract,
    /// SHA-256 of the creation bytecode, hex encoded.
    pub bytecode_hash: String,
}

impl DeploymentReport {
    pub fn address(&self) -> Address {
        self.deployed.address
    }
}

/// Compute the SHA-256 fingerprint of some creation bytecode.
///
/// Ties a deployment back to the exact artifact it was made from.
pub fn bytecode_hash(code: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code);
    hex::encode(hasher.finalize())
}

/// Deployment record persisted next to the project.
///
/// The file is written as formatted JSON for human readability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    #[serde(flatten)]
    pub report: DeploymentReport,
    /// When the manifest was written.
    pub deployed_at: DateTime<Utc>,
    /// Version of the tool that performed the deployment.
    pub tool_version: String,
}

impl DeploymentManifest {
    pub fn new(report: DeploymentReport) -> Self {
        Self {
            report,
            deployed_at: Utc::now(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Save this manifest to a file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment manifest")?;

        std::fs::write(path, json).context(format!(
            "Failed to write deployment manifest to {}",
            path.display()
        ))?;

        tracing::info!(path = %path.display(), "Deployment manifest saved");
        Ok(())
    }

    /// Load a manifest from a file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment manifest does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment manifest from {}",
            path.display()
        ))?;

        serde_json::from_str(&content).context("Failed to parse deployment manifest JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::{B256, address};
    use tempdir::TempDir;

    fn report() -> DeploymentReport {
        DeploymentReport {
            contract: "Staking".to_string(),
            deployer: address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            deployed: DeployedContract {
                address: address!("5FbDB2315678afecb367f032d93F642f64180aa3"),
                tx_hash: B256::repeat_byte(0xab),
                block_number: 1,
                chain_id: 31337,
            },
            bytecode_hash: bytecode_hash(&[0x60, 0x80]),
        }
    }

    #[test]
    fn test_bytecode_hash() {
        let hash = bytecode_hash(&[]);
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(bytecode_hash(&[0x60]), hash);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new("stakeup-manifest").unwrap();
        let path = tmp.path().join("deployments/localhost/Staking.json");

        let manifest = DeploymentManifest::new(report());
        manifest.save_to_file(&path).unwrap();

        let loaded = DeploymentManifest::load_from_file(&path).unwrap();
        assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_manifest_layout() {
        let value = serde_json::to_value(DeploymentManifest::new(report())).unwrap();

        assert_eq!(value["contract"], "Staking");
        assert_eq!(value["chain_id"], 31337);
        assert_eq!(value["block_number"], 1);
        assert!(value["address"].as_str().unwrap().starts_with("0x"));
        assert!(value["deployed_at"].is_string());
        assert_eq!(value["tool_version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_load_missing_manifest() {
        assert!(DeploymentManifest::load_from_file(Path::new("/nonexistent/manifest.json")).is_err());
    }
}
