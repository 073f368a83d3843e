//! Compiled contract artifacts and the Hardhat-style registry that serves them.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ArtifactRegistry, DeployError};

/// Default artifacts directory, relative to the project root.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Directory holding solc build info, never contract artifacts.
const BUILD_INFO_DIR: &str = "build-info";

/// Suffix of the debug sidecar files Hardhat writes next to each artifact.
const DBG_SUFFIX: &str = ".dbg.json";

/// A compiled contract: creation bytecode plus interface metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// The contract name, e.g. `Staking`.
    pub contract_name: String,
    /// The source file the contract was compiled from, e.g. `contracts/Staking.sol`.
    pub source_name: String,
    /// The JSON ABI.
    pub abi: Value,
    /// Hex-encoded creation bytecode. May contain library placeholders when unlinked.
    pub bytecode: String,
    /// Library link references, keyed by source then library name.
    #[serde(default)]
    pub link_references: serde_json::Map<String, Value>,
}

impl Artifact {
    /// The `<sourceName>:<contractName>` form of the contract name.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source_name, self.contract_name)
    }

    /// Number of inputs declared by the ABI constructor, zero when there is none.
    pub fn constructor_inputs(&self) -> usize {
        self.abi
            .as_array()
            .into_iter()
            .flatten()
            .find(|entry| entry.get("type").and_then(Value::as_str) == Some("constructor"))
            .and_then(|ctor| ctor.get("inputs"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Check that the contract can be deployed without constructor arguments and
    /// return its decoded creation code.
    pub fn ensure_deployable(&self) -> Result<Bytes, DeployError> {
        let invalid = |reason: String| DeployError::InvalidArtifact {
            name: self.contract_name.clone(),
            reason,
        };

        let code = self.bytecode.trim_start_matches("0x");
        if code.is_empty() {
            return Err(invalid(
                "bytecode is empty, the contract is abstract or an interface".to_string(),
            ));
        }

        if !self.link_references.is_empty() || code.contains("__$") {
            let libraries: Vec<&String> = self
                .link_references
                .values()
                .filter_map(Value::as_object)
                .flat_map(|libs| libs.keys())
                .collect();
            return Err(invalid(format!(
                "bytecode references unlinked libraries: {:?}",
                libraries
            )));
        }

        let inputs = self.constructor_inputs();
        if inputs > 0 {
            return Err(invalid(format!(
                "constructor expects {} argument(s) but none are supplied",
                inputs
            )));
        }

        hex::decode(code)
            .map(Bytes::from)
            .map_err(|e| invalid(format!("bytecode is not valid hex: {}", e)))
    }
}

/// Registry backed by a Hardhat `artifacts/` directory.
///
/// Artifacts live at `<root>/<sourceName>/<ContractName>.json`. Names may be
/// given bare (`Staking`) or fully qualified (`contracts/Staking.sol:Staking`).
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

impl HardhatArtifacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every artifact under the root, in path order.
    pub fn load_all(&self) -> anyhow::Result<Vec<Artifact>> {
        let mut files = Vec::new();
        collect_artifact_files(&self.root, &mut files).with_context(|| {
            format!("Failed to scan artifacts directory {}", self.root.display())
        })?;
        files.sort();

        let mut artifacts = Vec::with_capacity(files.len());
        for path in files {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::debug!(path = %path.display(), err = %e, "Skipping unreadable JSON file");
                    continue;
                }
            };

            match serde_json::from_str::<Artifact>(&content) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    tracing::debug!(path = %path.display(), err = %e, "Skipping non-artifact JSON file");
                }
            }
        }

        Ok(artifacts)
    }
}

impl ArtifactRegistry for HardhatArtifacts {
    fn resolve(&self, name: &str) -> Result<Artifact, DeployError> {
        let not_found = || DeployError::ArtifactNotFound {
            name: name.to_string(),
        };

        if !self.root.is_dir() {
            tracing::warn!(root = %self.root.display(), "Artifacts directory does not exist");
            return Err(not_found());
        }

        let artifacts = self.load_all().map_err(DeployError::ArtifactStore)?;

        let mut matches: Vec<Artifact> = if name.contains(':') {
            artifacts
                .into_iter()
                .filter(|a| a.fully_qualified_name() == name)
                .collect()
        } else {
            artifacts
                .into_iter()
                .filter(|a| a.contract_name == name)
                .collect()
        };

        match matches.len() {
            0 => Err(not_found()),
            1 => {
                let artifact = matches.remove(0);
                tracing::debug!(
                    name = %artifact.fully_qualified_name(),
                    root = %self.root.display(),
                    "Resolved contract artifact"
                );
                Ok(artifact)
            }
            _ => Err(DeployError::AmbiguousArtifact {
                name: name.to_string(),
                candidates: matches.iter().map(Artifact::fully_qualified_name).collect(),
            }),
        }
    }
}

fn collect_artifact_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == BUILD_INFO_DIR) {
                continue;
            }
            collect_artifact_files(&path, files)?;
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if file_name.ends_with(".json") && !file_name.ends_with(DBG_SUFFIX) {
            files.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempdir::TempDir;

    fn write_artifact(root: &Path, source: &str, name: &str, body: Value) {
        let dir = root.join(source);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.json", name)),
            serde_json::to_string_pretty(&body).unwrap(),
        )
        .unwrap();
    }

    fn artifact_json(source: &str, name: &str, bytecode: &str) -> Value {
        json!({
            "_format": "hh-sol-artifact-1",
            "contractName": name,
            "sourceName": source,
            "abi": [
                { "type": "function", "name": "stake", "inputs": [], "outputs": [] }
            ],
            "bytecode": bytecode,
            "deployedBytecode": "0x",
            "linkReferences": {},
            "deployedLinkReferences": {}
        })
    }

    fn staking(bytecode: &str) -> Artifact {
        serde_json::from_value(artifact_json("contracts/Staking.sol", "Staking", bytecode)).unwrap()
    }

    #[test]
    fn test_resolve_bare_and_qualified_name() {
        let tmp = TempDir::new("stakeup-artifacts").unwrap();
        let source = "contracts/Staking.sol";
        write_artifact(tmp.path(), source, "Staking", artifact_json(source, "Staking", "0x6080"));

        let registry = HardhatArtifacts::new(tmp.path());

        let bare = registry.resolve("Staking").unwrap();
        assert_eq!(bare.contract_name, "Staking");
        assert_eq!(bare.fully_qualified_name(), "contracts/Staking.sol:Staking");

        let qualified = registry.resolve("contracts/Staking.sol:Staking").unwrap();
        assert_eq!(qualified, bare);
    }

    #[test]
    fn test_resolve_missing_contract() {
        let tmp = TempDir::new("stakeup-artifacts").unwrap();
        let source = "contracts/Token.sol";
        write_artifact(tmp.path(), source, "Token", artifact_json(source, "Token", "0x6080"));

        let err = HardhatArtifacts::new(tmp.path()).resolve("Staking").unwrap_err();
        assert!(matches!(err, DeployError::ArtifactNotFound { name } if name == "Staking"));
    }

    #[test]
    fn test_resolve_missing_directory() {
        let tmp = TempDir::new("stakeup-artifacts").unwrap();
        let registry = HardhatArtifacts::new(tmp.path().join("artifacts"));

        let err = registry.resolve("Staking").unwrap_err();
        assert!(matches!(err, DeployError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_resolve_ambiguous_name() {
        let tmp = TempDir::new("stakeup-artifacts").unwrap();
        for source in ["contracts/Staking.sol", "contracts/legacy/Staking.sol"] {
            write_artifact(tmp.path(), source, "Staking", artifact_json(source, "Staking", "0x6080"));
        }

        let registry = HardhatArtifacts::new(tmp.path());
        match registry.resolve("Staking").unwrap_err() {
            DeployError::AmbiguousArtifact { candidates, .. } => {
                assert_eq!(
                    candidates,
                    vec![
                        "contracts/Staking.sol:Staking".to_string(),
                        "contracts/legacy/Staking.sol:Staking".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The fully qualified name disambiguates.
        let artifact = registry.resolve("contracts/legacy/Staking.sol:Staking").unwrap();
        assert_eq!(artifact.source_name, "contracts/legacy/Staking.sol");
    }

    #[test]
    fn test_dbg_and_build_info_are_skipped() {
        let tmp = TempDir::new("stakeup-artifacts").unwrap();
        let source = "contracts/Staking.sol";
        write_artifact(tmp.path(), source, "Staking", artifact_json(source, "Staking", "0x6080"));

        // A dbg sidecar shaped like an artifact must not create an ambiguity.
        std::fs::write(
            tmp.path().join(source).join("Staking.dbg.json"),
            artifact_json(source, "Staking", "0x6080").to_string(),
        )
        .unwrap();
        write_artifact(
            tmp.path(),
            "build-info",
            "abc123",
            artifact_json(source, "Staking", "0x6080"),
        );

        let all = HardhatArtifacts::new(tmp.path()).load_all().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_unreadable_json_is_skipped() {
        let tmp = TempDir::new("stakeup-artifacts").unwrap();
        let source = "contracts/Staking.sol";
        write_artifact(tmp.path(), source, "Staking", artifact_json(source, "Staking", "0x6080"));

        std::fs::write(tmp.path().join("junk.json"), [0xff, 0xfe, 0x00]).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(tmp.path().join("gone.json"), tmp.path().join("dangling.json"))
            .unwrap();

        let artifact = HardhatArtifacts::new(tmp.path()).resolve("Staking").unwrap();
        assert_eq!(artifact.fully_qualified_name(), "contracts/Staking.sol:Staking");
    }

    #[test]
    fn test_ensure_deployable() {
        let code = staking("0x6080604052").ensure_deployable().unwrap();
        assert_eq!(code.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_abstract_contract_is_not_deployable() {
        let err = staking("0x").ensure_deployable().unwrap_err();
        assert!(matches!(err, DeployError::InvalidArtifact { .. }));
    }

    #[test]
    fn test_unlinked_library_is_not_deployable() {
        let mut artifact = staking("0x6080__$3b3bd3bd4b6bd5ff8b1a2e0a3f6bbb6c4e$__6040");
        artifact.link_references = json!({
            "contracts/Math.sol": { "Math": [{ "length": 20, "start": 2 }] }
        })
        .as_object()
        .cloned()
        .unwrap();

        match artifact.ensure_deployable().unwrap_err() {
            DeployError::InvalidArtifact { reason, .. } => assert!(reason.contains("Math")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_constructor_with_arguments_is_not_deployable() {
        let mut artifact = staking("0x6080");
        artifact.abi = json!([
            {
                "type": "constructor",
                "stateMutability": "nonpayable",
                "inputs": [{ "name": "token", "type": "address", "internalType": "address" }]
            }
        ]);

        assert_eq!(artifact.constructor_inputs(), 1);
        assert!(matches!(
            artifact.ensure_deployable(),
            Err(DeployError::InvalidArtifact { .. })
        ));
    }
}
