//! Deployment configuration.
//!
//! Values are layered with figment: built-in defaults, then an optional TOML
//! file, then `STAKEUP_*` environment variables. The CLI applies its flags on
//! top of the extracted value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::artifacts::DEFAULT_ARTIFACTS_DIR;

/// The default name for the configuration file.
pub const CONFIG_FILENAME: &str = "Stakeup.toml";

/// Prefix of the environment variables read by [`DeployConfig::figment`].
pub const ENV_PREFIX: &str = "STAKEUP_";

/// The contract deployed when none is configured.
pub const DEFAULT_CONTRACT_NAME: &str = "Staking";

/// Upper bound on the confirmations a deployment may wait for.
pub const MAX_CONFIRMATIONS: u64 = 1024;

/// Default JSON-RPC endpoint (a local `hardhat node` or `anvil`).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: Url,
    /// Bare or fully qualified name of the contract to deploy.
    pub contract: String,
    /// Directory holding the compiled artifacts.
    pub artifacts: PathBuf,
    /// Sender to use instead of the node's first unlocked account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Blocks, inclusive of the one holding the deployment, to wait for.
    pub confirmations: u64,
    /// HTTP timeout of a single RPC request, in seconds.
    pub request_timeout_secs: u64,
    /// Delay between receipt polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum time to wait for the deployment receipt, in seconds.
    pub receipt_timeout_secs: u64,
    /// Where to write the deployment manifest. Nothing is written when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            rpc_url: Url::parse(DEFAULT_RPC_URL).expect("default RPC URL is valid"),
            contract: DEFAULT_CONTRACT_NAME.to_string(),
            artifacts: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            from: None,
            confirmations: 1,
            request_timeout_secs: 10,
            poll_interval_ms: 500,
            receipt_timeout_secs: 120,
            manifest: None,
        }
    }
}

impl DeployConfig {
    /// The layered configuration sources.
    ///
    /// `path` overrides the default `Stakeup.toml` lookup in the working
    /// directory. A missing file contributes nothing.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.map_or_else(|| PathBuf::from(CONFIG_FILENAME), Path::to_path_buf);

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the configuration from all sources and validate it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
        }

        let config: Self = Self::figment(path)
            .extract()
            .context("Failed to load deployment configuration")?;
        config.validate()?;

        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.contract.trim().is_empty() {
            anyhow::bail!("Contract name must not be empty");
        }
        if self.confirmations == 0 {
            anyhow::bail!("At least one confirmation is required");
        }
        if self.confirmations > MAX_CONFIRMATIONS {
            anyhow::bail!(
                "Confirmations must not exceed {}, got {}",
                MAX_CONFIRMATIONS,
                self.confirmations
            );
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be positive");
        }
        if !matches!(self.rpc_url.scheme(), "http" | "https") {
            anyhow::bail!(
                "Unsupported RPC URL scheme '{}', expected http or https",
                self.rpc_url.scheme()
            );
        }
        Ok(())
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}
