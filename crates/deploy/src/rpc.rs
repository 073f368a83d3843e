//! JSON-RPC access to an Ethereum node.
//!
//! [`RpcNode`] is the production signer source and contract deployer: it signs
//! through the node's unlocked accounts (`eth_accounts` / `eth_sendTransaction`)
//! and polls for the receipt until the deployment is confirmed.

use std::time::{Duration, Instant};

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{Artifact, ContractDeployer, DeployConfig, DeployedContract, Signer, SignerSource};

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    decode_response(method, result)
}

/// Extract the `result` member of a JSON-RPC response, surfacing `error` members.
fn decode_response<T: DeserializeOwned>(method: &str, response: Value) -> Result<T, anyhow::Error> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown");
        match error.get("data").and_then(|d| d.as_str()) {
            Some(data) => anyhow::bail!("RPC error from {}: {} ({})", method, message, data),
            None => anyhow::bail!("RPC error from {}: {}", method, message),
        }
    }

    let result_value = response
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Parse a hex quantity (`0x`-prefixed) into a u64.
pub fn parse_quantity(value: &str) -> Result<u64, anyhow::Error> {
    let digits = value
        .strip_prefix("0x")
        .with_context(|| format!("Quantity is missing the 0x prefix: {}", value))?;
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid hex quantity: {}", value))
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_quantity(&s).map_err(serde::de::Error::custom)
}

/// The subset of a transaction receipt a deployment cares about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    /// Absent on pre-Byzantium chains.
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
}

impl TransactionReceipt {
    /// Check the receipt describes a successful contract creation and return the
    /// created address.
    fn created_address(&self) -> Result<Address, anyhow::Error> {
        if let Some(status) = &self.status {
            if parse_quantity(status)? != 1 {
                anyhow::bail!(
                    "Deployment transaction {} reverted in block {}",
                    self.transaction_hash,
                    self.block_number
                );
            }
        }

        self.contract_address.with_context(|| {
            format!(
                "Receipt of transaction {} carries no contract address",
                self.transaction_hash
            )
        })
    }
}

/// The block a deployment mined in `mined_in` must reach to count
/// `confirmations` blocks, itself included. Saturates at the largest block
/// number.
fn confirmation_target(mined_in: u64, confirmations: u64) -> u64 {
    mined_in.saturating_add(confirmations.saturating_sub(1))
}

/// Pick the signers to offer from the accounts the node reports unlocked.
///
/// A configured `from` is only accepted when the node lists it.
fn select_signers(accounts: Vec<Address>, from: Option<Address>) -> Vec<Signer> {
    match from {
        Some(from) if accounts.contains(&from) => vec![Signer::from(from)],
        Some(from) => {
            tracing::warn!(%from, "Configured sender is not unlocked on the node");
            vec![]
        }
        None => accounts.into_iter().map(Signer::from).collect(),
    }
}

/// Marker error: a condition we poll for is not met yet.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct NotYet(String);

/// An Ethereum node reached over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcNode {
    client: reqwest::Client,
    url: Url,
    from: Option<Address>,
    confirmations: u64,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcNode {
    /// Build a node client from the deployment configuration.
    pub fn new(config: &DeployConfig) -> Result<Self, anyhow::Error> {
        Ok(Self {
            client: create_client(config.request_timeout())?,
            url: config.rpc_url.clone(),
            from: config.from,
            confirmations: config.confirmations.max(1),
            poll_interval: config.poll_interval(),
            receipt_timeout: config.receipt_timeout(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, anyhow::Error> {
        json_rpc_call(&self.client, &self.url, method, params).await
    }

    /// The chain ID reported by the node.
    pub async fn chain_id(&self) -> Result<u64, anyhow::Error> {
        let id: String = self.call("eth_chainId", vec![]).await?;
        parse_quantity(&id)
    }

    /// The latest block number.
    pub async fn block_number(&self) -> Result<u64, anyhow::Error> {
        let number: String = self.call("eth_blockNumber", vec![]).await?;
        parse_quantity(&number)
    }

    /// The code deployed at `address` in the latest block.
    pub async fn code_at(&self, address: Address) -> Result<Bytes, anyhow::Error> {
        self.call(
            "eth_getCode",
            vec![serde_json::json!(address), serde_json::json!("latest")],
        )
        .await
    }

    /// Number of polling attempts that fit in the receipt timeout.
    fn max_polls(&self) -> usize {
        let interval = self.poll_interval.as_millis().max(1);
        usize::try_from(self.receipt_timeout.as_millis() / interval)
            .unwrap_or(usize::MAX)
            .max(1)
    }

    /// Whether a poll that started at `started` may still be retried. Request
    /// latency counts against the receipt timeout, not only the poll delays.
    fn within_timeout(&self, started: Instant) -> bool {
        started.elapsed() < self.receipt_timeout
    }

    fn poll_backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.poll_interval)
            .with_max_times(self.max_polls())
    }

    async fn receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, anyhow::Error> {
        let receipt: Option<TransactionReceipt> = self
            .call("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
            .await?;
        receipt.ok_or_else(|| NotYet(format!("transaction {} is still pending", tx_hash)).into())
    }

    /// Poll for the receipt of `tx_hash`. Only the pending case is retried;
    /// transport and RPC errors abort immediately.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, anyhow::Error> {
        let node = self;
        let started = Instant::now();
        let fetch = move || async move { node.receipt(tx_hash).await };

        fetch
            .retry(self.poll_backoff())
            .when(|e: &anyhow::Error| e.is::<NotYet>() && self.within_timeout(started))
            .notify(|e: &anyhow::Error, after: Duration| {
                tracing::trace!(error = %e, ?after, "Receipt not available, retrying...");
            })
            .await
            .with_context(|| {
                format!(
                    "Gave up waiting for the receipt of {} after {:?}",
                    tx_hash, self.receipt_timeout
                )
            })
    }

    /// Wait until the block holding the deployment has `confirmations` blocks on top
    /// of it, itself included.
    async fn wait_for_confirmations(&self, mined_in: u64) -> Result<(), anyhow::Error> {
        if self.confirmations <= 1 {
            return Ok(());
        }

        let node = self;
        let started = Instant::now();
        let target = confirmation_target(mined_in, self.confirmations);
        let check = move || async move {
            let head = node.block_number().await?;
            if head >= target {
                Ok(head)
            } else {
                Err(anyhow::Error::from(NotYet(format!(
                    "head {} has not reached block {}",
                    head, target
                ))))
            }
        };

        let head = check
            .retry(self.poll_backoff())
            .when(|e: &anyhow::Error| e.is::<NotYet>() && self.within_timeout(started))
            .notify(|e: &anyhow::Error, after: Duration| {
                tracing::trace!(error = %e, ?after, "Waiting for confirmations...");
            })
            .await
            .with_context(|| format!("Gave up waiting for {} confirmations", self.confirmations))?;

        tracing::debug!(head, mined_in, confirmations = self.confirmations, "Deployment confirmed");
        Ok(())
    }
}

impl SignerSource for RpcNode {
    async fn signers(&self) -> anyhow::Result<Vec<Signer>> {
        let accounts: Vec<Address> = self
            .call("eth_accounts", vec![])
            .await
            .context("Failed to list node accounts")?;

        tracing::debug!(count = accounts.len(), url = %self.url, "Fetched unlocked accounts");

        Ok(select_signers(accounts, self.from))
    }
}

impl ContractDeployer for RpcNode {
    async fn deploy(
        &self,
        signer: &Signer,
        artifact: &Artifact,
        code: &Bytes,
    ) -> anyhow::Result<DeployedContract> {
        let chain_id = self.chain_id().await.context("Failed to fetch chain id")?;

        let tx_hash: B256 = self
            .call(
                "eth_sendTransaction",
                vec![serde_json::json!({
                    "from": signer.address,
                    "data": code,
                })],
            )
            .await
            .context("Failed to send deployment transaction")?;

        tracing::info!(
            %tx_hash,
            chain_id,
            contract = %artifact.contract_name,
            "Deployment transaction sent"
        );

        let receipt = self.wait_for_receipt(tx_hash).await?;
        let address = receipt.created_address()?;

        self.wait_for_confirmations(receipt.block_number).await?;

        let deployed_code = self
            .code_at(address)
            .await
            .context("Failed to fetch deployed code")?;
        if deployed_code.is_empty() {
            anyhow::bail!("No code at {} after deployment", address);
        }

        Ok(DeployedContract {
            address,
            tx_hash,
            block_number: receipt.block_number,
            chain_id,
        })
    }
}
