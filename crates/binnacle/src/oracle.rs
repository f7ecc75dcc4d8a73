//! On-chain read collaborators: transaction history and token balances.
//!
//! Both oracles are external services. Queries go through a per-attempt
//! timeout and bounded backoff so one slow network cannot wedge a discovery
//! scan or an asset sweep.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::retry::{retry_with_backoff, BackoffConfig};

/// Read-only view of account transaction history.
#[async_trait]
pub trait ActivityOracle: Send + Sync {
    /// True if `address` has any transaction history on `network`.
    async fn has_activity(&self, address: &str, network: &str) -> eyre::Result<bool>;
}

/// Read-only view of token holdings.
#[async_trait]
pub trait AssetOracle: Send + Sync {
    /// Token balances of `address` on `network`, in provider-native shape.
    async fn token_balances(&self, address: &str, network: &str)
        -> eyre::Result<serde_json::Value>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Networks consulted per account. Activity is the union across them.
    pub networks: Vec<String>,
    /// Per-attempt deadline for a single oracle call.
    pub timeout_ms: u64,
    pub backoff: BackoffConfig,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            networks: vec!["ethereum".into()],
            timeout_ms: 1_600,
            backoff: BackoffConfig::default(),
        }
    }
}

async fn query_activity(
    oracle: &dyn ActivityOracle,
    address: &str,
    network: &str,
    cfg: &OracleConfig,
) -> eyre::Result<bool> {
    retry_with_backoff(
        &cfg.backoff,
        || async move {
            tokio::time::timeout(
                Duration::from_millis(cfg.timeout_ms),
                oracle.has_activity(address, network),
            )
            .await
            .map_err(|e| eyre::eyre!("activity query timed out: {e}"))?
        },
        "activity query",
    )
    .await
}

/// Union of activity across every configured network, short-circuiting on
/// the first hit.
pub async fn any_activity(
    oracle: &dyn ActivityOracle,
    address: &str,
    cfg: &OracleConfig,
) -> eyre::Result<bool> {
    for network in &cfg.networks {
        if query_activity(oracle, address, network, cfg).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReport {
    pub address: String,
    pub network: String,
    pub balances: serde_json::Value,
}

/// Token balances for every (account, network) pair, queried concurrently.
pub async fn collect_assets(
    oracle: &dyn AssetOracle,
    addresses: &[String],
    cfg: &OracleConfig,
) -> eyre::Result<Vec<AssetReport>> {
    let queries = addresses.iter().flat_map(|address| {
        cfg.networks.iter().map(move |network| async move {
            let balances = retry_with_backoff(
                &cfg.backoff,
                || async move {
                    tokio::time::timeout(
                        Duration::from_millis(cfg.timeout_ms),
                        oracle.token_balances(address, network),
                    )
                    .await
                    .map_err(|e| eyre::eyre!("balance query timed out: {e}"))?
                },
                "balance query",
            )
            .await?;
            Ok::<AssetReport, eyre::Report>(AssetReport {
                address: address.clone(),
                network: network.clone(),
                balances,
            })
        })
    });
    futures::future::try_join_all(queries).await
}
