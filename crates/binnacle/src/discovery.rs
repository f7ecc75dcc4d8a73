//! Gap-limit account discovery for vault recovery.

use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::keyring::{KeyringHandle, KeyringProvider};
use crate::ledger::Account;
use crate::oracle::{self, ActivityOracle, OracleConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Scan stops once this many consecutive derived accounts show no
    /// history on any configured network.
    pub gap_limit: u32,
    pub oracle: OracleConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            gap_limit: 5,
            oracle: OracleConfig::default(),
        }
    }
}

/// Derive accounts past the seed until `gap_limit` consecutive ones show no
/// history, keeping every scanned account in derivation order.
///
/// The seed account is always first and always active, whatever its history.
/// Derivation happens in batches of `gap_limit`; each batch's history
/// queries run concurrently. The inactive run carries across batch
/// boundaries and resets on any hit, so the scan halts at exactly the
/// account that completes the run; later accounts derived for the same
/// batch are never recorded.
pub async fn discover(
    seed_address: &str,
    keyring: &dyn KeyringProvider,
    handle: KeyringHandle,
    oracle: &dyn ActivityOracle,
    cfg: &DiscoveryConfig,
) -> eyre::Result<Vec<Account>> {
    if cfg.gap_limit == 0 {
        eyre::bail!("gap_limit must be positive");
    }
    if cfg.oracle.networks.is_empty() {
        eyre::bail!("no activity networks configured");
    }

    let mut accounts = vec![Account::active(seed_address)];
    let mut inactive_run = 0_u32;
    let derive_deadline = Duration::from_millis(cfg.oracle.timeout_ms);

    'scan: loop {
        let mut batch = Vec::new();
        for _ in 0..cfg.gap_limit {
            // Derivations are bounded but never retried: a timed-out call may
            // still have landed in the backend, and replaying it would skew
            // the derivation index.
            let state = tokio::time::timeout(derive_deadline, keyring.add_new_account(handle))
                .await
                .map_err(|e| eyre::eyre!("account derivation timed out: {e}"))??;
            let address = state
                .newest_account()
                .map(str::to_owned)
                .ok_or_else(|| eyre::eyre!("keyring state has no accounts"))?;
            batch.push(address);
        }

        let queries = batch
            .iter()
            .map(|address| oracle::any_activity(oracle, address, &cfg.oracle));
        let outcomes = try_join_all(queries).await?;

        for (address, active) in batch.into_iter().zip(outcomes) {
            if active {
                inactive_run = 0;
                accounts.push(Account::active(address));
            } else {
                inactive_run += 1;
                accounts.push(Account::inactive(address));
                if inactive_run >= cfg.gap_limit {
                    break 'scan;
                }
            }
        }
    }

    info!(scanned = accounts.len(), "account discovery complete");
    Ok(accounts)
}
