use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Attempts per operation, first try included.
    pub rounds: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Random jitter (`0..=jitter_max_ms`) added to each backoff sleep.
    pub jitter_max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            // Keep this bounded so interactive callers stay responsive.
            rounds: 3,
            base_delay_ms: 400,
            max_delay_ms: 4_000,
            jitter_max_ms: 250,
        }
    }
}

fn compute_backoff_delay(cfg: &BackoffConfig, round: usize) -> Duration {
    let shift = u32::try_from(round.min(16)).unwrap_or(16_u32);
    let pow2 = 1_u64.checked_shl(shift).unwrap_or(u64::MAX);
    let mut ms = cfg.base_delay_ms.saturating_mul(pow2);
    if ms > cfg.max_delay_ms {
        ms = cfg.max_delay_ms;
    }
    let jitter = if cfg!(test) || cfg.jitter_max_ms == 0 {
        0
    } else {
        // Avoid holding a non-Send RNG across await points.
        rand::random::<u64>() % cfg.jitter_max_ms.saturating_add(1)
    };
    Duration::from_millis(ms.saturating_add(jitter))
}

/// Run `op` up to `rounds` times, sleeping with exponential backoff + jitter
/// between attempts. Credential and validation failures are never transient:
/// a [`VaultError`] anywhere in the chain aborts immediately.
pub async fn retry_with_backoff<T, Fut>(
    cfg: &BackoffConfig,
    mut op: impl FnMut() -> Fut + Send,
    context_label: &'static str,
) -> eyre::Result<T>
where
    Fut: std::future::Future<Output = eyre::Result<T>> + Send,
{
    if cfg.rounds == 0 {
        eyre::bail!("invalid backoff config: rounds=0");
    }

    let mut last_err: Option<eyre::Report> = None;

    for round in 0..cfg.rounds {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if e.downcast_ref::<VaultError>().is_some() {
                    return Err(e.wrap_err(context_label));
                }
                last_err = Some(e);
            }
        }

        if round + 1 < cfg.rounds {
            let d = compute_backoff_delay(cfg, round);
            tokio::time::sleep(d).await;
        }
    }

    Err(last_err
        .unwrap_or_else(|| eyre::eyre!("unknown error"))
        .wrap_err(context_label))
}
