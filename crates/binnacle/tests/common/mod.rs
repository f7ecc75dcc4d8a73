#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use secrecy::{ExposeSecret as _, SecretString};

use binnacle::keyring::{
    KeyringDescriptor, KeyringHandle, KeyringProvider, KeyringState, MessageSignRequest,
    TxRequest, HD_KEYRING_KIND,
};
use binnacle::oracle::{ActivityOracle, AssetOracle};
use binnacle::signing::{SignerFactory, TransactionSigner};
use binnacle::{
    BackoffConfig, ChainFamily, ChainRegistry, DiscoveryConfig, EncryptionKey, OracleConfig, Pin,
};

pub const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn mnemonic_secret() -> SecretString {
    SecretString::new(MNEMONIC.to_owned().into())
}

/// Stand-in for the session's canonical key serialization when driving a
/// keyring fake directly.
pub fn fixture_passphrase() -> SecretString {
    SecretString::new("v1:test-passphrase".to_owned().into())
}

/// Deterministic fake address for account `index` of `mnemonic`.
pub fn address_for(mnemonic: &str, index: usize) -> String {
    let mut hash = 0_u64;
    for b in mnemonic.bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(u64::from(b));
    }
    format!("0x{hash:016x}{index:024x}")
}

pub fn test_key() -> EncryptionKey {
    EncryptionKey::from_parts([("password", "hunter2"), ("realm", "test")])
}

pub fn pin() -> Pin {
    Pin::from(564_365_u32)
}

pub fn wrong_pin() -> Pin {
    Pin::from(111_111_u32)
}

pub fn fast_oracle_config(networks: &[&str]) -> OracleConfig {
    OracleConfig {
        networks: networks.iter().map(|n| (*n).to_owned()).collect(),
        timeout_ms: 2_000,
        backoff: BackoffConfig {
            rounds: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_max_ms: 0,
        },
    }
}

pub fn fast_discovery_config(networks: &[&str]) -> DiscoveryConfig {
    DiscoveryConfig {
        gap_limit: 5,
        oracle: fast_oracle_config(networks),
    }
}

pub fn registry_with(factory: Arc<CountingSignerFactory>) -> Arc<ChainRegistry> {
    let signer: Arc<dyn SignerFactory> = factory;
    Arc::new(
        ChainRegistry::builder()
            .register("polygon", ChainFamily::Evm, Arc::clone(&signer))
            .register("solana", ChainFamily::Other, signer)
            .build(),
    )
}

#[derive(Default)]
struct KeyringInner {
    mnemonic: Option<String>,
    passphrase: Option<String>,
    accounts: Vec<String>,
    fail_next_add: bool,
}

/// In-memory keyring backend with deterministic address derivation.
#[derive(Default)]
pub struct MemoryKeyring {
    inner: Mutex<KeyringInner>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> eyre::Result<MutexGuard<'_, KeyringInner>> {
        self.inner
            .lock()
            .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))
    }

    fn snapshot(inner: &KeyringInner) -> KeyringState {
        KeyringState {
            keyrings: vec![KeyringDescriptor {
                kind: HD_KEYRING_KIND.to_owned(),
                accounts: inner.accounts.clone(),
            }],
        }
    }

    /// Make the next `add_new_account` call fail once.
    pub fn fail_next_add(&self) -> eyre::Result<()> {
        self.lock()?.fail_next_add = true;
        Ok(())
    }

    pub fn last_passphrase(&self) -> eyre::Result<Option<String>> {
        Ok(self.lock()?.passphrase.clone())
    }

    pub fn live_accounts(&self) -> eyre::Result<Vec<String>> {
        Ok(self.lock()?.accounts.clone())
    }
}

#[async_trait]
impl KeyringProvider for MemoryKeyring {
    async fn create_new_vault_and_restore(
        &self,
        passphrase: &SecretString,
        mnemonic: &SecretString,
    ) -> eyre::Result<KeyringState> {
        let mut inner = self.lock()?;
        let phrase = mnemonic.expose_secret().to_owned();
        inner.accounts = vec![address_for(&phrase, 0)];
        inner.mnemonic = Some(phrase);
        inner.passphrase = Some(passphrase.expose_secret().to_owned());
        Ok(Self::snapshot(&inner))
    }

    async fn get_accounts(&self) -> eyre::Result<Vec<String>> {
        Ok(self.lock()?.accounts.clone())
    }

    async fn get_keyring_for_account(&self, address: &str) -> eyre::Result<KeyringHandle> {
        let inner = self.lock()?;
        if inner.accounts.iter().any(|a| a == address) {
            Ok(KeyringHandle(0))
        } else {
            eyre::bail!("no keyring holds {address}")
        }
    }

    async fn get_keyrings_by_type(&self, kind: &str) -> eyre::Result<Vec<KeyringHandle>> {
        let inner = self.lock()?;
        if kind == HD_KEYRING_KIND && inner.mnemonic.is_some() {
            Ok(vec![KeyringHandle(0)])
        } else {
            Ok(vec![])
        }
    }

    async fn add_new_account(&self, _keyring: KeyringHandle) -> eyre::Result<KeyringState> {
        let mut inner = self.lock()?;
        if inner.fail_next_add {
            inner.fail_next_add = false;
            eyre::bail!("backend unavailable")
        }
        let mnemonic = inner
            .mnemonic
            .clone()
            .ok_or_else(|| eyre::eyre!("no keyring restored"))?;
        let next = inner.accounts.len();
        inner.accounts.push(address_for(&mnemonic, next));
        Ok(Self::snapshot(&inner))
    }

    async fn export_account(&self, address: &str) -> eyre::Result<SecretString> {
        let inner = self.lock()?;
        if inner.accounts.iter().any(|a| a == address) {
            Ok(SecretString::new(format!("privkey:{address}").into()))
        } else {
            eyre::bail!("no key for {address}")
        }
    }

    async fn sign_message(&self, request: &MessageSignRequest) -> eyre::Result<String> {
        Ok(format!("sig:{}:{}", request.from, request.data))
    }

    async fn sign_transaction(
        &self,
        tx: &TxRequest,
        chain: &str,
    ) -> eyre::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "signed_by": "keyring",
            "from": tx.from,
            "chain": chain,
        }))
    }
}

/// Activity oracle answering from a fixed set of (address, network) pairs.
pub struct ScriptedOracle {
    active: BTreeSet<(String, String)>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedOracle {
    pub fn idle() -> Self {
        Self::with_active(Vec::<(String, String)>::new())
    }

    pub fn with_active<I, A, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, N)>,
        A: Into<String>,
        N: Into<String>,
    {
        Self {
            active: pairs
                .into_iter()
                .map(|(a, n)| (a.into(), n.into()))
                .collect(),
            calls: Mutex::new(vec![]),
        }
    }

    pub fn queried(&self) -> eyre::Result<Vec<(String, String)>> {
        Ok(self
            .calls
            .lock()
            .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?
            .clone())
    }
}

#[async_trait]
impl ActivityOracle for ScriptedOracle {
    async fn has_activity(&self, address: &str, network: &str) -> eyre::Result<bool> {
        self.calls
            .lock()
            .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?
            .push((address.to_owned(), network.to_owned()));
        Ok(self
            .active
            .contains(&(address.to_owned(), network.to_owned())))
    }
}

/// Oracle that fails a fixed number of calls before delegating.
pub struct FlakyOracle {
    failures: Mutex<u32>,
    inner: ScriptedOracle,
}

impl FlakyOracle {
    pub fn new(failures: u32, inner: ScriptedOracle) -> Self {
        Self {
            failures: Mutex::new(failures),
            inner,
        }
    }
}

#[async_trait]
impl ActivityOracle for FlakyOracle {
    async fn has_activity(&self, address: &str, network: &str) -> eyre::Result<bool> {
        {
            let mut left = self
                .failures
                .lock()
                .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?;
            if *left > 0 {
                *left -= 1;
                eyre::bail!("rpc hiccup")
            }
        }
        self.inner.has_activity(address, network).await
    }
}

pub struct ScriptedAssets;

#[async_trait]
impl AssetOracle for ScriptedAssets {
    async fn token_balances(
        &self,
        address: &str,
        network: &str,
    ) -> eyre::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "address": address,
            "network": network,
            "tokens": [],
        }))
    }
}

/// Signer factory that counts instantiations and records the exported key.
pub struct CountingSignerFactory {
    made: Mutex<usize>,
}

impl CountingSignerFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            made: Mutex::new(0),
        })
    }

    pub fn signer_count(&self) -> eyre::Result<usize> {
        Ok(*self
            .made
            .lock()
            .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?)
    }
}

impl SignerFactory for CountingSignerFactory {
    fn make_signer(&self, private_key: &SecretString) -> eyre::Result<Box<dyn TransactionSigner>> {
        let mut made = self
            .made
            .lock()
            .map_err(|e| eyre::eyre!("mutex poisoned: {e}"))?;
        *made += 1;
        Ok(Box::new(RecordingSigner {
            key: private_key.expose_secret().to_owned(),
        }))
    }
}

struct RecordingSigner {
    key: String,
}

#[async_trait]
impl TransactionSigner for RecordingSigner {
    async fn sign_transaction(&self, tx: &TxRequest) -> eyre::Result<serde_json::Value> {
        Ok(serde_json::json!({
            "signed_by": "factory",
            "from": tx.from,
            "key": self.key,
        }))
    }
}
