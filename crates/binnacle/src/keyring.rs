//! Contract for the external key-management backend.
//!
//! The backend owns derivation, addresses, and signature cryptography. This
//! crate orchestrates it and never sees a derived key except through
//! [`KeyringProvider::export_account`].

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Keyring kind for hierarchical-deterministic accounts.
pub const HD_KEYRING_KIND: &str = "HD Key Tree";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringDescriptor {
    pub kind: String,
    pub accounts: Vec<String>,
}

/// Snapshot of the backend's held keyrings, in derivation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyringState {
    pub keyrings: Vec<KeyringDescriptor>,
}

impl KeyringState {
    fn hd_keyring(&self) -> Option<&KeyringDescriptor> {
        self.keyrings.iter().find(|k| k.kind == HD_KEYRING_KIND)
    }

    /// First HD account: the seed account everything else derives after.
    pub fn first_account(&self) -> Option<&str> {
        self.hd_keyring()
            .and_then(|k| k.accounts.first())
            .map(String::as_str)
    }

    /// Most recently derived HD account.
    pub fn newest_account(&self) -> Option<&str> {
        self.hd_keyring()
            .and_then(|k| k.accounts.last())
            .map(String::as_str)
    }
}

/// Opaque handle to one keyring held by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyringHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSignRequest {
    pub from: String,
    pub data: String,
}

/// Transaction to sign. `from` routes the signing key; `body` is the
/// chain-shaped payload passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub from: String,
    pub body: serde_json::Value,
}

#[async_trait]
pub trait KeyringProvider: Send + Sync {
    /// Drop any held keyrings and restore a single HD keyring from the
    /// mnemonic, leaving exactly one derived account.
    async fn create_new_vault_and_restore(
        &self,
        passphrase: &SecretString,
        mnemonic: &SecretString,
    ) -> eyre::Result<KeyringState>;

    /// Every account across all held keyrings, in derivation order.
    async fn get_accounts(&self) -> eyre::Result<Vec<String>>;

    /// Handle of the keyring holding `address`.
    async fn get_keyring_for_account(&self, address: &str) -> eyre::Result<KeyringHandle>;

    /// Handles of all held keyrings of the given kind.
    async fn get_keyrings_by_type(&self, kind: &str) -> eyre::Result<Vec<KeyringHandle>>;

    /// Derive the next account in `keyring` and return the updated state.
    async fn add_new_account(&self, keyring: KeyringHandle) -> eyre::Result<KeyringState>;

    /// Raw private key for `address`.
    async fn export_account(&self, address: &str) -> eyre::Result<SecretString>;

    /// Sign an arbitrary message with the key holding `request.from`.
    async fn sign_message(&self, request: &MessageSignRequest) -> eyre::Result<String>;

    /// Sign a native-chain transaction. `chain` names the network the
    /// transaction is bound for.
    async fn sign_transaction(
        &self,
        tx: &TxRequest,
        chain: &str,
    ) -> eyre::Result<serde_json::Value>;
}
