//! Exclusive-lock vault session.
//!
//! One session holds at most one unlocked vault. Every operation takes the
//! session's single async lock for its full check-then-mutate span, so a
//! credential check and its effect are never interleaved with another
//! operation, and a failed step can never leave a half-written blob behind:
//! mutations build a clone and install it only after sealing succeeds.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::audit::{EventLog, VaultAction, VaultEvent};
use crate::chains::{ChainRegistry, SupportedChains, NATIVE_CHAIN};
use crate::cipher::{EncryptionKey, Pin};
use crate::discovery::{self, DiscoveryConfig};
use crate::errors::VaultError;
use crate::keyring::{
    KeyringHandle, KeyringProvider, MessageSignRequest, TxRequest, HD_KEYRING_KIND,
};
use crate::ledger::{Account, AccountLedger};
use crate::mnemonic;
use crate::oracle::{self, ActivityOracle, AssetOracle, AssetReport, OracleConfig};
use crate::pin_gate;
use crate::signing;
use crate::vault::{DecryptedVault, EncryptedBlob};

struct SessionState {
    blob: Option<EncryptedBlob>,
    vault: Option<DecryptedVault>,
    chain: String,
    events: EventLog,
}

pub struct VaultSession {
    id: Uuid,
    keyring: Arc<dyn KeyringProvider>,
    registry: Arc<ChainRegistry>,
    state: Mutex<SessionState>,
}

fn require_unlocked(state: &SessionState) -> eyre::Result<&DecryptedVault> {
    state
        .vault
        .as_ref()
        .ok_or_else(|| VaultError::VaultLocked.into())
}

fn ensure_pin(pin: Pin, vault: &DecryptedVault) -> eyre::Result<()> {
    if pin_gate::validate_pin(pin, &vault.encrypted_mnemonic) {
        Ok(())
    } else {
        Err(VaultError::IncorrectPin.into())
    }
}

impl VaultSession {
    pub fn new(keyring: Arc<dyn KeyringProvider>, registry: Arc<ChainRegistry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            keyring,
            registry,
            state: Mutex::new(SessionState {
                blob: None,
                vault: None,
                chain: NATIVE_CHAIN.to_owned(),
                events: EventLog::new(),
            }),
        }
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub async fn is_unlocked(&self) -> bool {
        self.state.lock().await.vault.is_some()
    }

    /// Create a fresh vault around `mnemonic`: one labeled seed account,
    /// both secret layers sealed. Replaces whatever the session previously
    /// held. Callers without a phrase of their own get one from
    /// [`mnemonic::generate`].
    pub async fn generate(
        &self,
        key: &EncryptionKey,
        pin: Pin,
        mnemonic: &SecretString,
    ) -> eyre::Result<EncryptedBlob> {
        if key.is_empty() {
            return Err(VaultError::MissingCredentials.into());
        }
        mnemonic::validate(mnemonic)?;
        let passphrase = key.canonical_passphrase()?;

        let mut state = self.state.lock().await;
        let keyring_state = self
            .keyring
            .create_new_vault_and_restore(&passphrase, mnemonic)
            .await?;
        let seed = keyring_state
            .first_account()
            .map(str::to_owned)
            .ok_or_else(|| eyre::eyre!("keyring returned no accounts"))?;

        let vault = DecryptedVault {
            ledger: AccountLedger::with_seed(seed),
            encrypted_mnemonic: pin_gate::seal_mnemonic(pin, mnemonic)?,
        };
        let blob = vault.seal(key)?;
        state.vault = Some(vault);
        state.blob = Some(blob.clone());
        state.events.record(VaultAction::VaultGenerated);
        info!(session = %self.id, "vault generated");
        Ok(blob)
    }

    /// Rebuild a vault from an existing mnemonic, discovering previously
    /// used accounts from on-chain history.
    pub async fn recover(
        &self,
        mnemonic: &SecretString,
        key: &EncryptionKey,
        pin: Pin,
        oracle: &dyn ActivityOracle,
        cfg: &DiscoveryConfig,
    ) -> eyre::Result<EncryptedBlob> {
        if key.is_empty() {
            return Err(VaultError::MissingCredentials.into());
        }
        mnemonic::validate(mnemonic)?;
        let passphrase = key.canonical_passphrase()?;

        let mut state = self.state.lock().await;
        let keyring_state = self
            .keyring
            .create_new_vault_and_restore(&passphrase, mnemonic)
            .await?;
        let seed = keyring_state
            .first_account()
            .map(str::to_owned)
            .ok_or_else(|| eyre::eyre!("keyring returned no accounts"))?;
        let handle = self.hd_keyring_handle().await?;
        let discovered =
            discovery::discover(&seed, self.keyring.as_ref(), handle, oracle, cfg).await?;
        let ledger = AccountLedger::from_discovered(discovered)?;

        // Discovery derives past the halt point; replay the keyring so its
        // live accounts match the ledger exactly.
        self.replay_keyring(&passphrase, mnemonic, ledger.number_of_accounts())
            .await?;

        let vault = DecryptedVault {
            ledger,
            encrypted_mnemonic: pin_gate::seal_mnemonic(pin, mnemonic)?,
        };
        let blob = vault.seal(key)?;
        let scanned = vault.ledger.number_of_accounts();
        state.vault = Some(vault);
        state.blob = Some(blob.clone());
        state
            .events
            .record(VaultAction::VaultRecovered { scanned });
        info!(session = %self.id, scanned, "vault recovered");
        Ok(blob)
    }

    /// Open a persisted blob and install it as the session's working state.
    /// Returns every ledger entry, deleted ones included.
    pub async fn unlock(
        &self,
        blob: &EncryptedBlob,
        key: &EncryptionKey,
    ) -> eyre::Result<Vec<Account>> {
        let vault = DecryptedVault::unlock(blob, key)?;
        let mut state = self.state.lock().await;
        let accounts = vault.ledger.accounts().to_vec();
        state.vault = Some(vault);
        state.blob = Some(blob.clone());
        state.events.record(VaultAction::VaultUnlocked);
        Ok(accounts)
    }

    /// Bring the live keyring back in line with a persisted blob after a
    /// restart. The PIN is validated against the blob's sealed mnemonic
    /// before the provider is touched.
    pub async fn restore_keyring_state(
        &self,
        blob: &EncryptedBlob,
        key: &EncryptionKey,
        pin: Pin,
    ) -> eyre::Result<()> {
        let vault = DecryptedVault::unlock(blob, key)?;
        let mnemonic = pin_gate::export_mnemonic(pin, &vault.encrypted_mnemonic)?;
        let passphrase = key.canonical_passphrase()?;

        let mut state = self.state.lock().await;
        self.replay_keyring(&passphrase, &mnemonic, vault.ledger.number_of_accounts())
            .await?;
        state.vault = Some(vault);
        state.blob = Some(blob.clone());
        state.events.record(VaultAction::KeyringRestored);
        info!(session = %self.id, "keyring state restored");
        Ok(())
    }

    /// True iff `pin` is this vault's PIN.
    pub async fn validate_pin(&self, pin: Pin) -> eyre::Result<bool> {
        let state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        Ok(pin_gate::validate_pin(pin, &vault.encrypted_mnemonic))
    }

    pub async fn export_mnemonic(&self, pin: Pin) -> eyre::Result<SecretString> {
        let state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        pin_gate::export_mnemonic(pin, &vault.encrypted_mnemonic)
    }

    /// Derive the next account and persist it. On any failure the stored
    /// blob and ledger keep their pre-call value.
    pub async fn add_account(
        &self,
        key: &EncryptionKey,
        pin: Pin,
    ) -> eyre::Result<(String, EncryptedBlob)> {
        let mut state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        ensure_pin(pin, vault)?;

        let live = self.keyring.get_accounts().await?;
        let anchor = live
            .first()
            .ok_or_else(|| eyre::eyre!("keyring provider has no accounts"))?;
        let handle = self.keyring.get_keyring_for_account(anchor).await?;
        let keyring_state = self.keyring.add_new_account(handle).await?;
        let address = keyring_state
            .newest_account()
            .map(str::to_owned)
            .ok_or_else(|| eyre::eyre!("keyring returned no accounts"))?;

        let mut updated = vault.clone();
        updated.ledger.add(&address)?;
        let blob = updated.seal(key)?;
        state.vault = Some(updated);
        state.blob = Some(blob.clone());
        state.events.record(VaultAction::AccountAdded {
            address: address.clone(),
        });
        info!(session = %self.id, %address, "account added");
        Ok((address, blob))
    }

    /// Soft-delete an account. The PIN gate runs first, then membership
    /// against the live keyring; address matching is exact. Deleting an
    /// already-deleted account succeeds and changes nothing.
    pub async fn delete_account(
        &self,
        key: &EncryptionKey,
        pin: Pin,
        address: &str,
    ) -> eyre::Result<EncryptedBlob> {
        let mut state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        ensure_pin(pin, vault)?;

        let live = self.keyring.get_accounts().await?;
        if !live.iter().any(|a| a == address) {
            return Err(VaultError::AddressNotPresent(address.to_owned()).into());
        }

        let mut updated = vault.clone();
        updated.ledger.soft_delete(address)?;
        let blob = updated.seal(key)?;
        state.vault = Some(updated);
        state.blob = Some(blob.clone());
        state.events.record(VaultAction::AccountDeleted {
            address: address.to_owned(),
        });
        info!(session = %self.id, %address, "account deleted");
        Ok(blob)
    }

    /// Relabel a ledger account and persist the change.
    pub async fn set_account_label(
        &self,
        key: &EncryptionKey,
        pin: Pin,
        address: &str,
        label: &str,
    ) -> eyre::Result<EncryptedBlob> {
        let mut state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        ensure_pin(pin, vault)?;

        let mut updated = vault.clone();
        updated.ledger.set_label(address, label)?;
        let blob = updated.seal(key)?;
        state.vault = Some(updated);
        state.blob = Some(blob.clone());
        state.events.record(VaultAction::AccountRelabeled {
            address: address.to_owned(),
        });
        Ok(blob)
    }

    /// Export the raw private key for `address`. Ledger membership is
    /// checked before the PIN; deleted accounts stay exportable.
    pub async fn export_private_key(&self, address: &str, pin: Pin) -> eyre::Result<SecretString> {
        let state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        self.export_key_inner(vault, address, pin).await
    }

    /// Sign an arbitrary message. The signing address must be live in the
    /// keyring.
    pub async fn sign_message(
        &self,
        request: &MessageSignRequest,
        pin: Pin,
    ) -> eyre::Result<String> {
        let state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        ensure_pin(pin, vault)?;

        let live = self.keyring.get_accounts().await?;
        if !live.iter().any(|a| a == &request.from) {
            return Err(VaultError::NonexistentKeyringAccount(request.from.clone()).into());
        }
        self.keyring.sign_message(request).await
    }

    /// Sign a transaction for `chain`. Unsupported chains fail before any
    /// credential check. The native chain delegates to the keyring backend;
    /// every other chain exports the sender's key (a second, independent
    /// PIN gate) and signs through the chain's registered factory.
    pub async fn sign_transaction(
        &self,
        tx: &TxRequest,
        chain: &str,
        pin: Pin,
    ) -> eyre::Result<serde_json::Value> {
        if !self.registry.is_supported(chain) {
            return Err(VaultError::ChainNotSupported(chain.to_owned()).into());
        }

        let state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        ensure_pin(pin, vault)?;

        if chain == NATIVE_CHAIN {
            return self.keyring.sign_transaction(tx, chain).await;
        }

        let exported = self.export_key_inner(vault, &tx.from, pin).await?;
        let Some(descriptor) = self.registry.descriptor(chain) else {
            return Err(VaultError::ChainNotSupported(chain.to_owned()).into());
        };
        signing::sign_with_exported_key(descriptor.signer.as_ref(), exported, tx).await
    }

    /// Switch the session's active network.
    pub async fn change_network(&self, chain: &str) -> eyre::Result<()> {
        if !self.registry.is_supported(chain) {
            return Err(VaultError::ChainNotSupported(chain.to_owned()).into());
        }
        let mut state = self.state.lock().await;
        chain.clone_into(&mut state.chain);
        state.events.record(VaultAction::NetworkChanged {
            chain: chain.to_owned(),
        });
        info!(session = %self.id, %chain, "network changed");
        Ok(())
    }

    pub async fn current_network(&self) -> String {
        self.state.lock().await.chain.clone()
    }

    pub fn supported_chains(&self) -> SupportedChains {
        self.registry.supported_chains()
    }

    /// Ledger entries of the unlocked vault, deleted ones included.
    pub async fn accounts(&self) -> eyre::Result<Vec<Account>> {
        let state = self.state.lock().await;
        let vault = require_unlocked(&state)?;
        Ok(vault.ledger.accounts().to_vec())
    }

    /// Token balances for every active account across the configured
    /// networks. Deleted accounts are not queried.
    pub async fn collect_assets(
        &self,
        oracle: &dyn AssetOracle,
        cfg: &OracleConfig,
    ) -> eyre::Result<Vec<AssetReport>> {
        let addresses: Vec<String> = {
            let state = self.state.lock().await;
            let vault = require_unlocked(&state)?;
            vault
                .ledger
                .active_accounts()
                .map(|a| a.address.clone())
                .collect()
        };
        oracle::collect_assets(oracle, &addresses, cfg).await
    }

    /// Latest sealed blob this session produced or accepted.
    pub async fn current_blob(&self) -> Option<EncryptedBlob> {
        self.state.lock().await.blob.clone()
    }

    /// Audit trail of this session's mutations, oldest first. Bounded:
    /// once [`crate::audit::EVENT_LOG_CAPACITY`] is reached the oldest
    /// entries are evicted.
    pub async fn events(&self) -> Vec<VaultEvent> {
        self.state.lock().await.events.snapshot()
    }

    async fn hd_keyring_handle(&self) -> eyre::Result<KeyringHandle> {
        let handles = self.keyring.get_keyrings_by_type(HD_KEYRING_KIND).await?;
        handles
            .first()
            .copied()
            .ok_or_else(|| eyre::eyre!("provider holds no hd keyring"))
    }

    /// Fresh provider restore followed by enough derivations to reach
    /// `count` accounts.
    async fn replay_keyring(
        &self,
        passphrase: &SecretString,
        mnemonic: &SecretString,
        count: u32,
    ) -> eyre::Result<()> {
        let _state = self
            .keyring
            .create_new_vault_and_restore(passphrase, mnemonic)
            .await?;
        let handle = self.hd_keyring_handle().await?;
        for _ in 1..count {
            let _state = self.keyring.add_new_account(handle).await?;
        }
        Ok(())
    }

    async fn export_key_inner(
        &self,
        vault: &DecryptedVault,
        address: &str,
        pin: Pin,
    ) -> eyre::Result<SecretString> {
        if !vault.ledger.contains(address) {
            return Err(VaultError::AddressNotPresent(address.to_owned()).into());
        }
        ensure_pin(pin, vault)?;
        self.keyring.export_account(address).await
    }
}
