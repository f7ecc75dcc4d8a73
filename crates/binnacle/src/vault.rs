//! The persisted vault: one sealed envelope around the account ledger and the
//! PIN-sealed mnemonic.

use eyre::Context as _;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::cipher::{self, CipherBox, EncryptionKey};
use crate::errors::VaultError;
use crate::ledger::AccountLedger;

const VAULT_PURPOSE: &str = "vault";

/// Opaque persisted form of the vault. Callers store it verbatim and hand it
/// back on unlock; its internals are not part of the public contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for EncryptedBlob {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for EncryptedBlob {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

/// Working state of an unlocked vault. The mnemonic stays sealed under the
/// PIN even here; unlocking the outer envelope never exposes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedVault {
    pub ledger: AccountLedger,
    pub encrypted_mnemonic: CipherBox,
}

impl DecryptedVault {
    /// Seal under the encryption key into the persisted blob form.
    pub fn seal(&self, key: &EncryptionKey) -> eyre::Result<EncryptedBlob> {
        let passphrase = key.canonical_passphrase()?;
        let plaintext = Zeroizing::new(serde_json::to_vec(self).context("serialize vault")?);
        let sealed = cipher::seal(&passphrase, &plaintext, VAULT_PURPOSE)?;
        let envelope = serde_json::to_string(&sealed).context("serialize envelope")?;
        Ok(EncryptedBlob(envelope))
    }

    /// Open a persisted blob. Failures a wrong key can cause all fold into
    /// [`VaultError::IncorrectEncryptionKey`]; a format version mismatch
    /// stays distinct so migration problems do not read as bad credentials.
    pub fn unlock(blob: &EncryptedBlob, key: &EncryptionKey) -> eyre::Result<Self> {
        let Ok(envelope) = serde_json::from_str::<CipherBox>(&blob.0) else {
            return Err(VaultError::IncorrectEncryptionKey.into());
        };
        if envelope.v != cipher::CIPHER_BOX_VERSION {
            eyre::bail!("unsupported vault format version: {}", envelope.v);
        }
        let passphrase = key.canonical_passphrase()?;
        let Ok(plaintext) = cipher::open(&passphrase, &envelope, VAULT_PURPOSE) else {
            return Err(VaultError::IncorrectEncryptionKey.into());
        };
        let Ok(vault) = serde_json::from_slice::<Self>(&plaintext) else {
            return Err(VaultError::IncorrectEncryptionKey.into());
        };
        Ok(vault)
    }
}
