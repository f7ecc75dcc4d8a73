//! Passphrase-sealed AEAD envelopes and the credential types that feed them.
//!
//! Every secret the vault persists goes through [`seal`]: Argon2id stretches the
//! passphrase, HKDF binds the result to a purpose label, and AES-256-GCM
//! authenticates the payload. A wrong passphrase is only ever observable as a
//! failed tag check in [`open`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead as _, KeyInit as _},
    Aes256Gcm, Nonce,
};
use argon2::{
    password_hash::{PasswordHasher as _, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::Engine as _;
use eyre::Context as _;
use hkdf::Hkdf;
use rand::Rng as _;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::VaultError;

pub const CIPHER_BOX_VERSION: u8 = 1;

/// Self-describing sealed envelope. Carries its own salt so each secret gets an
/// independent key even when two secrets share a passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherBox {
    pub v: u8,
    pub salt_b64: String,
    pub nonce_b64: String,
    pub ct_b64: String,
}

pub fn fill_random(buf: &mut [u8]) {
    let mut rng = rand::rng();
    rng.fill_bytes(buf);
}

pub fn random_salt16() -> [u8; 16] {
    let mut s = [0_u8; 16];
    fill_random(&mut s);
    s
}

pub fn derive_passphrase_key(
    passphrase: &SecretString,
    salt16: &[u8; 16],
) -> eyre::Result<[u8; 32]> {
    // Freeze Argon2id parameters to avoid accidental changes across dependency updates.
    // These match `argon2::Params::DEFAULT` in argon2 0.5.x.
    let params =
        Params::new(19 * 1024, 2, 1, Some(32)).map_err(|e| eyre::eyre!("argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::encode_b64(salt16).map_err(|e| eyre::eyre!("encode salt: {e}"))?;
    let mut out = [0_u8; 32];

    // We use a PHC hash but only take the raw bytes; this keeps parameters versioned.
    let hash = argon2
        .hash_password(passphrase.expose_secret().as_bytes(), &salt)
        .map_err(|e| eyre::eyre!("argon2 hash: {e}"))?;
    let bytes = hash
        .hash
        .ok_or_else(|| eyre::eyre!("argon2 missing hash"))?;
    let raw = bytes.as_bytes();
    if raw.len() < 32 {
        eyre::bail!("argon2 hash too short");
    }
    let Some(prefix) = raw.get(..32) else {
        eyre::bail!("argon2 hash too short");
    };
    out.copy_from_slice(prefix);
    Ok(out)
}

fn derive_sealing_key(
    passphrase: &SecretString,
    salt16: &[u8; 16],
    purpose: &str,
) -> eyre::Result<[u8; 32]> {
    let master = derive_passphrase_key(passphrase, salt16)?;
    let hk = Hkdf::<Sha256>::new(None, &master);
    let info = format!("binnacle:{purpose}:v1");
    let mut out = [0_u8; 32];
    hk.expand(info.as_bytes(), &mut out)
        .map_err(|e| eyre::eyre!("hkdf expand: {e}"))?;
    Ok(out)
}

/// Seal `plaintext` under `passphrase` with a fresh salt and nonce.
///
/// The `purpose` label domain-separates derived keys; an envelope sealed for
/// one purpose never opens under another.
pub fn seal(passphrase: &SecretString, plaintext: &[u8], purpose: &str) -> eyre::Result<CipherBox> {
    let salt = random_salt16();
    let key = derive_sealing_key(passphrase, &salt, purpose)?;
    let cipher = Aes256Gcm::new_from_slice(&key).context("aes init")?;
    let mut nonce = [0_u8; 12];
    fill_random(&mut nonce);
    let ct = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| eyre::eyre!("aes encrypt: {e}"))?;

    Ok(CipherBox {
        v: CIPHER_BOX_VERSION,
        salt_b64: base64::engine::general_purpose::STANDARD.encode(salt),
        nonce_b64: base64::engine::general_purpose::STANDARD.encode(nonce),
        ct_b64: base64::engine::general_purpose::STANDARD.encode(ct),
    })
}

/// Open a sealed envelope. Fails on version mismatch, malformed fields, or a
/// failed authentication tag (wrong passphrase, wrong purpose, tampering).
pub fn open(
    passphrase: &SecretString,
    sealed: &CipherBox,
    purpose: &str,
) -> eyre::Result<Zeroizing<Vec<u8>>> {
    if sealed.v != CIPHER_BOX_VERSION {
        eyre::bail!("unsupported CipherBox version: {}", sealed.v);
    }
    let salt = base64::engine::general_purpose::STANDARD
        .decode(&sealed.salt_b64)
        .context("decode salt")?;
    let Ok(salt16) = <[u8; 16]>::try_from(salt.as_slice()) else {
        eyre::bail!("invalid salt length");
    };
    let nonce = base64::engine::general_purpose::STANDARD
        .decode(&sealed.nonce_b64)
        .context("decode nonce")?;
    if nonce.len() != 12 {
        eyre::bail!("invalid nonce length");
    }
    let ct = base64::engine::general_purpose::STANDARD
        .decode(&sealed.ct_b64)
        .context("decode ciphertext")?;

    let key = derive_sealing_key(passphrase, &salt16, purpose)?;
    let cipher = Aes256Gcm::new_from_slice(&key).context("aes init")?;
    let pt = cipher
        .decrypt(Nonce::from_slice(&nonce), ct.as_ref())
        .map_err(|e| eyre::eyre!("aes decrypt: {e}"))?;
    Ok(Zeroizing::new(pt))
}

/// Structured outer credential. Field order never matters: the canonical
/// passphrase serializes the sorted map under a format version prefix, so the
/// same fields always reproduce the same sealing key.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct EncryptionKey(BTreeMap<String, String>);

impl EncryptionKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts<I, K, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            parts
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn canonical_passphrase(&self) -> eyre::Result<SecretString> {
        let body = serde_json::to_string(&self.0).context("serialize encryption key")?;
        Ok(SecretString::new(format!("v1:{body}").into()))
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").finish_non_exhaustive()
    }
}

/// Non-negative integer PIN. Construction is the single place PIN shape is
/// checked; every holder of a `Pin` may assume it is well formed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Pin(u64);

impl Pin {
    pub(crate) fn passphrase(self) -> SecretString {
        SecretString::new(self.0.to_string().into())
    }
}

impl From<u32> for Pin {
    fn from(value: u32) -> Self {
        Self(u64::from(value))
    }
}

impl From<u64> for Pin {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for Pin {
    type Error = VaultError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u64::try_from(value) {
            Ok(raw) => Ok(Self(raw)),
            Err(_) => Err(VaultError::IncorrectPinType),
        }
    }
}

impl FromStr for Pin {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u64>() {
            Ok(raw) => Ok(Self(raw)),
            Err(_) => Err(VaultError::IncorrectPinType),
        }
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(<redacted>)")
    }
}
