//! BIP-39 mnemonic generation and validation.
//!
//! Key derivation from the mnemonic lives behind
//! [`crate::keyring::KeyringProvider`]; this module only produces and checks
//! phrases.

use bip39::{Language, Mnemonic};
use eyre::Context as _;
use secrecy::{ExposeSecret as _, SecretString};

/// Generate a fresh 12-word English mnemonic.
pub fn generate() -> eyre::Result<SecretString> {
    // 12 words -> 16 bytes entropy.
    let mnemonic = Mnemonic::generate_in(Language::English, 12).context("generate mnemonic")?;
    Ok(SecretString::new(mnemonic.to_string().into()))
}

/// Rebuild a phrase from raw entropy. Used by recovery tooling and tests.
pub fn from_entropy(entropy: &[u8]) -> eyre::Result<SecretString> {
    let mnemonic =
        Mnemonic::from_entropy_in(Language::English, entropy).context("mnemonic from entropy")?;
    Ok(SecretString::new(mnemonic.to_string().into()))
}

/// Check a phrase is a well-formed English mnemonic (word list + checksum).
pub fn validate(mnemonic: &SecretString) -> eyre::Result<()> {
    let _parsed = Mnemonic::parse_in_normalized(Language::English, mnemonic.expose_secret())
        .context("parse mnemonic")?;
    Ok(())
}
