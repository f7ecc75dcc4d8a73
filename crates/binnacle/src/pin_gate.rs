//! PIN gate over the mnemonic, the inner secret layer.
//!
//! The mnemonic is sealed under the PIN inside the already-sealed vault
//! payload. No PIN digest is stored anywhere; the only wrong-PIN signal is
//! the envelope refusing to open.

use secrecy::{ExposeSecret as _, SecretString};

use crate::cipher::{self, CipherBox, Pin};
use crate::errors::VaultError;

const MNEMONIC_PURPOSE: &str = "mnemonic";

pub fn seal_mnemonic(pin: Pin, mnemonic: &SecretString) -> eyre::Result<CipherBox> {
    cipher::seal(
        &pin.passphrase(),
        mnemonic.expose_secret().as_bytes(),
        MNEMONIC_PURPOSE,
    )
}

fn probe(pin: Pin, sealed: &CipherBox) -> Option<SecretString> {
    let plaintext = cipher::open(&pin.passphrase(), sealed, MNEMONIC_PURPOSE).ok()?;
    if plaintext.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(&plaintext).ok()?;
    Some(SecretString::new(text.to_owned().into()))
}

/// True iff `pin` opens the sealed mnemonic. Never errors: any failure along
/// the way reads as a wrong PIN.
pub fn validate_pin(pin: Pin, sealed: &CipherBox) -> bool {
    probe(pin, sealed).is_some()
}

/// Recover the mnemonic, or fail with [`VaultError::IncorrectPin`].
pub fn export_mnemonic(pin: Pin, sealed: &CipherBox) -> eyre::Result<SecretString> {
    probe(pin, sealed).ok_or_else(|| VaultError::IncorrectPin.into())
}
