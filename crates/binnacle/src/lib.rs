//! Layered-secret credential core for multi-chain HD wallets.
//!
//! Two independent secrets gate every vault: an encryption key whose
//! canonical serialization unseals the persisted blob, and a numeric PIN
//! that separately unseals the mnemonic nested inside the unlocked payload.
//! A wrong credential is only ever observable as an authentication failure
//! when the corresponding envelope refuses to open.
//!
//! [`VaultSession`] owns the decrypted working state behind one exclusive
//! lock and runs every operation through it: generation, recovery with
//! gap-limit account discovery, unlocking, account derivation and soft
//! deletion, key and mnemonic export, and chain-routed signing.
//!
//! Cryptographic key management lives behind [`keyring::KeyringProvider`];
//! on-chain history and balance reads behind [`oracle::ActivityOracle`] and
//! [`oracle::AssetOracle`]. This crate implements neither, only the
//! credential and ledger core that drives them.

pub mod audit;
pub mod chains;
pub mod cipher;
pub mod discovery;
pub mod errors;
pub mod keyring;
pub mod ledger;
pub mod mnemonic;
pub mod oracle;
pub mod pin_gate;
pub mod retry;
pub mod session;
pub mod signing;
pub mod vault;

pub use audit::{VaultAction, VaultEvent};
pub use chains::{ChainFamily, ChainRegistry, SupportedChains, NATIVE_CHAIN};
pub use cipher::{CipherBox, EncryptionKey, Pin};
pub use discovery::DiscoveryConfig;
pub use errors::VaultError;
pub use keyring::{
    KeyringHandle, KeyringProvider, KeyringState, MessageSignRequest, TxRequest, HD_KEYRING_KIND,
};
pub use ledger::{Account, AccountLedger};
pub use oracle::{ActivityOracle, AssetOracle, AssetReport, OracleConfig};
pub use retry::BackoffConfig;
pub use session::VaultSession;
pub use vault::{DecryptedVault, EncryptedBlob};
