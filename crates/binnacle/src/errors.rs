use thiserror::Error;

/// Credential and validation failures with a stable, caller-visible kind.
///
/// Operations return `eyre::Result`; these travel inside the report and are
/// recovered at the boundary with `downcast_ref::<VaultError>()`.
#[derive(Debug, Error, Clone)]
pub enum VaultError {
    #[error("incorrect pin")]
    IncorrectPin,

    #[error("pin must be a non-negative integer")]
    IncorrectPinType,

    #[error("incorrect encryption key")]
    IncorrectEncryptionKey,

    #[error("encryption key and pin are required")]
    MissingCredentials,

    #[error("address not present in the vault: {0}")]
    AddressNotPresent(String),

    #[error("address not present in the keyring: {0}")]
    NonexistentKeyringAccount(String),

    #[error("chain not supported: {0}")]
    ChainNotSupported(String),

    #[error("vault is locked; unlock it first")]
    VaultLocked,
}

impl VaultError {
    /// Stable snake_case code for embedding layers (RPC envelopes, audit sinks).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncorrectPin => "incorrect_pin",
            Self::IncorrectPinType => "incorrect_pin_type",
            Self::IncorrectEncryptionKey => "incorrect_encryption_key",
            Self::MissingCredentials => "missing_credentials",
            Self::AddressNotPresent(_) => "address_not_present",
            Self::NonexistentKeyringAccount(_) => "nonexistent_keyring_account",
            Self::ChainNotSupported(_) => "chain_not_supported",
            Self::VaultLocked => "vault_locked",
        }
    }

}
