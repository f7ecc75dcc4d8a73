//! Transaction signing for chains outside the keyring backend's native one.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::keyring::TxRequest;

/// One-shot signer bound to a single exported private key.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_transaction(&self, tx: &TxRequest) -> eyre::Result<serde_json::Value>;
}

/// Builds signers for one chain. Construction is synchronous so the exported
/// key can be dropped before any await point.
pub trait SignerFactory: Send + Sync {
    fn make_signer(&self, private_key: &SecretString) -> eyre::Result<Box<dyn TransactionSigner>>;
}

/// Sign `tx` with a freshly exported key. The key is consumed by signer
/// construction and dropped before the signing future runs.
pub async fn sign_with_exported_key(
    factory: &dyn SignerFactory,
    private_key: SecretString,
    tx: &TxRequest,
) -> eyre::Result<serde_json::Value> {
    let signer = factory.make_signer(&private_key)?;
    drop(private_key);
    signer.sign_transaction(tx).await
}
