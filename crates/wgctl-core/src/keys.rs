// ── Key generation ──
//
// Keys are produced by the `wg` tool on the managed host, so private
// keys for a device are generated where they are used. Anything that
// can issue `wg genkey`, `wg pubkey` and `wg genpsk` is a provider.

use std::future::Future;

use crate::error::CoreError;
use crate::model::KeyPair;

pub trait KeyProvider: Send + Sync {
    /// A fresh private key.
    fn genkey(&self) -> impl Future<Output = Result<String, CoreError>> + Send;

    /// The public key belonging to `private_key`.
    fn pubkey(&self, private_key: &str) -> impl Future<Output = Result<String, CoreError>> + Send;

    /// A fresh preshared key.
    fn genpsk(&self) -> impl Future<Output = Result<String, CoreError>> + Send;

    /// Generate a private key and derive its public half.
    fn keypair(&self) -> impl Future<Output = Result<KeyPair, CoreError>> + Send {
        async move {
            let private_key = self.genkey().await?;
            let public_key = self.pubkey(&private_key).await?;
            Ok(KeyPair::new(private_key, public_key))
        }
    }
}

/// Reject empty or multi-line tool output before it lands in a config.
pub(crate) fn check_key(what: &str, raw: String) -> Result<String, CoreError> {
    if raw.is_empty() || raw.contains(char::is_whitespace) {
        return Err(CoreError::Execution {
            command: format!("wg {what}"),
            output: format!("unexpected key output '{raw}'"),
        });
    }
    Ok(raw)
}
