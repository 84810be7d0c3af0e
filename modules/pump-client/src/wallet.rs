use ed25519_dalek::{Signer, SigningKey};
use rand::Rng;

/// Throwaway ed25519 keypair used to sign the platform's login message.
/// A new one is generated for every client, so no identity is shared
/// between sessions.
pub struct LoginWallet {
    key: SigningKey,
    address: String,
}

impl LoginWallet {
    pub fn generate() -> Self {
        let mut secret = [0u8; 32];
        rand::rng().fill(&mut secret);
        Self::from_secret(&secret)
    }

    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let key = SigningKey::from_bytes(secret);
        let address = bs58::encode(key.verifying_key().as_bytes()).into_string();
        Self { key, address }
    }

    /// Base58 public key, the form the platform expects as `address`.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign a UTF-8 message and return the base58 signature.
    pub fn sign(&self, message: &str) -> String {
        let signature = self.key.sign(message.as_bytes());
        bs58::encode(signature.to_bytes()).into_string()
    }
}

/// The exact text the platform expects to be signed at login.
pub fn login_message(timestamp_ms: i64) -> String {
    format!("Sign in to pump.fun: {timestamp_ms}")
}
