//! Ed25519 signer (signature type 2).

use crate::error::{SignerError, SignerResult};
use crate::signer::Signer;
use base64::Engine;
use ed25519_dalek::Signer as _;
use ed25519_dalek::SigningKey;
use irys_core::SignatureType;
use std::fmt;

/// Signs data items with an Ed25519 key.
///
/// The owner is the raw 32-byte verifying key.
pub struct Ed25519Signer {
    inner: SigningKey,
    public: [u8; 32],
}

impl Ed25519Signer {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand_core::OsRng;
        Self::from_signing_key(SigningKey::generate(&mut rng))
    }

    /// Build from a raw 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(secret))
    }

    /// Parse a key from raw bytes: either the 32-byte secret, or the 64-byte
    /// keypair form `secret || public` used by Solana-style wallets.
    pub fn from_bytes(bytes: &[u8]) -> SignerResult<Self> {
        match bytes.len() {
            32 | 64 => {
                let secret: [u8; 32] = bytes[..32]
                    .try_into()
                    .map_err(|_| SignerError::KeyParsing("invalid secret key bytes".to_string()))?;
                let signer = Self::from_secret_bytes(&secret);
                if bytes.len() == 64 && bytes[32..] != signer.public {
                    return Err(SignerError::KeyParsing(
                        "public half does not match the secret key".to_string(),
                    ));
                }
                Ok(signer)
            }
            n => Err(SignerError::KeyParsing(format!(
                "expected 32 or 64 bytes, got {n}"
            ))),
        }
    }

    /// Parse a base64-encoded key (see [`Ed25519Signer::from_bytes`]).
    pub fn from_base64(s: &str) -> SignerResult<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s.trim())
            .map_err(|e| SignerError::KeyParsing(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Encode as base64 of `secret || public`.
    pub fn to_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(self.inner.as_bytes());
        bytes.extend_from_slice(&self.public);
        base64::engine::general_purpose::STANDARD.encode(&bytes)
    }

    fn from_signing_key(inner: SigningKey) -> Self {
        let public = inner.verifying_key().to_bytes();
        Self { inner, public }
    }
}

impl Signer for Ed25519Signer {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Ed25519
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn sign(&self, message: &[u8]) -> SignerResult<Vec<u8>> {
        Ok(self.inner.sign(message).to_bytes().to_vec())
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = base64::engine::general_purpose::STANDARD.encode(self.public);
        write!(f, "Ed25519Signer({}...)", &b64[..8])
    }
}

/// Verify an Ed25519 signature against a raw 32-byte public key.
pub(crate) fn verify(owner: &[u8], message: &[u8], signature: &[u8]) -> SignerResult<()> {
    use ed25519_dalek::Verifier;

    let key_bytes: [u8; 32] = owner
        .try_into()
        .map_err(|_| SignerError::KeyParsing(format!("expected 32 bytes, got {}", owner.len())))?;
    let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| SignerError::KeyParsing(format!("invalid public key: {e}")))?;

    let sig_array: [u8; 64] = signature.try_into().map_err(|_| {
        SignerError::InvalidSignature(format!("expected 64 bytes, got {}", signature.len()))
    })?;
    let signature = ed25519_dalek::Signature::from_bytes(&sig_array);

    key.verify(message, &signature)
        .map_err(|_| SignerError::VerificationFailed)
}
