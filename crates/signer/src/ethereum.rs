//! Ethereum signer (signature type 3).
//!
//! Signs with EIP-191 `personal_sign` over the message, producing the
//! 65-byte `r || s || v` form with `v` in `{27, 28}`. The owner is the
//! uncompressed secp256k1 public key (`0x04 || x || y`).

use crate::error::{SignerError, SignerResult};
use crate::signer::Signer;
use alloy_primitives::{Address, B256, Signature};
use alloy_signer::SignerSync;
use alloy_signer::k256::AffinePoint;
use alloy_signer::k256::elliptic_curve::sec1::ToEncodedPoint;
use alloy_signer_local::PrivateKeySigner;
use irys_core::SignatureType;
use std::fmt;
use std::str::FromStr;

/// Signs data items and funding transactions with a secp256k1 key.
pub struct EthereumSigner {
    inner: PrivateKeySigner,
    public: Vec<u8>,
}

impl EthereumSigner {
    /// Generate a new random key.
    pub fn random() -> Self {
        Self::from_local(PrivateKeySigner::random())
    }

    /// Parse a hex private key, with or without a `0x` prefix.
    pub fn from_hex(key: &str) -> SignerResult<Self> {
        let inner = PrivateKeySigner::from_str(key.trim())
            .map_err(|e| SignerError::KeyParsing(format!("invalid secp256k1 key: {e}")))?;
        Ok(Self::from_local(inner))
    }

    /// Wrap an existing local signer.
    pub fn from_local(inner: PrivateKeySigner) -> Self {
        let affine: &AffinePoint = inner.credential().verifying_key().as_ref();
        let public = affine.to_encoded_point(false).as_bytes().to_vec();
        Self { inner, public }
    }

    /// The checksummed account address.
    pub fn address(&self) -> Address {
        self.inner.address()
    }

    /// Sign a 32-byte digest without any message prefix.
    ///
    /// Used for chain transactions, where the digest is the transaction hash.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> SignerResult<Signature> {
        self.inner
            .sign_hash_sync(&B256::from(*hash))
            .map_err(|e| SignerError::Signing(e.to_string()))
    }
}

impl Signer for EthereumSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::Ethereum
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn sign(&self, message: &[u8]) -> SignerResult<Vec<u8>> {
        let signature = self
            .inner
            .sign_message_sync(message)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        Ok(signature.as_bytes().to_vec())
    }
}

impl fmt::Debug for EthereumSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EthereumSigner({})", self.address())
    }
}

/// Verify an EIP-191 signature against an uncompressed public key.
pub(crate) fn verify(owner: &[u8], message: &[u8], signature: &[u8]) -> SignerResult<()> {
    if owner.len() != 65 || owner[0] != 0x04 {
        return Err(SignerError::KeyParsing(
            "expected a 65-byte uncompressed public key".to_string(),
        ));
    }
    let signature = Signature::from_raw(signature)
        .map_err(|e| SignerError::InvalidSignature(e.to_string()))?;
    let recovered = signature
        .recover_address_from_msg(message)
        .map_err(|_| SignerError::VerificationFailed)?;
    if recovered != Address::from_raw_public_key(&owner[1..]) {
        return Err(SignerError::VerificationFailed);
    }
    Ok(())
}
