//! Data item signing and verification.

use crate::error::{SignerError, SignerResult};
use irys_core::{DataItem, SignatureType, SignedTransaction};

/// A key that can sign data items.
///
/// Implementations must be deterministic in their public key: every call to
/// [`Signer::public_key`] returns the same bytes.
pub trait Signer: Send + Sync {
    /// Signature scheme written into items signed by this key.
    fn signature_type(&self) -> SignatureType;

    /// Owner bytes embedded in the item.
    fn public_key(&self) -> &[u8];

    /// Sign an arbitrary message.
    fn sign(&self, message: &[u8]) -> SignerResult<Vec<u8>>;
}

/// Sign a data item, producing a transaction whose id derives from the
/// signature.
///
/// The item must have been built for this signer: same signature type and
/// owner.
pub fn sign_data_item(item: DataItem, signer: &dyn Signer) -> SignerResult<SignedTransaction> {
    if item.signature_type() != signer.signature_type() {
        return Err(SignerError::OwnerMismatch(format!(
            "item uses {:?}, signer produces {:?}",
            item.signature_type(),
            signer.signature_type()
        )));
    }
    if item.owner() != signer.public_key() {
        return Err(SignerError::OwnerMismatch(
            "item owner is not the signer's public key".to_string(),
        ));
    }

    let signature = signer.sign(&item.signing_message())?;
    Ok(SignedTransaction::from_parts(item, signature)?)
}

/// Verify a signature over `message` made by `owner` under the given scheme.
pub fn verify(
    signature_type: SignatureType,
    owner: &[u8],
    message: &[u8],
    signature: &[u8],
) -> SignerResult<()> {
    match signature_type {
        SignatureType::Ed25519 => crate::ed25519::verify(owner, message, signature),
        SignatureType::Ethereum => crate::ethereum::verify(owner, message, signature),
    }
}

/// Verify a signed transaction against its embedded owner.
pub fn verify_transaction(tx: &SignedTransaction) -> SignerResult<()> {
    let item = tx.item();
    verify(
        item.signature_type(),
        item.owner(),
        &item.signing_message(),
        tx.signature(),
    )
}
