//! Confirmation code hashing

use sha2::{Digest, Sha256};

/// Hash a confirmation code for `PrepareDownload`
///
/// `hashCc = SHA256(SHA256(code) || transactionId)`, binding the code to
/// one download session.
///
/// # Arguments
/// * `code` - Confirmation code as entered by the user
/// * `transaction_id` - Transaction identifier from `smdpSigned2`
pub fn hash_confirmation_code(code: &str, transaction_id: &[u8]) -> Vec<u8> {
    let inner = Sha256::digest(code.as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(inner);
    hasher.update(transaction_id);
    hasher.finalize().to_vec()
}
