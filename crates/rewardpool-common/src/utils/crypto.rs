use {
    crate::types::Address,
    sha2::{Digest, Sha256},
};

/// Hash a message using SHA-256
pub fn hash_message(message: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.finalize().to_vec()
}

/// Deterministic address for a human label, used by scenario scripts and tests.
pub fn address_from_label(label: &str) -> Address {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash_message(label.as_bytes()));
    Address::new_from_array(bytes)
}
