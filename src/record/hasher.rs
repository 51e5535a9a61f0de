use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `input`.
///
/// Always 64 lowercase hex characters. Identical input yields the identical
/// string, which is what lets the ledger spot duplicate records.
pub fn sha256_hex(input: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_ref());
    hex::encode(hasher.finalize())
}
