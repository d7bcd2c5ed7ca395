// Hashing utilities

use sha2::{Digest, Sha256};

/// Single SHA256 hash, the digest signed by wallet keys
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}
