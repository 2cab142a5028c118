use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a report's raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
