//! Chunk identity and content hashing.

use sha2::{Digest, Sha256};

/// Calculate SHA-256 hash of text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable chunk identifier: the hash of `"{source_id}#{index}"`.
pub fn chunk_id(source_id: &str, index: u32) -> String {
    calculate_hash(&format!("{}#{}", source_id, index))
}
