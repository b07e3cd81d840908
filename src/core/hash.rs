//! State Hashing
//!
//! SHA-256 digest over the observable parts of a table. Published with every
//! snapshot so clients and logs can tell whether two views of a table agree.

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for table state.
///
/// Order of updates is part of the hash; callers must feed fields in a
/// fixed order.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for table state.
    pub fn for_table_state() -> Self {
        Self::new(b"QDICE_TABLE_STATE_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a length-prefixed string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i64 value (little-endian).
    #[inline]
    pub fn update_i64(&mut self, value: i64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a table state hash.
///
/// The closure adds table-specific fields after the tag.
pub fn compute_state_hash<F>(tag: &str, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_table_state();
    hasher.update_str(tag);
    add_state(&mut hasher);
    hasher.finalize()
}

/// Hex form used in snapshots and logs.
pub fn to_hex(hash: &StateHash) -> String {
    hex::encode(hash)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = compute_state_hash("t", |h| h.update_u32(7));
        let b = compute_state_hash("t", |h| h.update_u32(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_depends_on_order() {
        let a = compute_state_hash("t", |h| {
            h.update_u8(1);
            h.update_u8(2);
        });
        let b = compute_state_hash("t", |h| {
            h.update_u8(2);
            h.update_u8(1);
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_strings_are_length_prefixed() {
        let a = compute_state_hash("t", |h| {
            h.update_str("ab");
            h.update_str("c");
        });
        let b = compute_state_hash("t", |h| {
            h.update_str("a");
            h.update_str("bc");
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex_length() {
        let hash = compute_state_hash("t", |_| {});
        assert_eq!(to_hex(&hash).len(), 64);
    }
}
