//! Mining identity.

use std::fmt;

/// Opaque 32-byte identity of a block producer.
///
/// Derived from the node's signing key by the bootstrap layer; the
/// coordinator only ever compares and forwards it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MinerId([u8; 32]);

impl MinerId {
    /// Construct an identity from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a stable identity from an arbitrary seed.
    pub fn from_seed(seed: &[u8]) -> Self {
        Self(*blake3::hash(seed).as_bytes())
    }

    /// Get the bytes as a slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MinerId({}..)", &hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for MinerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seed_stable() {
        assert_eq!(MinerId::from_seed(b"node-1"), MinerId::from_seed(b"node-1"));
        assert_ne!(MinerId::from_seed(b"node-1"), MinerId::from_seed(b"node-2"));
    }
}
