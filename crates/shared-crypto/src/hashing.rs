//! # SHA-384 Hashing
//!
//! The digest used for item hashes, Merkle nodes and block hashes.

use sha2::{Digest, Sha384};

/// SHA-384 output (384-bit).
pub type Hash384 = [u8; 48];

/// `sha384("")`: the padding leaf and the root of an empty tree.
pub const EMPTY_HASH: Hash384 = [
    0x38, 0xb0, 0x60, 0xa7, 0x51, 0xac, 0x96, 0x38, 0x4c, 0xd9, 0x32, 0x7e, 0xb1, 0xb1, 0xe3, 0x6a,
    0x21, 0xfd, 0xb7, 0x11, 0x14, 0xbe, 0x07, 0x43, 0x4c, 0x0c, 0xc7, 0xbf, 0x63, 0xf6, 0xe1, 0xda,
    0x27, 0x4e, 0xde, 0xbf, 0xe7, 0x6f, 0x65, 0xfb, 0xd5, 0x1a, 0xd2, 0xf1, 0x48, 0x98, 0xb9, 0x5b,
];

/// Stateful SHA-384 hasher.
#[derive(Clone, Default)]
pub struct Sha384Hasher {
    inner: Sha384,
}

impl Sha384Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash384 {
        self.inner.finalize().into()
    }
}

/// Hash data with SHA-384 (one-shot).
pub fn sha384_hash(data: &[u8]) -> Hash384 {
    Sha384::digest(data).into()
}

/// Parent node of two Merkle children: `sha384(left || right)`.
pub fn combine(left: &Hash384, right: &Hash384) -> Hash384 {
    let mut hasher = Sha384Hasher::new();
    hasher.update(left).update(right);
    hasher.finalize()
}
