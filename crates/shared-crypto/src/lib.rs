//! # Shared Crypto - Block Node Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-384 | Item hashes, Merkle nodes, block hashes |
//! | `signatures` | Ed25519 | Block proof signatures |

#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{combine, sha384_hash, Hash384, Sha384Hasher, EMPTY_HASH};
pub use signatures::{
    AcceptAllVerifier, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature,
    Ed25519SignatureVerifier, SignatureVerifier,
};
