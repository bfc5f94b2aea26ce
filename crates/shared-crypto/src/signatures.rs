//! # Block Signatures
//!
//! A block proof carries the producer's Ed25519 signature over the block
//! hash the session computed. Sessions only see the [`SignatureVerifier`]
//! port; the node decides at start-up whether it trusts one producer key or
//! accepts everything.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::CryptoError;

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;

/// Checks a producer signature over a block hash.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, block_hash: &[u8], signature: &[u8]) -> bool;
}

/// A producer's public key, validated as a curve point on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(VerifyingKey);

impl Ed25519PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Parse the hex form used in `BN_PUBLIC_KEY`.
    pub fn from_hex(encoded: &str) -> Result<Self, CryptoError> {
        let raw = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;
        let actual = raw.len();
        let bytes = <[u8; PUBLIC_KEY_LENGTH]>::try_from(raw).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                actual,
            }
        })?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        self.0.as_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Strict verification: rejects malleable and small-order signatures.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.0
            .verify_strict(message, &signature)
            .map_err(|_| CryptoError::SignatureMismatch)
    }
}

/// Raw signature bytes as carried in a block proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; SIGNATURE_LENGTH]);

impl Ed25519Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Proofs carry the signature as a `Vec<u8>`, so the length is checked
    /// here.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        <[u8; SIGNATURE_LENGTH]>::try_from(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSignatureLength {
                expected: SIGNATURE_LENGTH,
                actual: bytes.len(),
            })
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }
}

/// Producer signing key. The node itself never signs; producers, tools and
/// tests do.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Deterministic key from a 32-byte seed. The caller's copy is wiped.
    pub fn from_seed(mut seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        seed.zeroize();
        Self { signing_key }
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key())
    }

    /// Sign a block hash.
    pub fn sign(&self, block_hash: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(block_hash).to_bytes())
    }
}

/// Trusts exactly one producer key.
#[derive(Clone, Debug)]
pub struct Ed25519SignatureVerifier {
    producer: Ed25519PublicKey,
}

impl Ed25519SignatureVerifier {
    pub fn new(producer: Ed25519PublicKey) -> Self {
        Self { producer }
    }

    pub fn producer(&self) -> &Ed25519PublicKey {
        &self.producer
    }
}

impl SignatureVerifier for Ed25519SignatureVerifier {
    fn verify(&self, block_hash: &[u8], signature: &[u8]) -> bool {
        Ed25519Signature::from_slice(signature)
            .and_then(|signature| self.producer.verify(block_hash, &signature))
            .is_ok()
    }
}

/// Accepts any signature. Used when no producer key is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAllVerifier;

impl SignatureVerifier for AcceptAllVerifier {
    fn verify(&self, _block_hash: &[u8], _signature: &[u8]) -> bool {
        true
    }
}
