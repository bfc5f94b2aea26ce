use thiserror::Error;

/// Key and signature decoding failures.
///
/// A signature that decodes but does not match is not an error here: the
/// verifier reports it as `false` and the session turns it into a status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("producer key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("producer key is not valid hex: {0}")]
    InvalidKeyEncoding(String),

    #[error("producer key is not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("block signature must be {expected} bytes, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    #[error("block signature does not match")]
    SignatureMismatch,
}
