//! # Signature Verifier Selection
//!
//! Builds the verifier the verification sessions check block signatures
//! with.

use std::sync::Arc;

use shared_crypto::{
    AcceptAllVerifier, CryptoError, Ed25519PublicKey, Ed25519SignatureVerifier, SignatureVerifier,
};
use tracing::{info, warn};

/// An Ed25519 verifier for `public_key_hex`, or a verifier that accepts
/// every signature when no key is configured.
pub fn verifier_from_config(
    public_key_hex: Option<&str>,
) -> Result<Arc<dyn SignatureVerifier>, CryptoError> {
    match public_key_hex {
        Some(encoded) => {
            let key = Ed25519PublicKey::from_hex(encoded)?;
            info!(public_key = %encoded, "Verifying block signatures with Ed25519");
            Ok(Arc::new(Ed25519SignatureVerifier::new(key)))
        }
        None => {
            warn!("No producer public key configured, block signatures are not checked");
            Ok(Arc::new(AcceptAllVerifier))
        }
    }
}
