//! # Digital Signatures
//!
//! Ed25519 signing and verification helpers over the key wrappers.
//!
//! Free functions rather than methods-only, for the same reasons the rest
//! of the crate wraps ed25519-dalek instead of using it directly:
//!
//! 1. A single place to audit all signing operations.
//! 2. Consistent error types across the codebase.
//! 3. Type safety — you can't accidentally pass a hash where a message goes.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use thiserror::Error;

use super::keys::{ReplicaKeypair, ReplicaPublicKey, ReplicaSignature};

/// Errors during signature operations.
///
/// Intentionally vague — we don't tell attackers why verification failed.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid public key")]
    InvalidPublicKey,
}

/// Sign a message using a REPLICA keypair.
///
/// Produces a 64-byte Ed25519 signature, deterministic per (key, message)
/// pair (RFC 8032). No nonce reuse bugs possible.
pub fn sign(keypair: &ReplicaKeypair, message: &[u8]) -> ReplicaSignature {
    keypair.sign(message)
}

/// Verify an Ed25519 signature against a public key and message.
///
/// Returns `true` if the signature is valid, `false` otherwise. We
/// intentionally don't distinguish "invalid signature" from "wrong public
/// key" — both are just "nope".
pub fn verify(public_key: &ReplicaPublicKey, message: &[u8], signature: &ReplicaSignature) -> bool {
    public_key.verify(message, signature)
}

/// Verify a signature from raw byte components.
///
/// The "I got these bytes off the wire and need to check them" variant.
/// Parses the public key and signature bytes, then verifies.
pub fn verify_raw(
    public_key_bytes: &[u8; 32],
    message: &[u8],
    signature_bytes: &[u8; 64],
) -> Result<(), SignatureError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key_bytes).map_err(|_| SignatureError::InvalidPublicKey)?;
    let signature = DalekSignature::from_bytes(signature_bytes);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = ReplicaKeypair::generate();
        let msg = b"hello, world";
        let sig = sign(&kp, msg);
        assert!(verify(&kp.public_key(), msg, &sig));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = ReplicaKeypair::generate();
        let sig = sign(&kp, b"correct message");
        assert!(!verify(&kp.public_key(), b"wrong message", &sig));
    }

    #[test]
    fn verify_raw_roundtrip() {
        let kp = ReplicaKeypair::generate();
        let msg = b"raw bytes path";
        let sig = sign(&kp, msg);
        let mut sig_arr = [0u8; 64];
        sig_arr.copy_from_slice(sig.as_bytes());
        assert!(verify_raw(kp.public_key().as_bytes(), msg, &sig_arr).is_ok());
    }

    #[test]
    fn verify_raw_with_invalid_pubkey() {
        // All zeros is the identity point, a small-order point that must
        // be rejected.
        assert!(verify_raw(&[0u8; 32], b"doesn't matter", &[0u8; 64]).is_err());
    }
}
