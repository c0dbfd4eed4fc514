//! # Key Management
//!
//! Ed25519 keypair generation and serialization for REPLICA identities.
//!
//! Every participant — creators, collectors, delegates, validation-module
//! owners — is identified by the hex encoding of an Ed25519 public key.
//! That hex string is the [`Address`] type used throughout the contract
//! layer.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek).
//! - Key generation uses the OS RNG (`OsRng`). If your OS RNG is broken,
//!   you have bigger problems than REPLICA.
//! - Secret key bytes are never logged and never appear in `Debug` output.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// An on-ledger identity: the hex encoding of an Ed25519 public key.
///
/// 64 lowercase hex characters. Plain `String` rather than a newtype
/// because these travel through serde, map keys, and event payloads
/// constantly, and the contract layer never does arithmetic on them.
pub type Address = String;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed — leaking details
/// about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or not a valid scalar")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

/// A REPLICA identity keypair wrapping an Ed25519 signing key.
///
/// This is the atomic unit of identity. Every address, every permit
/// signature ultimately traces back to one of these.
///
/// `ReplicaKeypair` intentionally does NOT implement
/// `Serialize`/`Deserialize`. Serializing private keys should be a
/// deliberate act, not something that happens because someone shoved a
/// keypair into a JSON response. Use `to_bytes()` / `from_bytes()`
/// explicitly.
pub struct ReplicaKeypair {
    signing_key: SigningKey,
}

/// The public half of a REPLICA identity, safe to share with the world.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaPublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature over a message.
///
/// 64 bytes, deterministic for a given (key, message) pair. Stored as
/// `Vec<u8>` for serde compatibility; anything that isn't exactly 64
/// bytes simply fails verification — no panics.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaSignature {
    bytes: Vec<u8>,
}

impl ReplicaKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Constructs a keypair deterministically from a 32-byte seed.
    ///
    /// **Warning**: a weak seed gives you a weak key. Use a proper CSPRNG
    /// or KDF to produce the seed bytes. Deterministic seeds are fine in
    /// tests, which is mostly where this gets used.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Reconstruct a keypair from a hex-encoded secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSecretKey)?;
        if bytes.len() != SECRET_KEY_LENGTH {
            return Err(KeyError::InvalidSecretKey);
        }
        let mut arr = [0u8; SECRET_KEY_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_seed(&arr))
    }

    /// Returns the public key associated with this keypair.
    pub fn public_key(&self) -> ReplicaPublicKey {
        ReplicaPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The on-ledger address for this identity: hex of the public key.
    pub fn address(&self) -> Address {
        self.public_key().to_address()
    }

    /// Sign a message and return a `ReplicaSignature`.
    ///
    /// Ed25519 signatures are deterministic — the same (key, message)
    /// pair always produces the same signature. No nonce management, no
    /// RNG needed at signing time.
    pub fn sign(&self, message: &[u8]) -> ReplicaSignature {
        let sig = self.signing_key.sign(message);
        ReplicaSignature {
            bytes: sig.to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &ReplicaSignature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Exports the raw 32-byte secret key material.
    ///
    /// **Handle with extreme care.** Don't log it. Don't send it over the
    /// network in plaintext.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for ReplicaKeypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for ReplicaKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even
        // "partially" — a partial leak is still a leak.
        write!(f, "ReplicaKeypair(pub={})", self.public_key().to_hex())
    }
}

impl PartialEq for ReplicaKeypair {
    /// Two keypairs are equal if their public keys match. Comparing secret
    /// material in a non-constant-time way is a bad habit.
    fn eq(&self, other: &Self) -> bool {
        self.public_key() == other.public_key()
    }
}

impl Eq for ReplicaKeypair {}

// ---------------------------------------------------------------------------
// ReplicaPublicKey
// ---------------------------------------------------------------------------

impl ReplicaPublicKey {
    /// Create a `ReplicaPublicKey` from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Try to create a `ReplicaPublicKey` from a byte slice.
    ///
    /// Validates the length and that the bytes are a valid Ed25519 point.
    /// Low-order points and other degenerate cases are rejected here.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != 32 {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature against this public key.
    ///
    /// Returns a plain boolean: the vast majority of callers want a yes/no
    /// answer, and a detailed failure oracle helps nobody but attackers.
    pub fn verify(&self, message: &[u8], signature: &ReplicaSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match signature.bytes.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let dalek_sig = DalekSignature::from_bytes(&sig_bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    /// Hex-encoded representation. 64 characters for 32 bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// The on-ledger address for this key. Same bytes as [`to_hex`](Self::to_hex);
    /// the separate name states intent at call sites.
    pub fn to_address(&self) -> Address {
        self.to_hex()
    }

    /// Parse a hex-encoded public key string.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::try_from_slice(&bytes)
    }
}

impl Hash for ReplicaPublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for ReplicaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ReplicaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplicaPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// ReplicaSignature
// ---------------------------------------------------------------------------

impl ReplicaSignature {
    /// Create a signature from the raw 64-byte representation.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded signature string. 128 characters for a valid signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse a hex-encoded signature.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 64 {
            return Err(hex::FromHexError::OddLength);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Debug for ReplicaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "ReplicaSignature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "ReplicaSignature({})", hex_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_produces_valid_keypair() {
        let kp = ReplicaKeypair::generate();
        assert_eq!(kp.public_key().as_bytes().len(), 32);
        assert_eq!(kp.address().len(), 64);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let kp = ReplicaKeypair::generate();
        let msg = b"mint one copy of creator token 7";
        let sig = kp.sign(msg);
        assert!(kp.verify(msg, &sig));
    }

    #[test]
    fn wrong_message_fails_verification() {
        let kp = ReplicaKeypair::generate();
        let sig = kp.sign(b"correct message");
        assert!(!kp.verify(b"wrong message", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = ReplicaKeypair::generate();
        let kp2 = ReplicaKeypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.verify(b"message", &sig));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = ReplicaKeypair::from_seed(&seed);
        let kp2 = ReplicaKeypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn hex_roundtrip() {
        let kp = ReplicaKeypair::generate();
        let restored = ReplicaKeypair::from_hex(&hex::encode(kp.to_bytes())).unwrap();
        assert_eq!(kp.public_key(), restored.public_key());
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(ReplicaKeypair::from_hex("deadbeef").is_err());
        assert!(ReplicaKeypair::from_hex("not-hex-at-all").is_err());
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let pk = ReplicaKeypair::generate().public_key();
        let recovered = ReplicaPublicKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, recovered);
    }

    #[test]
    fn try_from_slice_rejects_wrong_length() {
        assert!(ReplicaPublicKey::try_from_slice(&[0u8; 16]).is_err());
    }

    #[test]
    fn deterministic_signatures() {
        // Ed25519 is deterministic — same key + same message = same signature.
        let kp = ReplicaKeypair::generate();
        let msg = b"determinism is underrated";
        assert_eq!(kp.sign(msg).as_bytes(), kp.sign(msg).as_bytes());
    }

    #[test]
    fn signature_hex_roundtrip() {
        let sig = ReplicaKeypair::generate().sign(b"test");
        let recovered = ReplicaSignature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(sig, recovered);
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = ReplicaKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("ReplicaKeypair(pub="));
        assert!(!debug_str.contains("signing_key"));
    }
}
