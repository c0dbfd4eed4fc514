//! # Creation Permits
//!
//! A permit is an off-line-produced, time-bounded authorization for
//! creating (or re-pointing) a creator token. The signer — the identity
//! that will hold the token — signs a digest over three things:
//!
//! 1. the content pointer the token will carry,
//! 2. the fixed copyright declaration (see `config::COPYRIGHT_DECLARATION`),
//! 3. a deadline after which the permit is dead.
//!
//! Verification recomputes the digest, checks the deadline is strictly in
//! the future, verifies the Ed25519 signature, and returns the signer's
//! address. **The verifier does not check who the token is for** — the
//! caller must compare the returned address against the intended
//! recipient. That split keeps this module pure and reusable for both
//! creation and update flows.
//!
//! ## No replay cache
//!
//! Deliberately. A permit authorizes exactly one (content pointer,
//! declaration) pair tied to one recipient check, and creation is
//! otherwise unconditional, so re-presenting the same permit before its
//! deadline is idempotent authorization, not a replay attack.
//!
//! ## On "recovery"
//!
//! Ed25519 cannot recover a public key from a signature the way secp256k1
//! ecrecover does, so the permit carries the signer's public key
//! explicitly. Verifying the signature against that key and deriving the
//! address from it gives identical authorization semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::crypto::hash::domain_separated_hash_multi;
use crate::crypto::keys::{Address, ReplicaKeypair, ReplicaPublicKey, ReplicaSignature};

/// Errors from permit verification.
#[derive(Debug, Error)]
pub enum PermitError {
    /// The deadline is not strictly in the future at verification time.
    #[error("permit expired: deadline {deadline} is not in the future")]
    Expired {
        /// The permit's deadline.
        deadline: DateTime<Utc>,
    },

    /// The signature does not verify against the carried public key.
    #[error("invalid permit signature")]
    InvalidSignature,
}

/// A signed, time-bounded authorization to create or update a creator token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationPermit {
    /// The public key of the identity granting the authorization.
    pub signer: ReplicaPublicKey,
    /// The instant after which this permit no longer authorizes anything.
    pub deadline: DateTime<Utc>,
    /// Ed25519 signature over the permit digest.
    pub signature: ReplicaSignature,
}

impl CreationPermit {
    /// Sign a permit for the given content pointer.
    ///
    /// This is the off-line half: wallets and tooling call it; contracts
    /// only ever call [`verify`](Self::verify).
    pub fn sign(keypair: &ReplicaKeypair, content_pointer: &str, deadline: DateTime<Utc>) -> Self {
        let digest = permit_digest(content_pointer, deadline);
        Self {
            signer: keypair.public_key(),
            deadline,
            signature: keypair.sign(&digest),
        }
    }

    /// Verify this permit for `content_pointer` at time `now`.
    ///
    /// On success returns the signer's address. The caller is responsible
    /// for checking that address against the intended token recipient or
    /// current holder.
    ///
    /// # Errors
    ///
    /// [`PermitError::Expired`] if `deadline <= now`;
    /// [`PermitError::InvalidSignature`] if the signature fails.
    pub fn verify(&self, content_pointer: &str, now: DateTime<Utc>) -> Result<Address, PermitError> {
        if self.deadline <= now {
            return Err(PermitError::Expired {
                deadline: self.deadline,
            });
        }
        let digest = permit_digest(content_pointer, self.deadline);
        if !self.signer.verify(&digest, &self.signature) {
            return Err(PermitError::InvalidSignature);
        }
        Ok(self.signer.to_address())
    }
}

/// The canonical permit digest: domain-separated BLAKE3 over
/// (content pointer, declaration, deadline).
///
/// The deadline is hashed as the i64 little-endian microsecond timestamp,
/// so a re-signed permit with a different deadline is a different message.
fn permit_digest(content_pointer: &str, deadline: DateTime<Utc>) -> [u8; 32] {
    domain_separated_hash_multi(
        config::DOMAIN_PERMIT,
        &[
            content_pointer.as_bytes(),
            config::COPYRIGHT_DECLARATION.as_bytes(),
            &deadline.timestamp_micros().to_le_bytes(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn in_one_hour() -> DateTime<Utc> {
        Utc::now() + TimeDelta::hours(1)
    }

    #[test]
    fn valid_permit_returns_signer_address() {
        let kp = ReplicaKeypair::generate();
        let permit = CreationPermit::sign(&kp, "ipfs://QmArt", in_one_hour());
        let recovered = permit.verify("ipfs://QmArt", Utc::now()).unwrap();
        assert_eq!(recovered, kp.address());
    }

    #[test]
    fn expired_permit_rejected() {
        let kp = ReplicaKeypair::generate();
        let deadline = Utc::now() - TimeDelta::seconds(1);
        let permit = CreationPermit::sign(&kp, "ipfs://QmArt", deadline);
        assert!(matches!(
            permit.verify("ipfs://QmArt", Utc::now()),
            Err(PermitError::Expired { .. })
        ));
    }

    #[test]
    fn deadline_exactly_now_rejected() {
        // "Strictly in the future" — equality is not enough.
        let kp = ReplicaKeypair::generate();
        let now = Utc::now();
        let permit = CreationPermit::sign(&kp, "ipfs://QmArt", now);
        assert!(permit.verify("ipfs://QmArt", now).is_err());
    }

    #[test]
    fn wrong_content_pointer_rejected() {
        let kp = ReplicaKeypair::generate();
        let permit = CreationPermit::sign(&kp, "ipfs://QmArt", in_one_hour());
        assert!(matches!(
            permit.verify("ipfs://QmOther", Utc::now()),
            Err(PermitError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_deadline_rejected() {
        // Extending the deadline after signing invalidates the signature.
        let kp = ReplicaKeypair::generate();
        let mut permit = CreationPermit::sign(&kp, "ipfs://QmArt", in_one_hour());
        permit.deadline = permit.deadline + TimeDelta::days(365);
        assert!(matches!(
            permit.verify("ipfs://QmArt", Utc::now()),
            Err(PermitError::InvalidSignature)
        ));
    }

    #[test]
    fn permit_from_another_key_recovers_that_key() {
        // The verifier returns whoever signed; recipient equality is the
        // caller's job.
        let kp1 = ReplicaKeypair::generate();
        let kp2 = ReplicaKeypair::generate();
        let permit = CreationPermit::sign(&kp1, "ipfs://QmArt", in_one_hour());
        let recovered = permit.verify("ipfs://QmArt", Utc::now()).unwrap();
        assert_ne!(recovered, kp2.address());
    }

    #[test]
    fn re_presenting_unexpired_permit_is_allowed() {
        let kp = ReplicaKeypair::generate();
        let permit = CreationPermit::sign(&kp, "ipfs://QmArt", in_one_hour());
        assert!(permit.verify("ipfs://QmArt", Utc::now()).is_ok());
        assert!(permit.verify("ipfs://QmArt", Utc::now()).is_ok());
    }

    #[test]
    fn permit_serialization_roundtrip() {
        let kp = ReplicaKeypair::generate();
        let permit = CreationPermit::sign(&kp, "ipfs://QmArt", in_one_hour());
        let json = serde_json::to_string(&permit).unwrap();
        let restored: CreationPermit = serde_json::from_str(&json).unwrap();
        assert!(restored.verify("ipfs://QmArt", Utc::now()).is_ok());
    }
}
