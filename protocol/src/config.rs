//! # Protocol Configuration & Constants
//!
//! Every magic number in REPLICA lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! Several of these values participate in hashing — the domain tags and
//! the copyright declaration are baked into rule hashes, token ids, and
//! permit digests. Changing them invalidates every id ever derived, so
//! treat them as consensus-critical.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Protocol fingerprint, used in logs and handshake-style identification.
pub const PROTOCOL_FINGERPRINT: &str = "REPLICA-2026";

/// The full crate version string, assembled at compile time.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Copyright Declaration
// ---------------------------------------------------------------------------

/// The fixed copyright-declaration string every creation permit signs over.
///
/// A permit is a signature over (content pointer, this declaration, a
/// deadline). Binding the declaration into the digest means a signer can
/// never claim they authorized a token creation without also having made
/// this statement about the content.
pub const COPYRIGHT_DECLARATION: &str =
    "I hereby declare that I am the copyright holder of this content and \
     authorize the creation of a REPLICA creator token bound to it.";

// ---------------------------------------------------------------------------
// Domain-Separation Tags
// ---------------------------------------------------------------------------
//
// BLAKE3 derive_key contexts. Two hashes computed under different tags can
// never collide, which is exactly what we want for ids that live in the
// same key space as each other and as rule hashes.

/// Domain tag for permit digests.
pub const DOMAIN_PERMIT: &str = "replica-v1 permit";

/// Domain tag for creator-token id derivation.
pub const DOMAIN_CREATOR_ID: &str = "replica-v1 creator-token-id";

/// Domain tag for copy-token id derivation.
pub const DOMAIN_COPY_ID: &str = "replica-v1 copy-token-id";

/// Domain tag for rule hashes.
pub const DOMAIN_RULE_HASH: &str = "replica-v1 rule-hash";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 — deterministic signatures, 128-bit security, no nonce footguns.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Ed25519 secret keys are 32 bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public (verifying) keys are 32 bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signatures are 64 bytes. Always.
pub const SIGNATURE_LENGTH: usize = 64;

/// BLAKE3 digests are 32 bytes; token ids and rule hashes are their
/// hex encoding, 64 characters.
pub const HASH_OUTPUT_LENGTH: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_tags_are_distinct() {
        // Colliding tags would collapse separate key spaces into one.
        let tags = [
            DOMAIN_PERMIT,
            DOMAIN_CREATOR_ID,
            DOMAIN_COPY_ID,
            DOMAIN_RULE_HASH,
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in tags.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn declaration_is_not_empty() {
        assert!(!COPYRIGHT_DECLARATION.is_empty());
        assert!(COPYRIGHT_DECLARATION.contains("copyright"));
    }

    #[test]
    fn crypto_parameter_sizes() {
        assert_eq!(SIGNING_KEY_LENGTH, 32);
        assert_eq!(VERIFYING_KEY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(HASH_OUTPUT_LENGTH, 32);
    }
}
