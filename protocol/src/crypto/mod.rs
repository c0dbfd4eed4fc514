//! # Cryptographic Primitives for REPLICA
//!
//! Everything security-related flows through here: permit signatures,
//! rule hashes, and the deterministic id derivation that downstream
//! systems rely on to pre-compute token ids.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures — fast, deterministic, and nobody has
//!   broken it.
//! - **BLAKE3** for hashing — fast everywhere, with first-class domain
//!   separation via `derive_key`.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again.

pub mod hash;
pub mod keys;
pub mod signatures;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use hash::{
    blake3_hash, blake3_hash_multi, derive_copy_id, derive_creator_id, domain_separated_hash,
};
pub use keys::{Address, ReplicaKeypair, ReplicaPublicKey, ReplicaSignature};
pub use signatures::{sign, verify};
