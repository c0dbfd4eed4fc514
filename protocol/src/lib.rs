//! # REPLICA Protocol — Core Library
//!
//! REPLICA is a conditional-copy token standard: a creator token represents
//! original authored content, and derived copy tokens can only be minted
//! when a creator-configured, pluggable rule says so. This crate holds the
//! primitives the contract layer is built on:
//!
//! - **crypto** — Ed25519 keys and signatures, BLAKE3 hashing, and the
//!   deterministic id derivation that lets downstream systems pre-compute
//!   token ids before submission.
//! - **permit** — Time-bounded, recipient-checked authorization for
//!   creator-token creation and updates. Signed off-line, verified on-line.
//! - **env** — The call context handed to every contract entry point by
//!   the host runtime: authenticated caller, shared clock, attached value.
//! - **config** — Protocol constants. Every magic number lives there.
//!
//! The actual state machines — creator registry, rule registry, validation
//! modules — live in the `replica-contracts` crate and only ever talk to
//! the host world through the types defined here.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over cleverness. Money moves through this code.
//! 2. Every failure is a typed, rejected operation — never a panic.
//! 3. Deterministic everything: ids, hashes, signatures. If two nodes
//!    disagree on a derived id, one of them has a hardware problem.

pub mod config;
pub mod crypto;
pub mod env;
pub mod permit;

pub use crypto::keys::{Address, ReplicaKeypair, ReplicaPublicKey, ReplicaSignature};
pub use env::CallContext;
pub use permit::CreationPermit;
