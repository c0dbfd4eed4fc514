//! # REPLICA Contracts
//!
//! The state machines of the conditional-copy token standard:
//!
//! - **creator_registry** — Creator tokens: permit-gated creation with
//!   deterministic ids, holder-gated updates and burns.
//! - **rules** — The rule registry and copy-lifecycle engine. Maps a
//!   content-addressed rule hash to an immutable rule record and a
//!   NIL → EXIST ⇄ PAUSED state; owns every copy token ever minted.
//! - **validation** — The pluggable validation seam plus the fee-gated
//!   reference module: mint windows, mint limits, holding gates, and
//!   flat or pro-rated fees settled to the creator.
//! - **bank** — The fungible token ledger fees settle through: balances,
//!   allowances, and native-value accounts.
//! - **hub** — `ReplicaHub`, the single serialized store that wires the
//!   pieces together; each of its methods is one atomic operation.
//! - **events** — The observable transition log.
//! - **query** — Read-only pagination helpers. Convenience only; nothing
//!   here is relied on for correctness.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow — `checked_add` and
//!    `checked_sub` everywhere, because wrapping arithmetic and money do
//!    not mix.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. Checks first, value transfer second, state mutation last. A failed
//!    operation leaves no observable effect.
//! 4. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod bank;
pub mod creator_registry;
pub mod events;
pub mod hub;
pub mod query;
pub mod rules;
pub mod validation;

pub use hub::ReplicaHub;
