//! # Rule Registry — the copy-lifecycle engine
//!
//! The central state machine of the protocol. Each rule is identified by
//! a deterministic hash of {creator id, validation module, permission
//! flags, statement} and walks the states
//!
//! ```text
//! NIL → EXIST ⇄ PAUSED
//! ```
//!
//! A hash can cycle between EXIST and PAUSED forever but never returns to
//! NIL: once a rule has existed, its record is retained permanently for
//! audit. Re-registering the same tuple is idempotent on the record — it
//! reactivates the hash, it never creates a duplicate or rewrites history.
//!
//! The registry also owns every copy token: which rule it was minted
//! under (immutable), its content-pointer snapshot, its expiry, and its
//! holder. Per-creator indices are kept dense with swap-and-pop removal,
//! with a reverse position map updated in the same operation.
//!
//! ## The anti-abuse guarantee
//!
//! A creator can never revoke a non-revokable, unexpired copy. Collectors
//! rely on that line; it is enforced in exactly one place
//! ([`RuleRegistry::revoke`]) on purpose.
//!
//! ## What is NOT here
//!
//! Fee/window/limit enforcement belongs to the validation module, and the
//! wiring of "validate, then mutate" belongs to [`crate::hub`]. This
//! module never touches money.

use chrono::{DateTime, Utc};
use replica_protocol::config;
use replica_protocol::crypto::hash::{derive_copy_id, domain_separated_hash_multi};
use replica_protocol::env::{saturating_add_secs, CallContext};
use replica_protocol::Address;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::creator_registry::{CreatorError, CreatorId};
use crate::validation::ValidationError;

/// Deterministic fingerprint of a rule: hex-encoded 32-byte digest.
pub type RuleHash = String;

/// Identifier of a copy token: hex-encoded 32-byte digest.
pub type CopyId = String;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from rule-registry and copy-lifecycle operations.
#[derive(Debug, Error)]
pub enum RuleError {
    /// No rule has ever been registered under this hash.
    #[error("rule not found: {0}")]
    RuleNotFound(RuleHash),

    /// The rule exists but is not in the EXIST state.
    #[error("rule {rule_hash} is {state}, expected EXIST")]
    RuleNotActive {
        /// The rule in question.
        rule_hash: RuleHash,
        /// Its current state.
        state: RuleState,
    },

    /// The referenced copy token does not exist.
    #[error("copy token not found: {0}")]
    CopyNotFound(CopyId),

    /// The caller may not perform this operation.
    #[error("unauthorized: {caller} may not {action}")]
    Unauthorized {
        /// The address that attempted the operation.
        caller: Address,
        /// What it tried to do.
        action: &'static str,
    },

    /// The validation module named by a rule is not on the allow-list.
    #[error("validation module not allow-listed: {0}")]
    ModuleNotAllowed(Address),

    /// Revocation attempted on a non-revokable, unexpired copy.
    #[error("copy {0} is not revokable and not expired")]
    NotRevokable(CopyId),

    /// Extension attempted under a rule without the extendable flag.
    #[error("copy {0} is not extendable")]
    NotExtendable(CopyId),

    /// Update attempted under a rule without the updatable flag.
    #[error("copy {0} is not updatable")]
    NotUpdatable(CopyId),

    /// Transfer attempted under a rule without the transferable flag.
    #[error("copy {0} is not transferable")]
    NotTransferable(CopyId),

    /// The copy is expired and the operation requires it unexpired.
    #[error("copy {0} is expired")]
    CopyExpired(CopyId),

    /// A creator-registry failure surfaced through a rule operation.
    #[error(transparent)]
    Creator(#[from] CreatorError),

    /// A validation-module failure surfaced through a rule operation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle state of a rule hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleState {
    /// The hash has never been registered. Not stored — this is what the
    /// registry reports for unknown hashes.
    Nil,
    /// Registered and accepting new copy creation.
    Exist,
    /// Paused: new creation is rejected, but extension of already-minted
    /// copies still works. Existing holders are not punished for a supply
    /// cutoff.
    Paused,
}

impl std::fmt::Display for RuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleState::Nil => write!(f, "NIL"),
            RuleState::Exist => write!(f, "EXIST"),
            RuleState::Paused => write!(f, "PAUSED"),
        }
    }
}

/// What the copy licenses the collector to do with the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    /// Redistribute the content as-is.
    Distribution,
    /// Publicly exhibit the content.
    Exhibition,
    /// Produce derivative works.
    Adaptation,
}

impl Statement {
    fn tag(self) -> u8 {
        match self {
            Statement::Distribution => 0,
            Statement::Exhibition => 1,
            Statement::Adaptation => 2,
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Distribution => write!(f, "Distribution"),
            Statement::Exhibition => write!(f, "Exhibition"),
            Statement::Adaptation => write!(f, "Adaptation"),
        }
    }
}

/// The four permissions a rule grants over its copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    /// Copies may change hands (while unexpired).
    pub transferable: bool,
    /// Copy content pointers may be re-pointed (while unexpired).
    pub updatable: bool,
    /// The creator may revoke unexpired copies.
    pub revokable: bool,
    /// Copies may be extended past their original expiry.
    pub extendable: bool,
}

/// Everything that goes into registering a rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDescriptor {
    /// The creator token this rule mints copies of.
    pub creator_id: CreatorId,
    /// The allow-listed validation module enforcing mint/extend conditions.
    pub module: Address,
    /// Permission flags for copies minted under this rule.
    pub flags: PermissionFlags,
    /// The declared licensing statement.
    pub statement: Statement,
    /// Opaque additional data carried on the record. Not part of the rule
    /// hash — two registrations differing only here are the same rule, and
    /// the first registration's data wins.
    pub data: serde_json::Value,
}

/// A registered rule: the immutable record plus its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    /// The rule's own hash, for convenience when records travel alone.
    pub rule_hash: RuleHash,
    /// The creator token this rule belongs to.
    pub creator_id: CreatorId,
    /// The validation module bound at registration time.
    pub module: Address,
    /// Permission flags.
    pub flags: PermissionFlags,
    /// The declared licensing statement.
    pub statement: Statement,
    /// Opaque additional data from the first registration.
    pub data: serde_json::Value,
    /// Current lifecycle state (EXIST or PAUSED; NIL records don't exist).
    pub state: RuleState,
}

/// A copy token: the derived NFT minted under a rule.
///
/// Permission flags are read through the owning [`RuleRecord`], never
/// duplicated here — a copy's capabilities are exactly its rule's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyToken {
    /// Deterministic token id.
    pub id: CopyId,
    /// The rule this copy was minted under. Immutable.
    pub rule_hash: RuleHash,
    /// Current holder.
    pub holder: Address,
    /// Snapshot of the creator's content pointer at mint time (or the
    /// holder's replacement, if the rule is updatable).
    pub content_pointer: String,
    /// When this copy lapses. Saturates at the maximum representable
    /// instant rather than overflowing.
    pub expiry: DateTime<Utc>,
    /// Timestamp when the copy was minted.
    pub created_at: DateTime<Utc>,
}

/// Compute the deterministic rule hash for a descriptor.
///
/// Domain-separated BLAKE3 over (creator id, module, the four flags, the
/// statement). The opaque data field is deliberately excluded: the hash
/// identifies the *rule*, not its annotations.
pub fn compute_rule_hash(desc: &RuleDescriptor) -> RuleHash {
    let flag_bytes = [
        desc.flags.transferable as u8,
        desc.flags.updatable as u8,
        desc.flags.revokable as u8,
        desc.flags.extendable as u8,
    ];
    hex::encode(domain_separated_hash_multi(
        config::DOMAIN_RULE_HASH,
        &[
            desc.creator_id.as_bytes(),
            desc.module.as_bytes(),
            &flag_bytes,
            &[desc.statement.tag()],
        ],
    ))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Rule records, copy tokens, and the indices tying them to creators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleRegistry {
    /// Every rule ever registered, keyed by hash. Entries are never removed.
    rules: HashMap<RuleHash, RuleRecord>,
    /// Every hash a creator has ever used, in registration order.
    creator_rules: HashMap<CreatorId, Vec<RuleHash>>,
    /// Live copy tokens.
    copies: HashMap<CopyId, CopyToken>,
    /// Dense per-creator copy index.
    creator_copies: HashMap<CreatorId, Vec<CopyId>>,
    /// Reverse index: copy id → position in its creator's index. Kept in
    /// lockstep with `creator_copies` across swap-and-pop removals.
    copy_positions: HashMap<CopyId, usize>,
    /// Copies ever minted per (recipient, creator), for id derivation.
    copy_counters: HashMap<(Address, CreatorId), u64>,
    /// holder → operators approved to act on the holder's copies.
    operators: HashMap<Address, HashSet<Address>>,
}

impl RuleRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // -- rule lifecycle -----------------------------------------------------

    /// Registers (or reactivates) the rule described by `desc`.
    ///
    /// If the hash is NIL the record is persisted and appended to the
    /// creator's rule index; in every case the state ends up EXIST.
    /// Returns the hash and whether a new record was created.
    ///
    /// Authorization (creator holder/delegate, module allow-list) is the
    /// hub's job and has already happened by the time this runs.
    pub fn register(&mut self, desc: RuleDescriptor) -> (RuleHash, bool) {
        let rule_hash = compute_rule_hash(&desc);
        match self.rules.get_mut(&rule_hash) {
            Some(record) => {
                record.state = RuleState::Exist;
                (rule_hash, false)
            }
            None => {
                self.creator_rules
                    .entry(desc.creator_id.clone())
                    .or_default()
                    .push(rule_hash.clone());
                self.rules.insert(
                    rule_hash.clone(),
                    RuleRecord {
                        rule_hash: rule_hash.clone(),
                        creator_id: desc.creator_id,
                        module: desc.module,
                        flags: desc.flags,
                        statement: desc.statement,
                        data: desc.data,
                        state: RuleState::Exist,
                    },
                );
                (rule_hash, true)
            }
        }
    }

    /// Pauses a rule. New creation is rejected from here on; extension of
    /// existing copies is unaffected.
    pub fn pause(&mut self, rule_hash: &str) -> Result<(), RuleError> {
        let record = self
            .rules
            .get_mut(rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.to_string()))?;
        record.state = RuleState::Paused;
        Ok(())
    }

    /// The state of a hash. Unknown hashes report NIL.
    pub fn state(&self, rule_hash: &str) -> RuleState {
        self.rules
            .get(rule_hash)
            .map(|r| r.state)
            .unwrap_or(RuleState::Nil)
    }

    /// The rule record for a hash, if one has ever been registered.
    pub fn record(&self, rule_hash: &str) -> Option<&RuleRecord> {
        self.rules.get(rule_hash)
    }

    /// Every hash this creator has ever registered, in order.
    pub fn rule_hashes_for_creator(&self, creator_id: &str) -> &[RuleHash] {
        self.creator_rules
            .get(creator_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // -- copy lifecycle -----------------------------------------------------

    /// Mints a copy under `rule_hash` for `recipient`.
    ///
    /// Requires the rule to be EXIST. The copy id is derived from
    /// (recipient, creator, per-pair counter); expiry is `now + duration`,
    /// saturating. `content_snapshot` is the creator's pointer as fetched
    /// by the hub *after* validation succeeded.
    ///
    /// Validation (fees, window, limit) has already run — this method is
    /// the state mutation that §"checks, pay, mutate" ordering ends with.
    pub fn mint_copy(
        &mut self,
        recipient: &str,
        rule_hash: &str,
        duration: u64,
        now: DateTime<Utc>,
        content_snapshot: String,
    ) -> Result<(CopyId, DateTime<Utc>), RuleError> {
        let record = self
            .rules
            .get(rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(rule_hash.to_string()))?;
        if record.state != RuleState::Exist {
            return Err(RuleError::RuleNotActive {
                rule_hash: rule_hash.to_string(),
                state: record.state,
            });
        }
        let creator_id = record.creator_id.clone();

        let counter = self
            .copy_counters
            .entry((recipient.to_string(), creator_id.clone()))
            .or_insert(0);
        *counter += 1;
        let copy_id = derive_copy_id(recipient, &creator_id, *counter);
        let expiry = saturating_add_secs(now, duration);

        self.copies.insert(
            copy_id.clone(),
            CopyToken {
                id: copy_id.clone(),
                rule_hash: rule_hash.to_string(),
                holder: recipient.to_string(),
                content_pointer: content_snapshot,
                expiry,
                created_at: now,
            },
        );
        let index = self.creator_copies.entry(creator_id).or_default();
        self.copy_positions.insert(copy_id.clone(), index.len());
        index.push(copy_id.clone());

        Ok((copy_id, expiry))
    }

    /// Revokes a copy: creator-initiated destruction.
    ///
    /// Only allowed if the rule is revokable OR the copy has expired. The
    /// caller's creator-side authorization is checked by the hub; the
    /// precondition here is the collector-facing guarantee and lives with
    /// the state it protects.
    pub fn revoke(&mut self, copy_id: &str, now: DateTime<Utc>) -> Result<(), RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let record = self
            .rules
            .get(&copy.rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))?;
        if !record.flags.revokable && copy.expiry >= now {
            return Err(RuleError::NotRevokable(copy_id.to_string()));
        }
        self.remove_copy(copy_id)
    }

    /// Destroys a copy at its holder's request.
    ///
    /// Always permitted for the holder (or an approved operator),
    /// regardless of the revokable flag or expiry — holders may always
    /// walk away.
    pub fn destroy(&mut self, ctx: &CallContext, copy_id: &str) -> Result<(), RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        if !self.is_holder_or_operator(&ctx.caller, &copy.holder) {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "destroy this copy",
            });
        }
        self.remove_copy(copy_id)
    }

    /// Applies an extension to a copy's expiry and returns the new value.
    ///
    /// An expired copy restarts from `now + duration`; an unexpired one
    /// stacks `duration` on top of its current expiry. Both saturate. The
    /// first case avoids compounding on a stale clock after a lapse; the
    /// second keeps paid-for time from being silently discarded.
    ///
    /// The extendable flag and the extension payment have already been
    /// checked by the hub, in that order.
    pub fn extend_expiry(
        &mut self,
        copy_id: &str,
        duration: u64,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RuleError> {
        let copy = self
            .copies
            .get_mut(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let base = if copy.expiry < now { now } else { copy.expiry };
        copy.expiry = saturating_add_secs(base, duration);
        Ok(copy.expiry)
    }

    /// Re-points a copy's content pointer.
    ///
    /// Requires the rule's updatable flag, an unexpired copy, and a caller
    /// who is the holder or an approved operator.
    pub fn update_copy(
        &mut self,
        ctx: &CallContext,
        copy_id: &str,
        content_pointer: &str,
    ) -> Result<(), RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let record = self
            .rules
            .get(&copy.rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))?;
        if !record.flags.updatable {
            return Err(RuleError::NotUpdatable(copy_id.to_string()));
        }
        if copy.expiry < ctx.now {
            return Err(RuleError::CopyExpired(copy_id.to_string()));
        }
        if !self.is_holder_or_operator(&ctx.caller, &copy.holder) {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "update this copy",
            });
        }
        // Re-borrow mutably; the checks above only needed reads.
        let copy = self
            .copies
            .get_mut(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        copy.content_pointer = content_pointer.to_string();
        Ok(())
    }

    /// Transfers a copy to a new holder.
    ///
    /// Holder-to-holder movement requires the transferable flag and an
    /// unexpired copy. Mint and burn paths never come through here, which
    /// is exactly how they stay exempt from the check.
    pub fn transfer(
        &mut self,
        ctx: &CallContext,
        copy_id: &str,
        to: &str,
    ) -> Result<(), RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let record = self
            .rules
            .get(&copy.rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))?;
        if !record.flags.transferable {
            return Err(RuleError::NotTransferable(copy_id.to_string()));
        }
        if copy.expiry < ctx.now {
            return Err(RuleError::CopyExpired(copy_id.to_string()));
        }
        if !self.is_holder_or_operator(&ctx.caller, &copy.holder) {
            return Err(RuleError::Unauthorized {
                caller: ctx.caller.clone(),
                action: "transfer this copy",
            });
        }
        let copy = self
            .copies
            .get_mut(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        copy.holder = to.to_string();
        Ok(())
    }

    /// Approves or revokes `operator` for all of the caller's copies.
    pub fn set_operator(&mut self, ctx: &CallContext, operator: &str, approved: bool) {
        let set = self.operators.entry(ctx.caller.clone()).or_default();
        if approved {
            set.insert(operator.to_string());
        } else {
            set.remove(operator);
        }
    }

    // -- lookups & predicates ------------------------------------------------

    /// The full copy record.
    pub fn copy(&self, copy_id: &str) -> Option<&CopyToken> {
        self.copies.get(copy_id)
    }

    /// Current holder of a copy.
    pub fn holder_of(&self, copy_id: &str) -> Result<&Address, RuleError> {
        self.copies
            .get(copy_id)
            .map(|c| &c.holder)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))
    }

    /// The creator a copy descends from, read through its rule record.
    pub fn creator_of(&self, copy_id: &str) -> Result<&CreatorId, RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        self.rules
            .get(&copy.rule_hash)
            .map(|r| &r.creator_id)
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))
    }

    /// When a copy lapses.
    pub fn expire_at(&self, copy_id: &str) -> Result<DateTime<Utc>, RuleError> {
        self.copies
            .get(copy_id)
            .map(|c| c.expiry)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))
    }

    /// True if the copy has lapsed at `now`.
    pub fn is_expired(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        Ok(self.expire_at(copy_id)? < now)
    }

    /// True if the copy can change hands right now: transferable flag AND
    /// unexpired.
    pub fn is_transferable(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        let (flags, expired) = self.flags_and_expired(copy_id, now)?;
        Ok(flags.transferable && !expired)
    }

    /// True if the copy's pointer can be re-pointed right now: updatable
    /// flag AND unexpired.
    pub fn is_updatable(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        let (flags, expired) = self.flags_and_expired(copy_id, now)?;
        Ok(flags.updatable && !expired)
    }

    /// True if the creator can revoke the copy right now: revokable flag
    /// OR already expired.
    pub fn is_revokable(&self, copy_id: &str, now: DateTime<Utc>) -> Result<bool, RuleError> {
        let (flags, expired) = self.flags_and_expired(copy_id, now)?;
        Ok(flags.revokable || expired)
    }

    /// True if the copy's rule allows extension. Expiry-independent:
    /// lapsed copies are exactly what extension is for.
    pub fn is_extendable(&self, copy_id: &str) -> Result<bool, RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let record = self
            .rules
            .get(&copy.rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))?;
        Ok(record.flags.extendable)
    }

    /// True if `holder` currently holds at least one unexpired copy of
    /// `creator_id`. Scans the creator's copy index.
    pub fn has_valid_copy(&self, holder: &str, creator_id: &str, now: DateTime<Utc>) -> bool {
        self.creator_copies
            .get(creator_id)
            .map(|ids| {
                ids.iter().any(|id| {
                    self.copies
                        .get(id)
                        .is_some_and(|c| c.holder == holder && c.expiry >= now)
                })
            })
            .unwrap_or(false)
    }

    /// The creator's dense copy index, in no particular order after
    /// removals.
    pub fn copies_of_creator(&self, creator_id: &str) -> &[CopyId] {
        self.creator_copies
            .get(creator_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // -- internals ----------------------------------------------------------

    fn is_holder_or_operator(&self, caller: &str, holder: &str) -> bool {
        caller == holder
            || self
                .operators
                .get(holder)
                .is_some_and(|ops| ops.contains(caller))
    }

    /// Deregisters a copy and repairs the dense index with swap-and-pop.
    ///
    /// The moved element's reverse-index entry is updated in the same
    /// operation; the invariant is that `copy_positions[id]` is correct
    /// for every id in every creator index after any removal.
    fn remove_copy(&mut self, copy_id: &str) -> Result<(), RuleError> {
        let copy = self
            .copies
            .remove(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let creator_id = self
            .rules
            .get(&copy.rule_hash)
            .map(|r| r.creator_id.clone())
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))?;

        if let (Some(index), Some(pos)) = (
            self.creator_copies.get_mut(&creator_id),
            self.copy_positions.remove(copy_id),
        ) {
            let last = index.len() - 1;
            if pos != last {
                index.swap(pos, last);
                self.copy_positions.insert(index[pos].clone(), pos);
            }
            index.pop();
        }
        Ok(())
    }

    fn flags_and_expired(
        &self,
        copy_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(PermissionFlags, bool), RuleError> {
        let copy = self
            .copies
            .get(copy_id)
            .ok_or_else(|| RuleError::CopyNotFound(copy_id.to_string()))?;
        let record = self
            .rules
            .get(&copy.rule_hash)
            .ok_or_else(|| RuleError::RuleNotFound(copy.rule_hash.clone()))?;
        Ok((record.flags, copy.expiry < now))
    }
}
