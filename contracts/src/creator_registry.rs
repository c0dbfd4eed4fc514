//! # Creator Registry
//!
//! Owns creator-token identity: who holds which creator token, where its
//! content lives, and the per-recipient counters that make token ids
//! deterministic.
//!
//! Creation is permit-gated: the recipient signs a [`CreationPermit`]
//! off-line over (content pointer, copyright declaration, deadline), and
//! anyone — typically an orchestration service — submits it. The permit
//! must recover to the recipient; the caller identity itself is not
//! restricted. `create_with_delegate` additionally pre-authorizes one
//! operator for the new token, so a single orchestration call can mint
//! the creator token and then register rules on its behalf.
//!
//! Burning a creator token does not cascade: copies minted under it keep
//! their content-pointer snapshots and continue to live in the rule
//! registry. What burning does end is new activity — no holder means no
//! rule registration and no copy minting.

use chrono::{DateTime, Utc};
use replica_protocol::crypto::hash::derive_creator_id;
use replica_protocol::env::CallContext;
use replica_protocol::permit::{CreationPermit, PermitError};
use replica_protocol::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Identifier of a creator token: hex-encoded 32-byte digest derived from
/// (recipient, per-recipient counter).
pub type CreatorId = String;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during creator-registry operations.
#[derive(Debug, Error)]
pub enum CreatorError {
    /// The referenced creator token does not exist.
    #[error("creator token not found: {0}")]
    NotFound(CreatorId),

    /// The permit failed verification (expired or bad signature).
    #[error(transparent)]
    Permit(#[from] PermitError),

    /// The permit verified, but was signed by the wrong identity.
    #[error("permit signer mismatch: expected {expected}, permit recovers to {recovered}")]
    SignerMismatch {
        /// The identity the permit had to recover to.
        expected: Address,
        /// The identity it actually recovered to.
        recovered: Address,
    },

    /// The caller is not the holder of the token.
    #[error("unauthorized: {caller} is not the holder of {token}")]
    NotHolder {
        /// The address that attempted the operation.
        caller: Address,
        /// The token it tried to operate on.
        token: CreatorId,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A creator token: the primary NFT representing authored content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorToken {
    /// Deterministic token id.
    pub id: CreatorId,
    /// Current holder.
    pub holder: Address,
    /// Pointer to the authored content (e.g. an IPFS URI).
    pub content_pointer: String,
    /// Operator pre-authorized at creation time to act for this token
    /// (register rules, pause them, revoke copies). At most one.
    pub delegate: Option<Address>,
    /// Timestamp when the token was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent content-pointer update.
    pub updated_at: DateTime<Utc>,
}

/// The creator registry — token records plus per-recipient id counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatorRegistry {
    tokens: HashMap<CreatorId, CreatorToken>,
    /// Count of tokens ever created per recipient. Never decremented, so
    /// burned ids are never reused.
    counters: HashMap<Address, u64>,
}

impl CreatorRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a creator token for `recipient` with no delegate.
    pub fn create(
        &mut self,
        ctx: &CallContext,
        recipient: &str,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<CreatorId, CreatorError> {
        self.create_inner(ctx, recipient, None, content_pointer, permit)
    }

    /// Creates a creator token and pre-authorizes `delegate` as an
    /// approved operator for it.
    pub fn create_with_delegate(
        &mut self,
        ctx: &CallContext,
        recipient: &str,
        delegate: &str,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<CreatorId, CreatorError> {
        self.create_inner(
            ctx,
            recipient,
            Some(delegate.to_string()),
            content_pointer,
            permit,
        )
    }

    fn create_inner(
        &mut self,
        ctx: &CallContext,
        recipient: &str,
        delegate: Option<Address>,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<CreatorId, CreatorError> {
        let recovered = permit.verify(content_pointer, ctx.now)?;
        if recovered != recipient {
            return Err(CreatorError::SignerMismatch {
                expected: recipient.to_string(),
                recovered,
            });
        }

        let counter = self.counters.entry(recipient.to_string()).or_insert(0);
        *counter += 1;
        let id = derive_creator_id(recipient, *counter);

        self.tokens.insert(
            id.clone(),
            CreatorToken {
                id: id.clone(),
                holder: recipient.to_string(),
                content_pointer: content_pointer.to_string(),
                delegate,
                created_at: ctx.now,
                updated_at: ctx.now,
            },
        );
        Ok(id)
    }

    /// Overwrites the content pointer of `id`.
    ///
    /// Requires the caller to be the current holder AND a fresh permit
    /// over the *new* content pointer recovering to that holder. The
    /// double requirement means a stolen session can't re-point a token
    /// without the holder's key, and the holder's key alone can't be
    /// replayed against a pointer it never signed.
    pub fn update(
        &mut self,
        ctx: &CallContext,
        id: &str,
        content_pointer: &str,
        permit: &CreationPermit,
    ) -> Result<(), CreatorError> {
        let token = self
            .tokens
            .get(id)
            .ok_or_else(|| CreatorError::NotFound(id.to_string()))?;
        if token.holder != ctx.caller {
            return Err(CreatorError::NotHolder {
                caller: ctx.caller.clone(),
                token: id.to_string(),
            });
        }
        let recovered = permit.verify(content_pointer, ctx.now)?;
        if recovered != token.holder {
            return Err(CreatorError::SignerMismatch {
                expected: token.holder.clone(),
                recovered,
            });
        }

        let token = self.tokens.get_mut(id).ok_or_else(|| CreatorError::NotFound(id.to_string()))?;
        token.content_pointer = content_pointer.to_string();
        token.updated_at = ctx.now;
        Ok(())
    }

    /// Burns `id`. Holder-only, irreversible. Already-minted copies are
    /// untouched; the id is never reissued because counters only grow.
    pub fn burn(&mut self, ctx: &CallContext, id: &str) -> Result<(), CreatorError> {
        let token = self
            .tokens
            .get(id)
            .ok_or_else(|| CreatorError::NotFound(id.to_string()))?;
        if token.holder != ctx.caller {
            return Err(CreatorError::NotHolder {
                caller: ctx.caller.clone(),
                token: id.to_string(),
            });
        }
        self.tokens.remove(id);
        Ok(())
    }

    /// True if the token exists (has been created and not burned).
    pub fn exists(&self, id: &str) -> bool {
        self.tokens.contains_key(id)
    }

    /// Full record for a token.
    pub fn token(&self, id: &str) -> Option<&CreatorToken> {
        self.tokens.get(id)
    }

    /// The current holder of `id`.
    pub fn holder_of(&self, id: &str) -> Result<&Address, CreatorError> {
        self.tokens
            .get(id)
            .map(|t| &t.holder)
            .ok_or_else(|| CreatorError::NotFound(id.to_string()))
    }

    /// The current content pointer of `id`.
    pub fn content_pointer_of(&self, id: &str) -> Result<&str, CreatorError> {
        self.tokens
            .get(id)
            .map(|t| t.content_pointer.as_str())
            .ok_or_else(|| CreatorError::NotFound(id.to_string()))
    }

    /// How many creator tokens have ever been created for `recipient`.
    pub fn token_counter(&self, recipient: &str) -> u64 {
        self.counters.get(recipient).copied().unwrap_or(0)
    }

    /// Pure preview of a future token id: the id that creation number
    /// `counter + offset` for `recipient` will carry. `offset = 1` is the
    /// very next creation. Mutates nothing; downstream systems use this
    /// to pre-compute ids before submission.
    pub fn new_token_id(&self, recipient: &str, offset: u64) -> CreatorId {
        derive_creator_id(recipient, self.token_counter(recipient) + offset)
    }

    /// True if `caller` may act for creator token `id`: the holder or the
    /// pre-authorized delegate.
    pub fn is_authorized(&self, caller: &str, id: &str) -> bool {
        self.tokens.get(id).is_some_and(|t| {
            t.holder == caller || t.delegate.as_deref() == Some(caller)
        })
    }
}
