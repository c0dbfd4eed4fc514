//! # Event Log
//!
//! Every observable state transition appends a typed event. External
//! collaborators (indexers, marketplaces) reconstruct the full token
//! graph from this log alone, so each variant carries the identifiers a
//! reader needs without further queries.
//!
//! Events are also emitted through `tracing` at the moment they are
//! recorded. The library never installs a subscriber; that is the host
//! binary's job.

use chrono::{DateTime, Utc};
use replica_protocol::Address;
use serde::{Deserialize, Serialize};

use crate::creator_registry::CreatorId;
use crate::rules::{CopyId, RuleHash};

/// A state transition worth telling the outside world about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaEvent {
    /// A creator token was minted.
    CreatorCreated {
        /// The new token.
        id: CreatorId,
        /// Its holder.
        holder: Address,
        /// Its content pointer.
        content_pointer: String,
    },
    /// A creator token's content pointer changed.
    CreatorUpdated {
        /// The token.
        id: CreatorId,
        /// The new pointer.
        content_pointer: String,
    },
    /// A creator token was burned.
    CreatorBurned {
        /// The token.
        id: CreatorId,
    },
    /// A rule was registered or reactivated.
    RuleSet {
        /// The rule hash.
        rule_hash: RuleHash,
        /// The creator it belongs to.
        creator_id: CreatorId,
        /// The validation module it names.
        module: Address,
    },
    /// A rule was paused.
    RulePaused {
        /// The rule hash.
        rule_hash: RuleHash,
    },
    /// A copy token was minted.
    CopyCreated {
        /// The new copy.
        id: CopyId,
        /// The rule it was minted under.
        rule_hash: RuleHash,
        /// Its first holder.
        recipient: Address,
        /// When it lapses.
        expiry: DateTime<Utc>,
    },
    /// A copy's expiry was extended.
    CopyExtended {
        /// The copy.
        id: CopyId,
        /// The new expiry.
        expiry: DateTime<Utc>,
    },
    /// A copy's content pointer changed.
    CopyUpdated {
        /// The copy.
        id: CopyId,
        /// The new pointer.
        content_pointer: String,
    },
    /// A copy was revoked by its creator side.
    CopyRevoked {
        /// The copy.
        id: CopyId,
    },
    /// A copy was destroyed by its holder.
    CopyDestroyed {
        /// The copy.
        id: CopyId,
    },
    /// A copy changed hands.
    CopyTransferred {
        /// The copy.
        id: CopyId,
        /// Previous holder.
        from: Address,
        /// New holder.
        to: Address,
    },
}

impl ReplicaEvent {
    /// Short machine-readable kind tag, used in the tracing emission.
    pub fn kind(&self) -> &'static str {
        match self {
            ReplicaEvent::CreatorCreated { .. } => "creator_created",
            ReplicaEvent::CreatorUpdated { .. } => "creator_updated",
            ReplicaEvent::CreatorBurned { .. } => "creator_burned",
            ReplicaEvent::RuleSet { .. } => "rule_set",
            ReplicaEvent::RulePaused { .. } => "rule_paused",
            ReplicaEvent::CopyCreated { .. } => "copy_created",
            ReplicaEvent::CopyExtended { .. } => "copy_extended",
            ReplicaEvent::CopyUpdated { .. } => "copy_updated",
            ReplicaEvent::CopyRevoked { .. } => "copy_revoked",
            ReplicaEvent::CopyDestroyed { .. } => "copy_destroyed",
            ReplicaEvent::CopyTransferred { .. } => "copy_transferred",
        }
    }
}

/// Append-only log of every event the hub has emitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ReplicaEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event and emits it through tracing.
    pub fn record(&mut self, event: ReplicaEvent) {
        tracing::info!(kind = event.kind(), event = ?event, "state transition");
        self.events.push(event);
    }

    /// Every event so far, in emission order.
    pub fn all(&self) -> &[ReplicaEvent] {
        &self.events
    }

    /// Number of events emitted.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
