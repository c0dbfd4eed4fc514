//! Read-only pagination over hub indices, for external collaborators
//! that enumerate rules and copies without walking the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hub::ReplicaHub;
use crate::rules::{CopyId, RuleHash};

/// One page of results plus the totals a paginating client needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Total items in the underlying index.
    pub total: usize,
    /// The offset this page started at.
    pub offset: usize,
}

fn paginate<T: Clone>(index: &[T], offset: usize, limit: usize) -> Page<T> {
    let total = index.len();
    let start = offset.min(total);
    let end = start.saturating_add(limit).min(total);
    Page {
        items: index[start..end].to_vec(),
        total,
        offset,
    }
}

/// A page of the creator's rule hashes, in registration order.
pub fn rule_hashes_page(
    hub: &ReplicaHub,
    creator_id: &str,
    offset: usize,
    limit: usize,
) -> Page<RuleHash> {
    paginate(hub.rule_hashes_for_creator(creator_id), offset, limit)
}

/// A page of the creator's live copy ids. Order is not stable across
/// removals.
pub fn copies_page(
    hub: &ReplicaHub,
    creator_id: &str,
    offset: usize,
    limit: usize,
) -> Page<CopyId> {
    paginate(hub.copies_of_creator(creator_id), offset, limit)
}

/// How many of the creator's live copies are unexpired at `now`.
pub fn active_copy_count(hub: &ReplicaHub, creator_id: &str, now: DateTime<Utc>) -> usize {
    hub.copies_of_creator(creator_id)
        .iter()
        .filter(|id| hub.copy(id).is_some_and(|c| c.expiry >= now))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_to_bounds() {
        let index: Vec<String> = (0..5).map(|i| format!("item-{i}")).collect();

        let page = paginate(&index, 0, 2);
        assert_eq!(page.items, ["item-0", "item-1"]);
        assert_eq!(page.total, 5);

        let page = paginate(&index, 4, 10);
        assert_eq!(page.items, ["item-4"]);

        // Offset past the end yields an empty page, not a panic.
        let page = paginate(&index, 99, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn zero_limit_is_empty() {
        let index = vec!["a".to_string(), "b".to_string()];
        let page = paginate(&index, 0, 0);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
    }
}
