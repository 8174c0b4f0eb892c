// src/dedup.rs
//! Cross-shard identity tracking. Shard plans overlap by design, so the
//! same post routinely comes back from several shard queries; the tracker
//! keeps the first copy and drops the rest. Scoped to one pipeline run,
//! optionally seeded with keys delivered in earlier runs.

use crate::candidate::{CandidateItem, IdentityKey};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: HashSet<IdentityKey>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a caller-supplied historical set so previously delivered
    /// posts are never re-surfaced.
    pub fn seeded(seen: HashSet<IdentityKey>) -> Self {
        Self { seen }
    }

    /// Returns true if the item is novel (and remembers it). Items without
    /// an author have no identity key and are always novel.
    pub fn admit(&mut self, item: &CandidateItem) -> bool {
        match item.identity_key() {
            Some(key) => self.seen.insert(key),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Hand the accumulated keys back to the caller, e.g. to persist as the
    /// seed for the next run.
    pub fn into_seen(self) -> HashSet<IdentityKey> {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(author: Option<&str>, title: &str) -> CandidateItem {
        CandidateItem {
            id: "t3_a".into(),
            title: title.into(),
            body: "b".into(),
            url: "https://example.com".into(),
            popularity: 1,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            comment_count: 0,
            group: "g".into(),
            group_subscribers: 1_000,
            author: author.map(String::from),
            flair: None,
        }
    }

    #[test]
    fn duplicate_across_shards_is_dropped() {
        let mut tracker = DedupTracker::new();
        assert!(tracker.admit(&item(Some("alice"), "Best grinder")));
        assert!(!tracker.admit(&item(Some("alice"), "Best  Grinder")));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn different_author_same_title_is_novel() {
        let mut tracker = DedupTracker::new();
        assert!(tracker.admit(&item(Some("alice"), "Best grinder")));
        assert!(tracker.admit(&item(Some("bob"), "Best grinder")));
    }

    #[test]
    fn missing_author_never_deduplicates() {
        let mut tracker = DedupTracker::new();
        assert!(tracker.admit(&item(None, "Best grinder")));
        assert!(tracker.admit(&item(None, "Best grinder")));
        assert!(tracker.is_empty());
    }

    #[test]
    fn seed_set_blocks_previously_seen() {
        let key = item(Some("alice"), "Best grinder").identity_key().unwrap();
        let mut tracker = DedupTracker::seeded([key].into_iter().collect());
        assert!(!tracker.admit(&item(Some("alice"), "Best grinder")));
        assert!(tracker.admit(&item(Some("alice"), "Another question")));
    }
}
