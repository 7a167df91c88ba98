//! Change detection over fingerprints.

use async_trait::async_trait;

use crate::error::DeployResult;
use crate::types::{ChangeSet, Inventory};

/// Classify every identity in `current` against the cached inventory.
///
/// An identity is stale when the cache is empty, when it is missing from
/// the cache, or when its fingerprint changed. Cached identities missing
/// from `current` are removed content and simply drop out.
pub fn detect(cached: &Inventory, current: &Inventory) -> ChangeSet {
    let mut changes = ChangeSet::default();

    if cached.is_empty() {
        changes.stale = current.identities().map(str::to_string).collect();
        return changes;
    }

    for record in current.records() {
        let unchanged = cached
            .get(&record.identity)
            .is_some_and(|previous| previous.fingerprint == record.fingerprint);
        if !unchanged {
            changes.stale.insert(record.identity.clone());
        }
    }

    changes
}

/// Decides which discovered entries need redeployment.
///
/// Implementations may look at content bytes; the orchestrator only consumes
/// the returned stale set.
#[async_trait]
pub trait Differ: Send + Sync {
    async fn difference(&self, cached: &Inventory, current: &Inventory) -> DeployResult<ChangeSet>;
}

/// Differ that compares fingerprints only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintDiffer;

#[async_trait]
impl Differ for FingerprintDiffer {
    async fn difference(&self, cached: &Inventory, current: &Inventory) -> DeployResult<ChangeSet> {
        Ok(detect(cached, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileRecord, Fingerprint};

    fn inv(entries: &[(&str, &str)]) -> Inventory {
        entries
            .iter()
            .map(|(id, fp)| FileRecord::new(*id, Fingerprint::new(*fp)))
            .collect()
    }

    #[test]
    fn empty_cache_marks_everything_stale() {
        let current = inv(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let changes = detect(&Inventory::new(), &current);
        let expected: Vec<&str> = current.identities().collect();
        assert_eq!(changes.stale.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn identical_inventories_have_nothing_stale() {
        let current = inv(&[("a", "1"), ("b", "2")]);
        assert!(detect(&current.clone(), &current).is_empty());
    }

    #[test]
    fn new_and_changed_entries_are_stale() {
        let cached = inv(&[("a", "1"), ("b", "2"), ("gone", "9")]);
        let current = inv(&[("a", "1"), ("b", "20"), ("c", "3")]);

        let changes = detect(&cached, &current);
        assert!(!changes.is_stale("a"));
        assert!(changes.is_stale("b"));
        assert!(changes.is_stale("c"));
        assert!(!changes.is_stale("gone"));
        assert!(changes.errors.is_empty());
    }

    #[test]
    fn detection_is_deterministic() {
        let cached = inv(&[("a", "1"), ("b", "2")]);
        let current = inv(&[("b", "3"), ("c", "4"), ("a", "1")]);
        assert_eq!(detect(&cached, &current).stale, detect(&cached, &current).stale);
    }

    #[tokio::test]
    async fn fingerprint_differ_delegates_to_detect() {
        let cached = inv(&[("a", "1")]);
        let current = inv(&[("a", "2")]);
        let changes = FingerprintDiffer.difference(&cached, &current).await.unwrap();
        assert!(changes.is_stale("a"));
    }
}
