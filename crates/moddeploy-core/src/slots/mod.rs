//! Patch slot lifecycle in the archive directory.
//!
//! Mod deployment owns two kinds of slots: patch files whose index falls in
//! a reserved range, and primary chunks numbered above the base game's
//! chunk count. Everything else belongs to the base installation or to
//! third parties and is never touched.

pub mod cleanup;
pub mod name;

use std::ops::RangeInclusive;

pub use cleanup::{CleanupReport, SlotManager};
pub use name::SlotName;

pub const DEFAULT_RESERVED_PATCH_MIN: u32 = 200;
pub const DEFAULT_RESERVED_PATCH_MAX: u32 = 300;
pub const DEFAULT_BASE_CHUNK_THRESHOLD: u32 = 30;

/// Which slots deployment may reclaim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPolicy {
    pub reserved_patches: RangeInclusive<u32>,
    /// Highest chunk index shipped by the base game.
    pub base_chunk_threshold: u32,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self {
            reserved_patches: DEFAULT_RESERVED_PATCH_MIN..=DEFAULT_RESERVED_PATCH_MAX,
            base_chunk_threshold: DEFAULT_BASE_CHUNK_THRESHOLD,
        }
    }
}

impl SlotPolicy {
    /// Whether a file name denotes a mod-managed slot.
    pub fn is_reclaimable(&self, file_name: &str) -> bool {
        if let Some(patch) = SlotName::parse_patch(file_name).and_then(|s| s.patch_index) {
            let (min, max) = self.reserved_patches.clone().into_inner();
            return (u64::from(min)..=u64::from(max)).contains(&patch);
        }
        SlotName::parse_chunk(file_name)
            .is_some_and(|chunk| chunk.chunk_index > u64::from(self.base_chunk_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_patch_range_is_inclusive() {
        let policy = SlotPolicy::default();
        assert!(policy.is_reclaimable("chunk0patch200.rpkg"));
        assert!(policy.is_reclaimable("chunk0patch250.rpkg"));
        assert!(policy.is_reclaimable("chunk0patch300.rpkg"));
        assert!(!policy.is_reclaimable("chunk0patch150.rpkg"));
        assert!(!policy.is_reclaimable("chunk0patch199.rpkg"));
        assert!(!policy.is_reclaimable("chunk0patch301.rpkg"));
        assert!(!policy.is_reclaimable("chunk0patch350.rpkg"));
    }

    #[test]
    fn patch_decision_uses_last_numeric_run() {
        let policy = SlotPolicy::default();
        assert!(policy.is_reclaimable("chunk0patch3_250.rpkg"));
        assert!(!policy.is_reclaimable("chunk0patch250_3.rpkg"));
    }

    #[test]
    fn chunks_above_threshold_are_reclaimable() {
        let policy = SlotPolicy {
            base_chunk_threshold: 30,
            ..SlotPolicy::default()
        };
        assert!(policy.is_reclaimable("chunk31.rpkg"));
        assert!(!policy.is_reclaimable("chunk30.rpkg"));
        assert!(!policy.is_reclaimable("chunk0.rpkg"));
    }

    #[test]
    fn high_chunk_patch_follows_patch_rule() {
        let policy = SlotPolicy::default();
        // The chunk index of a patch file plays no part in the decision.
        assert!(!policy.is_reclaimable("chunk40patch1.rpkg"));
    }

    #[test]
    fn oversized_chunk_index_is_reclaimable() {
        let policy = SlotPolicy::default();
        assert!(policy.is_reclaimable("chunk99999999999.rpkg"));
        assert!(policy.is_reclaimable("chunk99999999999999999999999.rpkg"));
        assert!(!policy.is_reclaimable("chunk0patch99999999999.rpkg"));
    }
}
