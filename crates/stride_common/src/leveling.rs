//! Leveling Math v0.4.0
//!
//! Deterministic, pure XP/level formulas:
//! - level = floor(total_xp / 100) + 1
//! - xp_to_next_level = max(0, level * 100 - total_xp)
//!
//! The derived fields are always recomputed from `total_xp`, never
//! incremented ad hoc, so concurrent or replayed grants cannot drift
//! the three fields apart.

use serde::{Deserialize, Serialize};

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 100;

/// Default XP granted for a newly completed lesson.
pub const XP_PER_LESSON: u32 = 10;

/// Level derived from total XP.
pub fn level_for_xp(total_xp: u64) -> u32 {
    (total_xp / XP_PER_LEVEL) as u32 + 1
}

/// XP remaining until the next level boundary.
pub fn xp_to_next_level(total_xp: u64) -> u64 {
    let level = level_for_xp(total_xp) as u64;
    (level * XP_PER_LEVEL).saturating_sub(total_xp)
}

/// A learner's XP state: the authoritative total plus derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerXp {
    /// Total XP accumulated (authoritative)
    pub total_xp: u64,
    /// Current level (derived)
    pub level: u32,
    /// XP remaining to the next level (derived)
    pub xp_to_next_level: u64,
}

impl LearnerXp {
    /// State for a learner who has never earned XP.
    pub fn new() -> Self {
        Self::from_xp(0)
    }

    /// Rebuild the full state from a total.
    pub fn from_xp(total_xp: u64) -> Self {
        Self {
            total_xp,
            level: level_for_xp(total_xp),
            xp_to_next_level: xp_to_next_level(total_xp),
        }
    }

    /// Apply a grant and recompute the derived fields.
    /// Returns true when the grant crossed a level boundary.
    pub fn grant(&mut self, amount: u32) -> bool {
        let old_level = self.level;
        *self = Self::from_xp(self.total_xp.saturating_add(amount as u64));
        self.level > old_level
    }
}

impl Default for LearnerXp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_table() {
        // (total_xp, level, xp_to_next)
        let table = [(0, 1, 100), (99, 1, 1), (100, 2, 100), (250, 3, 50)];
        for (xp, level, to_next) in table {
            assert_eq!(level_for_xp(xp), level, "level for {} XP", xp);
            assert_eq!(xp_to_next_level(xp), to_next, "to-next for {} XP", xp);
        }
    }

    #[test]
    fn test_grant_detects_level_up() {
        let mut xp = LearnerXp::from_xp(90);
        assert_eq!(xp.level, 1);
        assert!(xp.grant(10), "90 -> 100 crosses the boundary");
        assert_eq!(xp.level, 2);
        assert_eq!(xp.total_xp, 100);
        assert_eq!(xp.xp_to_next_level, 100);
    }

    #[test]
    fn test_grant_within_level() {
        let mut xp = LearnerXp::from_xp(10);
        assert!(!xp.grant(10));
        assert_eq!(xp.level, 1);
        assert_eq!(xp.xp_to_next_level, 80);
    }

    #[test]
    fn test_derived_fields_consistent_after_replay() {
        // Rebuilding from the same total always yields the same state.
        let a = LearnerXp::from_xp(250);
        let b = LearnerXp::from_xp(250);
        assert_eq!(a, b);
        assert_eq!(a.level, 3);
        assert_eq!(a.xp_to_next_level, 50);
    }
}
