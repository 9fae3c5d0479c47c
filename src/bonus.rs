//! Bonus point reconciliation
//!
//! Upstream publishes `bonus` before (sometimes hours before) folding it into
//! `total_points`. Rebuild the score with and without the bonus and see which
//! one the reported total matches.

use crate::rules::{self, Role};
use crate::stats::StatSnapshot;

/// What to do when the reported total sits exactly between both candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Treat the bonus as pending and add it (shows the final figure sooner)
    #[default]
    Project,
    /// Treat the bonus as already counted
    Include,
}

/// Outcome of [`resolve_bonus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BonusResolution {
    /// Best-known score for the player, bonus included exactly once
    pub effective_points: i32,
    /// The bonus was added on top of the reported total
    pub projected: bool,
    /// The reported total already contains the bonus
    pub already_included: bool,
}

impl BonusResolution {
    fn included(total: i32) -> Self {
        Self {
            effective_points: total,
            projected: false,
            already_included: true,
        }
    }

    fn projected(total: i32, bonus: i32) -> Self {
        Self {
            effective_points: total + bonus,
            projected: true,
            already_included: false,
        }
    }
}

/// Resolve bonus with the default tie policy
pub fn resolve_bonus(stats: &StatSnapshot, role: Role) -> BonusResolution {
    resolve_bonus_with(stats, role, TieBreak::default())
}

/// Resolve whether `stats.bonus` is already part of `stats.total_points`.
///
/// Stateless: the same snapshot always resolves the same way.
pub fn resolve_bonus_with(stats: &StatSnapshot, role: Role, tie: TieBreak) -> BonusResolution {
    let total = stats.total_points;
    if stats.bonus <= 0 {
        return BonusResolution::included(total);
    }

    // Unknown role: raw points beat a projection that may double count
    let Some(no_bonus) = rules::expected_points_excluding_bonus(stats, role) else {
        return BonusResolution::included(total);
    };

    let with_bonus = no_bonus + stats.bonus;
    if total == with_bonus {
        return BonusResolution::included(total);
    }
    if total == no_bonus {
        return BonusResolution::projected(total, stats.bonus);
    }

    let dist_no_bonus = (total - no_bonus).abs();
    let dist_with_bonus = (total - with_bonus).abs();
    let project = match dist_no_bonus.cmp(&dist_with_bonus) {
        core::cmp::Ordering::Less => true,
        core::cmp::Ordering::Greater => false,
        core::cmp::Ordering::Equal => tie == TieBreak::Project,
    };

    if project {
        BonusResolution::projected(total, stats.bonus)
    } else {
        BonusResolution::included(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defender_clean_sheet() -> StatSnapshot {
        // 2 (minutes) + 4 (clean sheet) = 6 before bonus
        StatSnapshot {
            minutes: 90,
            clean_sheets: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_bonus_returns_raw_total() {
        let stats = StatSnapshot {
            total_points: 13,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus(&stats, Role::Defender);
        assert_eq!(res.effective_points, 13);
        assert!(!res.projected);
        assert!(res.already_included);
    }

    #[test]
    fn test_bonus_already_folded_in() {
        let stats = StatSnapshot {
            bonus: 3,
            total_points: 9,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus(&stats, Role::Defender);
        assert_eq!(res.effective_points, 9);
        assert!(!res.projected);
        assert!(res.already_included);
    }

    #[test]
    fn test_bonus_pending_is_projected() {
        let stats = StatSnapshot {
            bonus: 3,
            total_points: 6,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus(&stats, Role::Defender);
        assert_eq!(res.effective_points, 9);
        assert!(res.projected);
        assert!(!res.already_included);
    }

    #[test]
    fn test_tie_favours_projection() {
        let stats = StatSnapshot {
            bonus: 2,
            total_points: 7,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus(&stats, Role::Defender);
        assert!(res.projected);
        assert_eq!(res.effective_points, 9);
    }

    #[test]
    fn test_tie_policy_can_be_flipped() {
        let stats = StatSnapshot {
            bonus: 2,
            total_points: 7,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus_with(&stats, Role::Defender, TieBreak::Include);
        assert!(!res.projected);
        assert!(res.already_included);
        assert_eq!(res.effective_points, 7);
    }

    #[test]
    fn test_nearest_candidate_wins() {
        // Total 10 is nearer with_bonus (8) than no_bonus (6)
        let stats = StatSnapshot {
            bonus: 2,
            total_points: 10,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus(&stats, Role::Defender);
        assert!(res.already_included);
        assert_eq!(res.effective_points, 10);
    }

    #[test]
    fn test_unknown_role_keeps_raw_total() {
        let stats = StatSnapshot {
            bonus: 3,
            total_points: 6,
            ..defender_clean_sheet()
        };
        let res = resolve_bonus(&stats, Role::Unknown);
        assert_eq!(res.effective_points, 6);
        assert!(!res.projected);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let stats = StatSnapshot {
            bonus: 1,
            total_points: 5,
            goals_conceded: 2,
            ..defender_clean_sheet()
        };
        let first = resolve_bonus(&stats, Role::Defender);
        let second = resolve_bonus(&stats, Role::Defender);
        assert_eq!(first, second);
    }
}
