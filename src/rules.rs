//! Scoring rule table
//!
//! Pure lookups from (statistic, role) to points for the ruleset the device
//! models. Values are a direct table, not a formula.

use crate::stats::StatSnapshot;

pub const APPEARANCE_POINTS: i32 = 1;
pub const SIXTY_MINUTES_POINTS: i32 = 1;
/// Minutes needed for the additional appearance point
pub const SIXTY_MINUTES: i32 = 60;
pub const ASSIST_POINTS: i32 = 3;
pub const PENALTY_SAVE_POINTS: i32 = 5;
pub const PENALTY_MISS_POINTS: i32 = -2;
pub const YELLOW_CARD_POINTS: i32 = -1;
pub const RED_CARD_POINTS: i32 = -3;
pub const OWN_GOAL_POINTS: i32 = -2;
/// Goals conceded per -1 point (goalkeepers and defenders only)
pub const GOALS_CONCEDED_STEP: i32 = 2;
pub const GOALS_CONCEDED_POINTS: i32 = -1;
/// Points per completed block of saves
pub const SAVE_POINTS: i32 = 1;
/// Points per completed block of defensive actions
pub const DEFENSIVE_CONTRIBUTION_POINTS: i32 = 2;

/// Player role (upstream `element_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
    #[default]
    Unknown,
}

impl Role {
    /// Convert from the upstream `element_type` id
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Role::Goalkeeper,
            2 => Role::Defender,
            3 => Role::Midfielder,
            4 => Role::Forward,
            _ => Role::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Role::Unknown)
    }

    pub fn is_goalkeeper(&self) -> bool {
        matches!(self, Role::Goalkeeper)
    }

    /// Short position label used on popups
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Goalkeeper => "GKP",
            Role::Defender => "DEF",
            Role::Midfielder => "MID",
            Role::Forward => "FWD",
            Role::Unknown => "?",
        }
    }

    /// Whether goals conceded cost this role points
    pub fn concedes(&self) -> bool {
        matches!(self, Role::Goalkeeper | Role::Defender)
    }
}

/// Points for one goal
pub fn goal_points(role: Role) -> i32 {
    match role {
        Role::Goalkeeper | Role::Defender => 6,
        Role::Midfielder => 5,
        Role::Forward => 4,
        Role::Unknown => 0,
    }
}

/// Points for one clean sheet
pub fn clean_sheet_points(role: Role) -> i32 {
    match role {
        Role::Goalkeeper | Role::Defender => 4,
        Role::Midfielder => 1,
        Role::Forward | Role::Unknown => 0,
    }
}

/// Defensive actions needed per award; 0 means the rule is inactive
pub fn defensive_contribution_threshold(role: Role) -> i32 {
    match role {
        Role::Defender => 10,
        Role::Midfielder | Role::Forward => 12,
        Role::Goalkeeper | Role::Unknown => 0,
    }
}

/// Saves needed per save point; 0 means the rule is inactive
pub fn saves_threshold(role: Role) -> i32 {
    match role {
        Role::Goalkeeper => 3,
        _ => 0,
    }
}

/// Number of completed blocks of `threshold` in `count`
pub fn chunks(count: i32, threshold: i32) -> i32 {
    if threshold <= 0 {
        return 0;
    }
    count.max(0) / threshold
}

/// Change in completed blocks between two cumulative counts
pub fn chunk_delta(prev: i32, curr: i32, threshold: i32) -> i32 {
    chunks(curr, threshold) - chunks(prev, threshold)
}

/// +1 when `curr` crosses `at` upwards, -1 when a correction drops it back
pub fn threshold_delta(prev: i32, curr: i32, at: i32) -> i32 {
    (curr >= at) as i32 - (prev >= at) as i32
}

/// Points the modelled ruleset awards for a snapshot, ignoring bonus.
///
/// Returns `None` when the role is unknown: the caller should fall back to
/// the reported total rather than risk double counting.
pub fn expected_points_excluding_bonus(stats: &StatSnapshot, role: Role) -> Option<i32> {
    if !role.is_known() {
        return None;
    }

    let mut pts = 0;
    if stats.minutes > 0 {
        pts += APPEARANCE_POINTS;
    }
    if stats.minutes >= SIXTY_MINUTES {
        pts += SIXTY_MINUTES_POINTS;
    }

    pts += goal_points(role) * stats.goals_scored;
    pts += ASSIST_POINTS * stats.assists;
    pts += clean_sheet_points(role) * stats.clean_sheets;
    pts += SAVE_POINTS * chunks(stats.saves, saves_threshold(role));
    pts += PENALTY_SAVE_POINTS * stats.penalties_saved;

    if role.concedes() {
        pts += GOALS_CONCEDED_POINTS * chunks(stats.goals_conceded, GOALS_CONCEDED_STEP);
    }

    pts += PENALTY_MISS_POINTS * stats.penalties_missed;
    pts += YELLOW_CARD_POINTS * stats.yellow_cards;
    pts += RED_CARD_POINTS * stats.red_cards;
    pts += OWN_GOAL_POINTS * stats.own_goals;
    pts += DEFENSIVE_CONTRIBUTION_POINTS
        * chunks(
            stats.defensive_contributions,
            defensive_contribution_threshold(role),
        );

    Some(pts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_u8() {
        assert_eq!(Role::from_u8(1), Role::Goalkeeper);
        assert_eq!(Role::from_u8(4), Role::Forward);
        assert_eq!(Role::from_u8(0), Role::Unknown);
        assert_eq!(Role::from_u8(5), Role::Unknown);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::from_u8(1).as_str(), "GKP");
        assert_eq!(Role::from_u8(4).as_str(), "FWD");
        assert_eq!(Role::from_u8(9).as_str(), "?");
    }

    #[test]
    fn test_goal_values_by_role() {
        assert_eq!(goal_points(Role::Goalkeeper), 6);
        assert_eq!(goal_points(Role::Defender), 6);
        assert_eq!(goal_points(Role::Midfielder), 5);
        assert_eq!(goal_points(Role::Forward), 4);
        assert_eq!(goal_points(Role::Unknown), 0);
    }

    #[test]
    fn test_chunk_delta() {
        assert_eq!(chunk_delta(2, 5, 3), 1);
        assert_eq!(chunk_delta(2, 8, 3), 2);
        assert_eq!(chunk_delta(9, 11, 10), 1);
        assert_eq!(chunk_delta(0, 50, 0), 0);
    }

    #[test]
    fn test_threshold_delta() {
        assert_eq!(threshold_delta(0, 75, 60), 1);
        assert_eq!(threshold_delta(61, 75, 60), 0);
        assert_eq!(threshold_delta(61, 59, 60), -1);
    }

    #[test]
    fn test_expected_points_defender_clean_sheet() {
        let stats = StatSnapshot {
            minutes: 90,
            clean_sheets: 1,
            defensive_contributions: 11,
            ..Default::default()
        };
        // 2 (minutes) + 4 (clean sheet) + 2 (defensive contribution)
        assert_eq!(expected_points_excluding_bonus(&stats, Role::Defender), Some(8));
    }

    #[test]
    fn test_expected_points_goalkeeper() {
        let stats = StatSnapshot {
            minutes: 90,
            goals_conceded: 3,
            saves: 7,
            penalties_saved: 1,
            yellow_cards: 1,
            ..Default::default()
        };
        // 2 + 2 (saves) + 5 (pen save) - 1 (conceded) - 1 (yellow)
        assert_eq!(expected_points_excluding_bonus(&stats, Role::Goalkeeper), Some(7));
    }

    #[test]
    fn test_expected_points_ignores_conceded_for_forwards() {
        let stats = StatSnapshot {
            minutes: 30,
            goals_scored: 1,
            goals_conceded: 4,
            ..Default::default()
        };
        assert_eq!(expected_points_excluding_bonus(&stats, Role::Forward), Some(5));
    }

    #[test]
    fn test_expected_points_unknown_role() {
        let stats = StatSnapshot {
            minutes: 90,
            ..Default::default()
        };
        assert_eq!(expected_points_excluding_bonus(&stats, Role::Unknown), None);
    }
}
