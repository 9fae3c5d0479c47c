//! Gameweek points and squad rows for the UI
//!
//! Recomputed from scratch on every poll, independent of the event stream.

use core::fmt::Write as FmtWrite;

use heapless::{String, Vec};

use crate::bonus::{BonusResolution, TieBreak, resolve_bonus_with};
use crate::engine::attribute_from_counters;
use crate::event::EventKind;
use crate::pick::{LivePick, MAX_NAME_LEN, MAX_PICKS};
use crate::stats::StatSnapshot;

/// Capacity of a breakdown line
pub const BREAKDOWN_LEN: usize = 128;

/// One squad member as shown on the squad screen
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SquadRow {
    pub element_id: u32,
    pub player: String<MAX_NAME_LEN>,
    pub team: String<MAX_NAME_LEN>,
    /// Effective points times the pick multiplier
    pub points: i32,
    pub has_played: bool,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    pub is_bench: bool,
    pub is_goalkeeper: bool,
    pub bonus_projected: bool,
    pub breakdown: String<BREAKDOWN_LEN>,
}

/// Bonus-resolved points for one pick, before the multiplier
pub fn effective_points(pick: &LivePick, tie: TieBreak) -> BonusResolution {
    resolve_bonus_with(&pick.stats, pick.context.role, tie)
}

/// Squad total for the gameweek
pub fn gameweek_points(picks: &[LivePick], tie: TieBreak) -> i32 {
    picks
        .iter()
        .map(|p| effective_points(p, tie).effective_points * i32::from(p.context.multiplier))
        .sum()
}

fn append_part(line: &mut String<BREAKDOWN_LEN>, first: &mut bool, pts: i32, label: &str) {
    if pts == 0 {
        return;
    }
    let unit = if pts.abs() == 1 { "pt" } else { "pts" };
    let mut part: String<48> = String::new();
    let sep = if *first { "" } else { "; " };
    if write!(part, "{sep}{pts} {unit} - {label}").is_ok() {
        // Overflow truncates the line at a part boundary
        let _ = line.push_str(&part);
    }
    *first = false;
}

/// Human readable account of a pick's points, e.g.
/// `1 pt - appearance; 6 pts - goals; 2 pts - bonus (projected)`
pub fn breakdown_line(pick: &LivePick, resolution: &BonusResolution) -> String<BREAKDOWN_LEN> {
    let mut line = String::new();
    let mut first = true;
    let mut explained = 0;

    let parts = attribute_from_counters(pick.context.role, &StatSnapshot::default(), &pick.stats);
    for (kind, pts) in parts {
        let label = match kind {
            EventKind::Bonus if resolution.projected => "bonus (projected)",
            other => other.label(),
        };
        append_part(&mut line, &mut first, pts, label);
        explained += pts;
    }

    if first {
        line.clear();
        let _ = line.push_str("0 pts - no returns yet");
        return line;
    }

    let unattributed = resolution.effective_points - explained;
    append_part(&mut line, &mut first, unattributed, "other/live adjustments");
    line
}

/// Rows for the squad screen, in roster order
pub fn squad_rows(picks: &[LivePick], tie: TieBreak) -> Vec<SquadRow, MAX_PICKS> {
    picks
        .iter()
        .take(MAX_PICKS)
        .map(|pick| {
            let resolution = effective_points(pick, tie);
            let ctx = &pick.context;
            SquadRow {
                element_id: ctx.element_id,
                player: ctx.display_name(),
                team: ctx.team.clone(),
                points: resolution.effective_points * i32::from(ctx.multiplier),
                has_played: pick.stats.has_played(),
                is_captain: ctx.is_captain,
                is_vice_captain: ctx.is_vice_captain,
                is_bench: ctx.is_bench(),
                is_goalkeeper: ctx.role.is_goalkeeper(),
                bonus_projected: resolution.projected,
                breakdown: breakdown_line(pick, &resolution),
            }
        })
        .collect()
}
