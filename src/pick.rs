//! Squad picks for one gameweek
//!
//! A [`PickContext`] is fixed for the gameweek once the picks and player
//! metadata are known; a [`LivePick`] pairs it with the latest snapshot.

use core::fmt::Write as FmtWrite;

use heapless::{String, Vec};

use crate::rules::Role;
use crate::stats::StatSnapshot;

/// Maximum number of picks in a squad
pub const MAX_PICKS: usize = 15;

/// Maximum display name length (ASCII)
pub const MAX_NAME_LEN: usize = 24;

/// Squad positions above this are on the bench
pub const STARTING_SLOTS: u8 = 11;

/// Static per-player context for one gameweek
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PickContext {
    pub element_id: u32,
    /// Slot in the squad, 1-15
    pub squad_position: u8,
    /// 0 = not counting, 1 = playing, 2 = captain, 3 = triple captain
    pub multiplier: u8,
    pub is_captain: bool,
    pub is_vice_captain: bool,
    pub role: Role,
    pub team_id: u16,
    /// Team short name ("ARS")
    pub team: String<MAX_NAME_LEN>,
    /// Player display name, ASCII only; empty until metadata is known
    pub name: String<MAX_NAME_LEN>,
}

impl PickContext {
    pub fn new(element_id: u32, squad_position: u8, multiplier: u8) -> Self {
        Self {
            element_id,
            squad_position,
            multiplier,
            ..Default::default()
        }
    }

    pub fn is_bench(&self) -> bool {
        self.squad_position > STARTING_SLOTS
    }

    /// Name to show, falling back to "element <id>"
    pub fn display_name(&self) -> String<MAX_NAME_LEN> {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        let mut fallback = String::new();
        let _ = write!(fallback, "element {}", self.element_id);
        fallback
    }
}

/// The squad for one gameweek
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roster {
    pub gameweek: u16,
    pub picks: Vec<PickContext, MAX_PICKS>,
    /// Chip played this gameweek, if any ("3xc", "bboost", ...)
    pub active_chip: Option<String<16>>,
    /// Player metadata (names, roles, teams) was resolved
    pub has_player_meta: bool,
}

/// A pick together with its latest snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LivePick {
    pub context: PickContext,
    pub stats: StatSnapshot,
}

impl LivePick {
    pub fn new(context: PickContext, stats: StatSnapshot) -> Self {
        Self { context, stats }
    }
}

/// Everything one successful poll produced for the squad
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TeamSnapshot {
    pub gameweek: u16,
    pub overall_rank: Option<u32>,
    pub overall_points: Option<i32>,
    pub active_chip: Option<String<16>>,
    pub picks: Vec<LivePick, MAX_PICKS>,
}
