//! Scoring events emitted by the reconciliation engine

use heapless::{String, Vec};

use crate::pick::{MAX_NAME_LEN, PickContext};
use crate::rules::Role;
use crate::stats::Category;

/// Which scoring rule an event is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Appearance,
    SixtyMinutes,
    Goal,
    Assist,
    CleanSheet,
    SaveBonus,
    PenaltySave,
    DefensiveContribution,
    Bonus,
    GoalsConceded,
    PenaltyMiss,
    YellowCard,
    RedCard,
    OwnGoal,
    Other,
}

impl EventKind {
    /// Event kind for a breakdown category. Minutes map to the 60+ label;
    /// the appearance point is split out by the engine.
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Minutes => EventKind::SixtyMinutes,
            Category::Goals => EventKind::Goal,
            Category::Assists => EventKind::Assist,
            Category::CleanSheet => EventKind::CleanSheet,
            Category::Saves => EventKind::SaveBonus,
            Category::PenaltySaved => EventKind::PenaltySave,
            Category::DefensiveContribution => EventKind::DefensiveContribution,
            Category::Bonus => EventKind::Bonus,
            Category::GoalsConceded => EventKind::GoalsConceded,
            Category::PenaltyMissed => EventKind::PenaltyMiss,
            Category::Yellow => EventKind::YellowCard,
            Category::Red => EventKind::RedCard,
            Category::OwnGoal => EventKind::OwnGoal,
            Category::Other => EventKind::Other,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            EventKind::Appearance | EventKind::SixtyMinutes => Category::Minutes,
            EventKind::Goal => Category::Goals,
            EventKind::Assist => Category::Assists,
            EventKind::CleanSheet => Category::CleanSheet,
            EventKind::SaveBonus => Category::Saves,
            EventKind::PenaltySave => Category::PenaltySaved,
            EventKind::DefensiveContribution => Category::DefensiveContribution,
            EventKind::Bonus => Category::Bonus,
            EventKind::GoalsConceded => Category::GoalsConceded,
            EventKind::PenaltyMiss => Category::PenaltyMissed,
            EventKind::YellowCard => Category::Yellow,
            EventKind::RedCard => Category::Red,
            EventKind::OwnGoal => Category::OwnGoal,
            EventKind::Other => Category::Other,
        }
    }

    /// Lower-case cause, as used in breakdown lines and the ticker
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Appearance => "appearance",
            EventKind::SixtyMinutes => "60+ mins",
            EventKind::Goal => "goals",
            EventKind::Assist => "assists",
            EventKind::CleanSheet => "clean sheet",
            EventKind::SaveBonus => "saves",
            EventKind::PenaltySave => "pen save",
            EventKind::DefensiveContribution => "defensive contrib",
            EventKind::Bonus => "bonus",
            EventKind::GoalsConceded => "goals conceded",
            EventKind::PenaltyMiss => "pen miss",
            EventKind::YellowCard => "yellow card",
            EventKind::RedCard => "red card",
            EventKind::OwnGoal => "own goal",
            EventKind::Other => "other scoring rule",
        }
    }

    /// Popup headline
    pub fn headline(&self) -> &'static str {
        match self {
            EventKind::Appearance => "PLAYING!",
            EventKind::SixtyMinutes => "60+ MINS!",
            EventKind::Goal => "GOAL!",
            EventKind::Assist => "ASSIST!",
            EventKind::CleanSheet => "CLEAN SHEET!",
            EventKind::SaveBonus => "SAVE BONUS!",
            EventKind::PenaltySave => "PEN SAVE!",
            EventKind::DefensiveContribution => "DEF CON!",
            EventKind::Bonus => "BONUS PTS!",
            EventKind::GoalsConceded => "GOALS AGAINST",
            EventKind::PenaltyMiss => "PEN MISS!",
            EventKind::YellowCard => "YELLOW!",
            EventKind::RedCard => "RED!",
            EventKind::OwnGoal => "OWN GOAL!",
            EventKind::Other => "POINTS UPDATE",
        }
    }

    /// Short badge for the ticker
    pub fn icon(&self, delta: i32) -> &'static str {
        match self {
            EventKind::Goal => "G",
            EventKind::Assist => "A",
            EventKind::CleanSheet => "CS",
            EventKind::SaveBonus | EventKind::PenaltySave => "SV",
            EventKind::YellowCard => "YC",
            EventKind::RedCard => "RC",
            _ if delta >= 0 => "+",
            _ => "-",
        }
    }
}

/// One explained change in a player's score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringEvent {
    pub element_id: u32,
    pub player: String<MAX_NAME_LEN>,
    pub team: String<MAX_NAME_LEN>,
    pub role: Role,
    pub kind: EventKind,
    pub delta: i32,
    pub total_before: i32,
    /// The authoritative total of the snapshot that produced the event
    pub total_after: i32,
}

impl ScoringEvent {
    pub fn new(pick: &PickContext, kind: EventKind, delta: i32, total_after: i32) -> Self {
        Self {
            element_id: pick.element_id,
            player: pick.display_name(),
            team: pick.team.clone(),
            role: pick.role,
            kind,
            delta,
            total_before: total_after - delta,
            total_after,
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn icon(&self) -> &'static str {
        self.kind.icon(self.delta)
    }
}

/// Consumer of the engine's ordered event stream
pub trait EventSink {
    /// Accept one event. Returns `false` if the sink had to drop it.
    fn publish(&mut self, event: ScoringEvent) -> bool;
}

impl<const N: usize> EventSink for Vec<ScoringEvent, N> {
    fn publish(&mut self, event: ScoringEvent) -> bool {
        self.push(event).is_ok()
    }
}
