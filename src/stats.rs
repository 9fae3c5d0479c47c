//! Per-player statistic snapshots
//!
//! A snapshot is one poll's cumulative view of a player's gameweek: raw
//! counters as reported by the live endpoint, the authoritative running total,
//! and (when the endpoint explains itself) the points attributed to each
//! scoring category.

/// Number of scoring categories carried by a [`Breakdown`]
pub const CATEGORY_COUNT: usize = 14;

/// Scoring category, declared in ticker emission order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Category {
    Minutes = 0,
    Goals,
    Assists,
    CleanSheet,
    Saves,
    PenaltySaved,
    DefensiveContribution,
    Bonus,
    GoalsConceded,
    PenaltyMissed,
    Yellow,
    Red,
    OwnGoal,
    Other,
}

impl Category {
    /// All categories in emission order
    pub const ALL: [Category; CATEGORY_COUNT] = [
        Category::Minutes,
        Category::Goals,
        Category::Assists,
        Category::CleanSheet,
        Category::Saves,
        Category::PenaltySaved,
        Category::DefensiveContribution,
        Category::Bonus,
        Category::GoalsConceded,
        Category::PenaltyMissed,
        Category::Yellow,
        Category::Red,
        Category::OwnGoal,
        Category::Other,
    ];

    /// Position of this category inside a breakdown
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Map an upstream `explain` identifier to a category.
    /// Unrecognised identifiers land in [`Category::Other`].
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            "minutes" => Category::Minutes,
            "goals_scored" => Category::Goals,
            "assists" => Category::Assists,
            "clean_sheets" => Category::CleanSheet,
            "goals_conceded" => Category::GoalsConceded,
            "own_goals" => Category::OwnGoal,
            "penalties_saved" => Category::PenaltySaved,
            "penalties_missed" => Category::PenaltyMissed,
            "yellow_cards" => Category::Yellow,
            "red_cards" => Category::Red,
            "saves" => Category::Saves,
            "bonus" => Category::Bonus,
            "defensive_contribution" | "defensive_contributions" => {
                Category::DefensiveContribution
            }
            _ => Category::Other,
        }
    }
}

/// Points attributed per category by the upstream `explain` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Breakdown {
    points: [i32; CATEGORY_COUNT],
}

impl Breakdown {
    pub const fn new() -> Self {
        Self {
            points: [0; CATEGORY_COUNT],
        }
    }

    pub fn get(&self, category: Category) -> i32 {
        self.points[category.index()]
    }

    pub fn set(&mut self, category: Category, points: i32) {
        self.points[category.index()] = points;
    }

    /// Accumulate points into a category (one player can have several
    /// fixtures in a double gameweek)
    pub fn add(&mut self, category: Category, points: i32) {
        self.points[category.index()] += points;
    }

    /// Accumulate points reported under an upstream identifier
    pub fn add_identifier(&mut self, identifier: &str, points: i32) {
        self.add(Category::from_identifier(identifier), points);
    }

    /// Sum over every category
    pub fn total(&self) -> i32 {
        self.points.iter().sum()
    }
}

/// One player's cumulative statistics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatSnapshot {
    pub minutes: i32,
    pub goals_scored: i32,
    pub assists: i32,
    pub clean_sheets: i32,
    pub goals_conceded: i32,
    pub own_goals: i32,
    pub penalties_saved: i32,
    pub penalties_missed: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub saves: i32,
    pub bonus: i32,
    pub defensive_contributions: i32,
    /// Authoritative running score as reported upstream
    pub total_points: i32,
    /// Server-side attribution, when the payload carried one
    pub breakdown: Option<Breakdown>,
}

impl StatSnapshot {
    pub fn has_played(&self) -> bool {
        self.minutes > 0
    }

    pub fn with_breakdown(mut self, breakdown: Breakdown) -> Self {
        self.breakdown = Some(breakdown);
        self
    }
}
