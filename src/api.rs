//! Decoders for the public fantasy API
//!
//! Endpoints (relative to `https://fantasy.premierleague.com/api/`):
//!
//! - `entry/{id}/`: current gameweek, overall rank and points
//! - `entry/{id}/event/{gw}/picks/`: the squad
//! - `bootstrap-static/`: player names, roles, teams and the gameweek list
//! - `entry/{id}/history/`: overall rank per finished gameweek
//! - `event/{gw}/live/`: cumulative stats for every player
//!
//! Documents are walked with [`crate::json`] and only the interesting values
//! are handed to `serde_json_core`.

use chrono::{DateTime, NaiveDateTime};
use heapless::{String, Vec};
use log::{debug, warn};
use serde::Deserialize;

use crate::json::{self, ScanError};
use crate::pick::{LivePick, MAX_NAME_LEN, MAX_PICKS, PickContext, Roster};
use crate::rules::Role;
use crate::stats::{Breakdown, StatSnapshot};
use crate::text;

/// API base URL
pub const BASE_URL: &str = "https://fantasy.premierleague.com/api/";

/// Teams in the league
const MAX_TEAMS: usize = 24;

/// Payload decode errors
#[derive(Debug)]
pub enum ApiError {
    Json(serde_json_core::de::Error),
    /// Body ended early (short read)
    Truncated,
    Malformed,
    /// A required field was absent
    Missing(&'static str),
    /// A squad player was absent from the live payload
    MissingElement(u32),
}

impl From<serde_json_core::de::Error> for ApiError {
    fn from(e: serde_json_core::de::Error) -> Self {
        ApiError::Json(e)
    }
}

impl From<ScanError> for ApiError {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::Truncated => ApiError::Truncated,
            ScanError::Malformed => ApiError::Malformed,
        }
    }
}

impl ApiError {
    /// Short or empty bodies are worth one retry
    pub fn is_transient(&self) -> bool {
        use serde_json_core::de::Error as J;
        matches!(
            self,
            ApiError::Truncated
                | ApiError::Json(
                    J::EofWhileParsingList
                        | J::EofWhileParsingObject
                        | J::EofWhileParsingString
                        | J::EofWhileParsingNumber
                        | J::EofWhileParsingValue
                )
        )
    }
}

fn decode<'a, T: Deserialize<'a>>(span: &'a [u8]) -> Result<T, ApiError> {
    let (value, _) = serde_json_core::from_slice(span)?;
    Ok(value)
}

/// Optional scalar field; absent and `null` both give `None`
fn scalar<'a, T: Deserialize<'a>>(obj: &'a [u8], key: &str) -> Result<Option<T>, ApiError> {
    match json::field(obj, key)? {
        Some(span) => decode::<Option<T>>(span),
        None => Ok(None),
    }
}

fn required<'a, T: Deserialize<'a>>(obj: &'a [u8], key: &'static str) -> Result<T, ApiError> {
    scalar(obj, key)?.ok_or(ApiError::Missing(key))
}

fn int_or_zero(obj: &[u8], key: &str) -> Result<i32, ApiError> {
    Ok(scalar(obj, key)?.unwrap_or(0))
}

/// Optional string field, unescaped into `N` bytes
fn text_field<const N: usize>(obj: &[u8], key: &str) -> Result<Option<String<N>>, ApiError> {
    match json::field(obj, key)? {
        Some(span) if span.first() == Some(&b'"') => Ok(Some(json::unescape(span)?)),
        _ => Ok(None),
    }
}

fn array<'a>(doc: &'a [u8], key: &'static str) -> Result<json::Items<'a>, ApiError> {
    let span = json::field(doc, key)?.ok_or(ApiError::Missing(key))?;
    Ok(json::items(span))
}

/// `entry/{id}/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySummary {
    pub current_gameweek: u16,
    pub overall_rank: Option<u32>,
    pub overall_points: Option<i32>,
}

pub fn parse_entry_summary(doc: &[u8]) -> Result<EntrySummary, ApiError> {
    let current_gameweek = required(doc, "current_event")?;
    let overall_rank = scalar::<u32>(doc, "summary_overall_rank")?.filter(|r| *r > 0);
    let overall_points = scalar(doc, "summary_overall_points")?;

    Ok(EntrySummary {
        current_gameweek,
        overall_rank,
        overall_points,
    })
}

#[derive(Deserialize)]
struct PickDoc {
    element: u32,
    position: u8,
    multiplier: u8,
    #[serde(default)]
    is_captain: bool,
    #[serde(default)]
    is_vice_captain: bool,
}

/// `entry/{id}/event/{gw}/picks/`. Squads above [`MAX_PICKS`] are cut.
pub fn parse_picks(doc: &[u8], gameweek: u16) -> Result<Roster, ApiError> {
    let mut roster = Roster {
        gameweek,
        active_chip: text_field(doc, "active_chip")?,
        ..Default::default()
    };

    for item in array(doc, "picks")? {
        let pick: PickDoc = decode(item?)?;
        let mut context = PickContext::new(pick.element, pick.position, pick.multiplier);
        context.is_captain = pick.is_captain;
        context.is_vice_captain = pick.is_vice_captain;
        if roster.picks.push(context).is_err() {
            warn!("More than {} picks, ignoring the rest", MAX_PICKS);
            break;
        }
    }

    if roster.picks.is_empty() {
        return Err(ApiError::Missing("picks"));
    }
    Ok(roster)
}

/// Fill names, roles and teams into `roster` from `bootstrap-static/`.
/// `roster` is only written if the whole document decodes.
pub fn parse_player_meta(doc: &[u8], roster: &mut Roster) -> Result<(), ApiError> {
    let mut updated = roster.clone();
    fill_player_meta(doc, &mut updated)?;
    *roster = updated;
    Ok(())
}

fn fill_player_meta(doc: &[u8], roster: &mut Roster) -> Result<(), ApiError> {
    let mut teams: Vec<(u16, String<MAX_NAME_LEN>), MAX_TEAMS> = Vec::new();
    for item in array(doc, "teams")? {
        let item = item?;
        let id: u16 = required(item, "id")?;
        let short: String<16> = text_field(item, "short_name")?.unwrap_or_default();
        if teams.push((id, text::to_ascii(&short))).is_err() {
            break;
        }
    }

    let mut resolved = 0;
    for item in array(doc, "elements")? {
        let item = item?;
        let id: u32 = required(item, "id")?;
        let Some(pick) = roster.picks.iter_mut().find(|p| p.element_id == id) else {
            continue;
        };

        let web_name: String<64> = text_field(item, "web_name")?.unwrap_or_default();
        pick.name = text::to_ascii(&web_name);
        pick.role = Role::from_u8(scalar(item, "element_type")?.unwrap_or(0));
        pick.team_id = scalar(item, "team")?.unwrap_or(0);
        if let Some((_, short)) = teams.iter().find(|(id, _)| *id == pick.team_id) {
            pick.team = short.clone();
        }

        resolved += 1;
        if resolved == roster.picks.len() {
            break;
        }
    }

    if resolved < roster.picks.len() {
        warn!(
            "Metadata for {} of {} picks only",
            resolved,
            roster.picks.len()
        );
    }
    roster.has_player_meta = true;
    Ok(())
}

/// Where the season is, from the `events` list in `bootstrap-static/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameweekState {
    pub current: Option<u16>,
    /// Current gameweek exists and is not finished
    pub is_live: bool,
    pub next: Option<u16>,
    /// Next deadline, Unix seconds UTC
    pub next_deadline: Option<i64>,
}

pub fn parse_gameweek_state(doc: &[u8]) -> Result<GameweekState, ApiError> {
    let mut state = GameweekState::default();
    let mut current_finished = false;

    for item in array(doc, "events")? {
        let item = item?;
        let id: u16 = scalar(item, "id")?.unwrap_or(0);

        if scalar(item, "is_current")?.unwrap_or(false) {
            state.current = Some(id);
            current_finished = scalar(item, "finished")?.unwrap_or(false);
        }
        if scalar(item, "is_next")?.unwrap_or(false) {
            state.next = Some(id);
            let iso: Option<String<40>> = text_field(item, "deadline_time")?;
            state.next_deadline = iso.as_deref().and_then(parse_iso_utc);
            if state.next_deadline.is_none() {
                let epoch: i64 = scalar(item, "deadline_time_epoch")?.unwrap_or(0);
                if epoch > 0 {
                    debug!("Using deadline_time_epoch for GW{}", id);
                    state.next_deadline = Some(epoch);
                } else {
                    warn!("No usable deadline for GW{}", id);
                }
            }
        }
    }

    if state.current.is_none() && state.next.is_none() {
        return Err(ApiError::Missing("events"));
    }
    state.is_live = state.current.is_some() && !current_finished;
    Ok(state)
}

/// Overall rank after the previous gameweek, from `entry/{id}/history/`.
///
/// Exactly `current - 1` when present, else the latest earlier gameweek
/// with a rank.
pub fn parse_previous_rank(doc: &[u8], current_gameweek: u16) -> Result<Option<u32>, ApiError> {
    let target = current_gameweek.saturating_sub(1);
    let mut best: Option<(u16, u32)> = None;

    for item in array(doc, "current")? {
        let item = item?;
        let event: u16 = scalar(item, "event")?.unwrap_or(0);
        let rank: u32 = scalar(item, "overall_rank")?.unwrap_or(0);
        if rank == 0 {
            continue;
        }
        if target > 0 && event == target {
            return Ok(Some(rank));
        }
        if event < current_gameweek && best.is_none_or(|(e, _)| event > e) {
            best = Some((event, rank));
        }
    }

    Ok(best.filter(|(event, _)| *event > 0).map(|(_, rank)| rank))
}

#[derive(Deserialize)]
struct ExplainStat<'a> {
    identifier: &'a str,
    points: i32,
}

/// Fold an `explain` array into a [`Breakdown`]. Accepts both
/// `[{fixture, stats: [..]}]` and `[[..]]`.
pub fn parse_explain(span: &[u8]) -> Result<Breakdown, ApiError> {
    let mut breakdown = Breakdown::new();
    for fixture in json::items(span) {
        let fixture = fixture?;
        let stats = match fixture.first() {
            Some(b'{') => match json::field(fixture, "stats")? {
                Some(stats) => stats,
                None => continue,
            },
            Some(b'[') => fixture,
            _ => return Err(ApiError::Malformed),
        };
        for stat in json::items(stats) {
            let stat: ExplainStat = decode(stat?)?;
            breakdown.add_identifier(stat.identifier, stat.points);
        }
    }
    Ok(breakdown)
}

/// Decode one `stats` object of the live payload
pub fn parse_stats(stats: &[u8]) -> Result<StatSnapshot, ApiError> {
    let mut snapshot = StatSnapshot {
        minutes: int_or_zero(stats, "minutes")?,
        goals_scored: int_or_zero(stats, "goals_scored")?,
        assists: int_or_zero(stats, "assists")?,
        clean_sheets: int_or_zero(stats, "clean_sheets")?,
        goals_conceded: int_or_zero(stats, "goals_conceded")?,
        own_goals: int_or_zero(stats, "own_goals")?,
        penalties_saved: int_or_zero(stats, "penalties_saved")?,
        penalties_missed: int_or_zero(stats, "penalties_missed")?,
        yellow_cards: int_or_zero(stats, "yellow_cards")?,
        red_cards: int_or_zero(stats, "red_cards")?,
        saves: int_or_zero(stats, "saves")?,
        bonus: int_or_zero(stats, "bonus")?,
        defensive_contributions: int_or_zero(stats, "defensive_contributions")?,
        total_points: int_or_zero(stats, "total_points")?,
        breakdown: None,
    };
    if snapshot.defensive_contributions == 0 {
        snapshot.defensive_contributions = int_or_zero(stats, "defensive_contribution")?;
    }
    Ok(snapshot)
}

/// `event/{gw}/live/`, restricted to the squad and returned in roster
/// order. Fails if any squad player is missing so a partial squad never
/// reaches the engine.
pub fn parse_live(doc: &[u8], roster: &Roster) -> Result<Vec<LivePick, MAX_PICKS>, ApiError> {
    let mut found: [Option<StatSnapshot>; MAX_PICKS] = [None; MAX_PICKS];
    let mut remaining = roster.picks.len();

    for item in array(doc, "elements")? {
        let item = item?;
        let id: u32 = required(item, "id")?;
        let Some(idx) = roster.picks.iter().position(|p| p.element_id == id) else {
            continue;
        };
        if found[idx].is_some() {
            continue;
        }

        let stats = json::field(item, "stats")?.ok_or(ApiError::Missing("stats"))?;
        let mut snapshot = parse_stats(stats)?;
        if let Some(explain) = json::field(item, "explain")? {
            snapshot.breakdown = Some(parse_explain(explain)?);
        }
        found[idx] = Some(snapshot);

        remaining -= 1;
        if remaining == 0 {
            break;
        }
    }

    let mut picks = Vec::new();
    for (context, snapshot) in roster.picks.iter().zip(found) {
        let stats = snapshot.ok_or(ApiError::MissingElement(context.element_id))?;
        let _ = picks.push(LivePick::new(context.clone(), stats));
    }
    Ok(picks)
}

/// Parse an ISO-8601 deadline into Unix seconds. RFC 3339 first, then the
/// colon-less `±HHMM` offset, then no zone at all (taken as UTC).
pub fn parse_iso_utc(iso: &str) -> Option<i64> {
    let iso = iso.trim();
    DateTime::parse_from_rfc3339(iso)
        .or_else(|_| DateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.timestamp())
        .or_else(|_| {
            NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc().timestamp())
        })
        .ok()
}
