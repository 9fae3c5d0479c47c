//! One polling cycle: fetch, reconcile, publish
//!
//! The cycle either assembles a complete [`TeamSnapshot`] or gives up; the
//! engine never sees a partial squad. Gameweek context and rank history are
//! nice-to-have and their failures only cost the UI a little detail.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;
use log::{debug, info, warn};

use crate::api::{ApiError, EntrySummary, GameweekState};
use crate::config::Config;
use crate::engine::{Engine, PassSummary, TRACKED_SLOTS};
use crate::pick::{LivePick, MAX_PICKS, Roster, TeamSnapshot};
use crate::shared::{SharedState, Status};
use crate::summary;

/// Errors from fetching upstream data
#[derive(Debug)]
pub enum FetchError {
    /// Connection, DNS or TLS failure
    Network,
    /// Non-success HTTP status
    Status(u16),
    Timeout,
    /// Body did not fit the receive buffer
    BodyTooLarge,
    Api(ApiError),
}

impl From<ApiError> for FetchError {
    fn from(e: ApiError) -> Self {
        FetchError::Api(e)
    }
}

impl FetchError {
    /// Short reads get one retry; everything else waits for the next cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Api(e) if e.is_transient())
    }
}

/// Where squad data comes from
#[allow(async_fn_in_trait)]
pub trait TeamSource {
    async fn fetch_entry(&mut self) -> Result<EntrySummary, FetchError>;

    async fn fetch_picks(&mut self, gameweek: u16) -> Result<Roster, FetchError>;

    /// Fill names, roles and teams into `roster`
    async fn fetch_player_meta(&mut self, roster: &mut Roster) -> Result<(), FetchError>;

    /// Latest snapshot for every pick, in roster order
    async fn fetch_live(&mut self, roster: &Roster) -> Result<Vec<LivePick, MAX_PICKS>, FetchError>;

    async fn fetch_gameweek_state(&mut self) -> Result<GameweekState, FetchError>;

    async fn fetch_previous_rank(&mut self, current_gameweek: u16) -> Result<Option<u32>, FetchError>;
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    pub gameweek: u16,
    pub gameweek_points: i32,
    /// The gameweek changed since the previous success
    pub rolled_over: bool,
    pub pass: PassSummary,
}

/// Owns the engine and whatever is worth keeping between cycles
pub struct Poller<const N: usize = TRACKED_SLOTS> {
    config: Config,
    engine: Engine<N>,
    /// Last roster with resolved metadata
    roster: Option<Roster>,
    last_gameweek: Option<u16>,
    last_success_ms: Option<u64>,
}

impl Poller {
    pub fn new(config: Config) -> Self {
        Self::with_engine(config, Engine::new())
    }
}

impl<const N: usize> Poller<N> {
    pub fn with_engine(config: Config, engine: Engine<N>) -> Self {
        Self {
            engine: engine.with_preference(config.mode_preference),
            config,
            roster: None,
            last_gameweek: None,
            last_success_ms: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Engine<N> {
        &self.engine
    }

    pub fn last_success_ms(&self) -> Option<u64> {
        self.last_success_ms
    }

    /// Run one cycle at monotonic time `now_ms`
    pub async fn poll<S: TeamSource, M: RawMutex>(
        &mut self,
        source: &mut S,
        shared: &SharedState<M>,
        now_ms: u64,
    ) -> Result<PollReport, FetchError> {
        shared.set_status(Status::Fetching).await;

        let gameweek_state = match source.fetch_gameweek_state().await {
            Ok(state) => {
                info!(
                    "GW state: live={} next={:?}",
                    if state.is_live { "yes" } else { "no" },
                    state.next
                );
                Some(state)
            }
            Err(e) => {
                warn!("Gameweek state unavailable: {:?}", e);
                None
            }
        };

        let snapshot = match self.fetch_snapshot(source).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("FPL fetch failed: {:?}", e);
                let stale_after_ms = self.config.stale_after_ms;
                shared
                    .update_ui(|ui| {
                        ui.status = Status::FetchFailed;
                        ui.refresh_staleness(now_ms, stale_after_ms);
                    })
                    .await;
                return Err(e);
            }
        };

        Ok(self.apply(source, shared, snapshot, gameweek_state, now_ms).await)
    }

    async fn fetch_snapshot<S: TeamSource>(&mut self, source: &mut S) -> Result<TeamSnapshot, FetchError> {
        let entry = source.fetch_entry().await?;
        let gameweek = entry.current_gameweek;

        let mut roster = source.fetch_picks(gameweek).await?;
        if !self.reuse_player_meta(&mut roster) {
            if let Err(e) = source.fetch_player_meta(&mut roster).await {
                warn!("Player metadata unavailable, showing ids: {:?}", e);
            }
        }

        let picks = source.fetch_live(&roster).await?;
        if roster.has_player_meta {
            self.roster = Some(roster.clone());
        }

        Ok(TeamSnapshot {
            gameweek,
            overall_rank: entry.overall_rank,
            overall_points: entry.overall_points,
            active_chip: roster.active_chip,
            picks,
        })
    }

    /// Copy metadata from the cached roster if it covers the same squad
    fn reuse_player_meta(&self, roster: &mut Roster) -> bool {
        let Some(cached) = &self.roster else {
            return false;
        };
        if cached.gameweek != roster.gameweek || !cached.has_player_meta {
            return false;
        }

        for pick in roster.picks.iter_mut() {
            let Some(known) = cached.picks.iter().find(|c| c.element_id == pick.element_id) else {
                return false;
            };
            pick.name = known.name.clone();
            pick.team = known.team.clone();
            pick.team_id = known.team_id;
            pick.role = known.role;
        }
        roster.has_player_meta = true;
        true
    }

    async fn apply<S: TeamSource, M: RawMutex>(
        &mut self,
        source: &mut S,
        shared: &SharedState<M>,
        snapshot: TeamSnapshot,
        gameweek_state: Option<GameweekState>,
        now_ms: u64,
    ) -> PollReport {
        let gameweek = snapshot.gameweek;
        let rolled_over = self.last_gameweek.is_some_and(|last| last != gameweek);
        if rolled_over {
            info!("Gameweek rolled over to GW{}, clearing events", gameweek);
            shared.clear_events().await;
        }

        let engine = &mut self.engine;
        let pass = shared
            .with_feed(|feed| engine.reconcile(gameweek, &snapshot.picks, feed))
            .await;

        let tie = self.config.tie_break;
        let gameweek_points = summary::gameweek_points(&snapshot.picks, tie);
        let rows = summary::squad_rows(&snapshot.picks, tie);
        for row in rows.iter() {
            debug!(
                "  {:<5} | {:<15} | {:<3} | pts:{:3} | {}",
                if row.is_bench { "BENCH" } else { "XI" },
                row.player,
                row.team,
                row.points,
                row.breakdown
            );
        }
        shared.replace_squad(rows).await;

        let rank_diff = match snapshot.overall_rank {
            Some(rank) => match source.fetch_previous_rank(gameweek).await {
                Ok(previous) => previous.map(|prev| i64::from(prev) - i64::from(rank)),
                Err(e) => {
                    warn!("Rank history unavailable: {:?}", e);
                    None
                }
            },
            None => None,
        };

        self.last_gameweek = Some(gameweek);
        self.last_success_ms = Some(now_ms);
        let stale_after_ms = self.config.stale_after_ms;

        shared
            .update_ui(|ui| {
                ui.status = Status::Updated;
                ui.gameweek = Some(gameweek);
                ui.gameweek_points = gameweek_points;
                ui.total_points = snapshot.overall_points;
                ui.overall_rank = snapshot.overall_rank;
                ui.rank_diff = rank_diff;
                if let Some(state) = gameweek_state {
                    ui.is_live = state.is_live;
                    ui.next_gameweek = state.next;
                    ui.next_deadline = state.next_deadline;
                }
                ui.last_success_ms = Some(now_ms);
                ui.refresh_staleness(now_ms, stale_after_ms);
            })
            .await;

        info!(
            "GW{} points: {} | events: {} | chip: {}",
            gameweek,
            gameweek_points,
            pass.events,
            snapshot.active_chip.as_deref().unwrap_or("none")
        );

        PollReport {
            gameweek,
            gameweek_points,
            rolled_over,
            pass,
        }
    }
}
