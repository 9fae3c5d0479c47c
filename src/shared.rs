//! State shared between the polling task and the render task
//!
//! The polling task is the only writer and awaits the locks. The render task
//! runs on a short tick and must never stall, so every read is a `try_*`
//! copy-out that simply returns `None` when the lock is busy; it retries on
//! the next tick.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use heapless::{Deque, Vec};
use log::debug;

use crate::event::{EventSink, ScoringEvent};
use crate::pick::MAX_PICKS;
use crate::summary::SquadRow;

/// Events kept for the history screen (oldest dropped)
pub const MAX_RECENT_EVENTS: usize = 24;
/// Pending popups (new events dropped when full)
pub const MAX_POPUPS: usize = 8;

/// Wall-clock values at or below this mean the clock was never set
const CLOCK_UNSET_EPOCH: i64 = 100_000;
const FINAL_HOUR_SECS: i64 = 3600;
const DEADLINE_WINDOW_SECS: i64 = 6 * 3600;

/// Connection and fetch status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Booting,
    ConnectingWifi,
    WifiConnected,
    WifiDown,
    Fetching,
    Updated,
    FetchFailed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Booting => "Booting...",
            Status::ConnectingWifi => "Connecting WiFi...",
            Status::WifiConnected => "WiFi connected",
            Status::WifiDown => "WiFi not connected",
            Status::Fetching => "Fetching FPL points...",
            Status::Updated => "FPL updated",
            Status::FetchFailed => "FPL fetch failed",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::WifiDown | Status::FetchFailed)
    }
}

/// Which screen the UI should show on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenMode {
    Idle,
    /// Deadline within six hours
    Deadline,
    /// Deadline within the hour
    FinalHour,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankTrend {
    Up,
    Down,
    Same,
}

impl RankTrend {
    pub fn arrow(&self) -> &'static str {
        match self {
            RankTrend::Up => "^",
            RankTrend::Down => "v",
            RankTrend::Same => "-",
        }
    }
}

/// Headline numbers and context for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub status: Status,
    pub gameweek: Option<u16>,
    pub gameweek_points: i32,
    pub total_points: Option<i32>,
    pub overall_rank: Option<u32>,
    /// Previous rank minus current rank; positive means climbing
    pub rank_diff: Option<i64>,
    pub is_live: bool,
    pub next_gameweek: Option<u16>,
    /// Unix seconds UTC
    pub next_deadline: Option<i64>,
    /// Monotonic milliseconds of the last successful poll
    pub last_success_ms: Option<u64>,
    pub stale: bool,
    /// Bumped on every write
    pub version: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub const fn new() -> Self {
        Self {
            status: Status::Booting,
            gameweek: None,
            gameweek_points: 0,
            total_points: None,
            overall_rank: None,
            rank_diff: None,
            is_live: false,
            next_gameweek: None,
            next_deadline: None,
            last_success_ms: None,
            stale: true,
            version: 0,
        }
    }

    pub fn rank_trend(&self) -> Option<RankTrend> {
        self.rank_diff.map(|diff| match diff {
            d if d > 0 => RankTrend::Up,
            d if d < 0 => RankTrend::Down,
            _ => RankTrend::Same,
        })
    }

    /// Stale when no poll ever succeeded or the last one is too old
    pub fn refresh_staleness(&mut self, now_ms: u64, stale_after_ms: u64) {
        self.stale = self
            .last_success_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > stale_after_ms);
    }

    /// Screen to show given the wall clock (`None` if not yet synced)
    pub fn screen_mode(&self, now_epoch: Option<i64>) -> ScreenMode {
        if self.is_live {
            return ScreenMode::Live;
        }
        let Some(deadline) = self.next_deadline.filter(|d| *d > 0) else {
            return ScreenMode::Idle;
        };
        let Some(now) = now_epoch.filter(|n| *n > CLOCK_UNSET_EPOCH) else {
            return ScreenMode::Idle;
        };

        let remaining = deadline - now;
        if remaining <= FINAL_HOUR_SECS {
            ScreenMode::FinalHour
        } else if remaining <= DEADLINE_WINDOW_SECS {
            ScreenMode::Deadline
        } else {
            ScreenMode::Idle
        }
    }
}

/// Event history, popup queue and squad rows
#[derive(Debug, Clone, Default)]
pub struct EventFeed {
    recent: Deque<ScoringEvent, MAX_RECENT_EVENTS>,
    popups: Deque<ScoringEvent, MAX_POPUPS>,
    squad: Vec<SquadRow, MAX_PICKS>,
    pub event_version: u32,
    pub squad_version: u32,
}

impl EventFeed {
    pub const fn new() -> Self {
        Self {
            recent: Deque::new(),
            popups: Deque::new(),
            squad: Vec::new(),
            event_version: 0,
            squad_version: 0,
        }
    }

    /// Oldest first
    pub fn recent(&self) -> impl Iterator<Item = &ScoringEvent> {
        self.recent.iter()
    }

    pub fn pending_popups(&self) -> usize {
        self.popups.len()
    }

    pub fn pop_popup(&mut self) -> Option<ScoringEvent> {
        self.popups.pop_front()
    }

    pub fn squad(&self) -> &[SquadRow] {
        &self.squad
    }

    pub fn replace_squad(&mut self, rows: Vec<SquadRow, MAX_PICKS>) {
        self.squad = rows;
        self.squad_version = self.squad_version.wrapping_add(1);
    }

    pub fn clear_events(&mut self) {
        self.recent.clear();
        self.popups.clear();
        self.event_version = self.event_version.wrapping_add(1);
    }
}

impl EventSink for EventFeed {
    fn publish(&mut self, event: ScoringEvent) -> bool {
        if self.recent.is_full() {
            self.recent.pop_front();
        }
        if self.popups.is_full() {
            debug!("Popup queue full, dropping popup for {}", event.player);
        } else {
            let _ = self.popups.push_back(event.clone());
        }
        let _ = self.recent.push_back(event);
        self.event_version = self.event_version.wrapping_add(1);
        true
    }
}

/// Everything the render task needs, behind two locks
pub struct SharedState<M: RawMutex> {
    ui: Mutex<M, UiState>,
    feed: Mutex<M, EventFeed>,
}

impl<M: RawMutex> Default for SharedState<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> SharedState<M> {
    pub const fn new() -> Self {
        Self {
            ui: Mutex::new(UiState::new()),
            feed: Mutex::new(EventFeed::new()),
        }
    }

    /// Mutate the UI state and bump its version
    pub async fn update_ui<R>(&self, f: impl FnOnce(&mut UiState) -> R) -> R {
        let mut ui = self.ui.lock().await;
        let out = f(&mut ui);
        ui.version = ui.version.wrapping_add(1);
        out
    }

    pub async fn set_status(&self, status: Status) {
        self.update_ui(|ui| ui.status = status).await;
    }

    /// Run `f` with the event feed locked
    pub async fn with_feed<R>(&self, f: impl FnOnce(&mut EventFeed) -> R) -> R {
        let mut feed = self.feed.lock().await;
        f(&mut feed)
    }

    pub async fn replace_squad(&self, rows: Vec<SquadRow, MAX_PICKS>) {
        self.with_feed(|feed| feed.replace_squad(rows)).await;
    }

    pub async fn clear_events(&self) {
        self.with_feed(EventFeed::clear_events).await;
    }

    /// Copy of the UI state, or `None` if the writer holds the lock
    pub fn try_read(&self) -> Option<UiState> {
        self.ui.try_lock().ok().map(|ui| ui.clone())
    }

    /// Next popup, or `None` if there is none or the lock is busy
    pub fn try_pop_popup(&self) -> Option<ScoringEvent> {
        self.feed.try_lock().ok()?.pop_popup()
    }

    /// Read the feed without waiting
    pub fn try_feed<R>(&self, f: impl FnOnce(&EventFeed) -> R) -> Option<R> {
        self.feed.try_lock().ok().map(|feed| f(&feed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::pick::PickContext;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn event(id: u32, delta: i32) -> ScoringEvent {
        ScoringEvent::new(&PickContext::new(id, 1, 1), EventKind::Goal, delta, delta)
    }

    #[test]
    fn test_writes_bump_version() {
        let shared: SharedState<NoopRawMutex> = SharedState::new();
        let before = shared.try_read().unwrap().version;

        block_on(shared.set_status(Status::Fetching));
        block_on(shared.update_ui(|ui| ui.gameweek_points = 42));

        let ui = shared.try_read().unwrap();
        assert_eq!(ui.version, before + 2);
        assert_eq!(ui.status, Status::Fetching);
        assert_eq!(ui.gameweek_points, 42);
    }

    #[test]
    fn test_contended_read_is_skipped() {
        let shared: SharedState<NoopRawMutex> = SharedState::new();
        let guard = block_on(shared.ui.lock());
        assert!(shared.try_read().is_none());
        drop(guard);
        assert!(shared.try_read().is_some());

        let feed = block_on(shared.feed.lock());
        assert!(shared.try_pop_popup().is_none());
        assert!(shared.try_feed(|f| f.event_version).is_none());
        drop(feed);
    }

    #[test]
    fn test_recent_events_drop_oldest() {
        let mut feed = EventFeed::new();
        for i in 0..(MAX_RECENT_EVENTS as u32 + 3) {
            feed.publish(event(i, 1));
        }
        let ids: std::vec::Vec<u32> = feed.recent().map(|e| e.element_id).collect();
        assert_eq!(ids.len(), MAX_RECENT_EVENTS);
        assert_eq!(ids[0], 3);
        assert_eq!(feed.event_version, MAX_RECENT_EVENTS as u32 + 3);
    }

    #[test]
    fn test_popups_drop_newest() {
        let mut feed = EventFeed::new();
        for i in 0..(MAX_POPUPS as u32 + 2) {
            feed.publish(event(i, 1));
        }
        assert_eq!(feed.pending_popups(), MAX_POPUPS);
        assert_eq!(feed.pop_popup().map(|e| e.element_id), Some(0));
        let last = core::iter::from_fn(|| feed.pop_popup()).last();
        assert_eq!(last.map(|e| e.element_id), Some(MAX_POPUPS as u32 - 1));
    }

    #[test]
    fn test_clear_and_squad_versions() {
        let shared: SharedState<NoopRawMutex> = SharedState::new();
        block_on(shared.with_feed(|feed| {
            feed.publish(event(1, 6));
            feed.publish(event(2, 3));
        }));
        assert_eq!(shared.try_pop_popup().map(|e| e.element_id), Some(1));

        block_on(shared.clear_events());
        assert!(shared.try_pop_popup().is_none());
        assert_eq!(shared.try_feed(|f| f.recent().count()), Some(0));

        block_on(shared.replace_squad(Vec::new()));
        assert_eq!(shared.try_feed(|f| f.squad_version), Some(1));
    }

    #[test]
    fn test_error_statuses() {
        assert!(Status::WifiDown.is_error());
        assert!(Status::FetchFailed.is_error());
        assert!(!Status::Fetching.is_error());
        assert!(!Status::Updated.is_error());
    }

    #[test]
    fn test_staleness() {
        let mut ui = UiState::new();
        ui.refresh_staleness(1_000, 300_000);
        assert!(ui.stale);

        ui.last_success_ms = Some(10_000);
        ui.refresh_staleness(310_000, 300_000);
        assert!(!ui.stale);
        ui.refresh_staleness(310_001, 300_000);
        assert!(ui.stale);
    }

    #[test]
    fn test_screen_mode() {
        let now = 1_700_000_000;
        let mut ui = UiState::new();
        assert_eq!(ui.screen_mode(Some(now)), ScreenMode::Idle);

        ui.next_deadline = Some(now + 30 * 60);
        assert_eq!(ui.screen_mode(Some(now)), ScreenMode::FinalHour);
        assert_eq!(ui.screen_mode(None), ScreenMode::Idle);
        assert_eq!(ui.screen_mode(Some(50)), ScreenMode::Idle);

        ui.next_deadline = Some(now + 5 * 3600);
        assert_eq!(ui.screen_mode(Some(now)), ScreenMode::Deadline);

        ui.next_deadline = Some(now + 2 * 86_400);
        assert_eq!(ui.screen_mode(Some(now)), ScreenMode::Idle);

        ui.is_live = true;
        assert_eq!(ui.screen_mode(Some(now)), ScreenMode::Live);
    }

    #[test]
    fn test_rank_trend() {
        let mut ui = UiState::new();
        assert_eq!(ui.rank_trend(), None);
        ui.rank_diff = Some(1200);
        assert_eq!(ui.rank_trend(), Some(RankTrend::Up));
        ui.rank_diff = Some(-5);
        assert_eq!(ui.rank_trend().map(|t| t.arrow()), Some("v"));
    }
}
