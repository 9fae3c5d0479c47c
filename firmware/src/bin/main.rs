//! FPL Buddy Firmware - ESP32-S3 live fantasy football scoring companion
//!
//! Environment variables required:
//! - WIFI_SSID: WiFi network name
//! - WIFI_PASS: WiFi password
//! - FPL_ENTRY_ID: Fantasy Premier League team id
//!
//! Optional:
//! - FPL_POLL_INTERVAL_MS: poll interval (default 60000, minimum 5000)
//! - FPL_USE_SERVER_EVENT_BREAKDOWN: `true`/`false` (default true)
//! - FPL_BONUS_TIE_BREAK: `project` or `include` (default project)

#![no_std]
#![no_main]

extern crate alloc;

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use embassy_executor::Spawner;
use embassy_net::{
    Runner, Stack, StackResources,
    dns::DnsSocket,
    tcp::client::{TcpClient, TcpClientState},
};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, Ticker, Timer, with_timeout};
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    gpio::{Level, Output, OutputConfig},
    ram,
    rng::Rng,
    timer::timg::TimerGroup,
};
use esp_println::println;
use esp_radio::{
    Controller,
    wifi::{ClientConfig, Config as WifiConfig, ModeConfig, WifiController, WifiDevice, WifiEvent},
};
use fpl_buddy::config::{Config, EnvValues};
use fpl_buddy::event::ScoringEvent;
use fpl_buddy::pick::MAX_PICKS;
use fpl_buddy::poll::Poller;
use fpl_buddy::shared::{ScreenMode, SharedState, Status, UiState};
use fpl_buddy::summary::SquadRow;
use fpl_buddy_firmware::clock::WallClock;
use fpl_buddy_firmware::fetch::{FplClient, FplTcpClient, TCP_BUF_SIZE};
use heapless::Vec;
use log::{info, warn};

esp_bootloader_esp_idf::esp_app_desc!();

// When you are okay with using a nightly compiler it's better to use https://docs.rs/static_cell/2.1.0/static_cell/macro.make_static.html
macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

const SSID: &str = env!("WIFI_SSID");
const PASSWORD: &str = env!("WIFI_PASS");

/// How long a scoring popup stays up
const POPUP_MS: u64 = 4_000;
/// Re-sync the wall clock this often
const CLOCK_RESYNC_SECS: u64 = 6 * 60 * 60;

/// Poll results and event feed, shared between the FPL and UI tasks
static SHARED: SharedState<CriticalSectionRawMutex> = SharedState::new();
static CLOCK: WallClock = WallClock::new();

/// Flag to control red LED blinking from blink task
static BLINK_ACTIVE: AtomicBool = AtomicBool::new(false);
/// Blink interval in milliseconds (100 = fast, 500 = normal)
static BLINK_INTERVAL_MS: AtomicU16 = AtomicU16::new(500);

/// Red LED blink task - blinks when BLINK_ACTIVE is true, solid on otherwise
#[embassy_executor::task]
async fn blink_task(led: &'static mut Output<'static>) {
    loop {
        if BLINK_ACTIVE.load(Ordering::Relaxed) {
            led.toggle();
        } else {
            led.set_low(); // ON (active low)
        }
        let interval = BLINK_INTERVAL_MS.load(Ordering::Relaxed) as u64;
        Timer::after(Duration::from_millis(interval)).await;
    }
}

/// Blink pattern for the current status
fn show_status(status: Status) {
    match status {
        Status::Booting | Status::ConnectingWifi | Status::WifiDown => {
            BLINK_INTERVAL_MS.store(100, Ordering::Relaxed);
            BLINK_ACTIVE.store(true, Ordering::Relaxed);
        }
        Status::Fetching | Status::FetchFailed => {
            BLINK_INTERVAL_MS.store(500, Ordering::Relaxed);
            BLINK_ACTIVE.store(true, Ordering::Relaxed);
        }
        Status::WifiConnected | Status::Updated => BLINK_ACTIVE.store(false, Ordering::Relaxed),
    }
}

/// Read the build-time configuration
fn load_config() -> Config {
    let values = EnvValues {
        entry_id: option_env!("FPL_ENTRY_ID"),
        poll_interval_ms: option_env!("FPL_POLL_INTERVAL_MS"),
        use_server_breakdown: option_env!("FPL_USE_SERVER_EVENT_BREAKDOWN"),
        bonus_tie_break: option_env!("FPL_BONUS_TIE_BREAK"),
    };
    match Config::from_env(&values) {
        Ok(config) => config,
        Err(e) => {
            println!("Invalid configuration: {:?}", e);
            panic!("FPL configuration required");
        }
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // Init logger first so we can see any early crashes
    esp_println::logger::init_logger_from_env();

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    let led_red = Output::new(peripherals.GPIO45, Level::Low, OutputConfig::default()); // ON by default
    let led_red_static: &'static mut Output<'static> = mk_static!(Output<'static>, led_red);
    spawner.spawn(blink_task(led_red_static)).ok();
    show_status(Status::Booting);

    println!("Boot!");

    // Initialize internal RAM heap (for smaller allocations)
    println!("Initializing heap...");
    esp_alloc::heap_allocator!(#[ram(reclaimed)] size: 64 * 1024);
    esp_alloc::heap_allocator!(size: 36 * 1024);

    // PSRAM holds the response bodies (bootstrap-static runs to megabytes)
    println!("Initializing PSRAM...");
    esp_alloc::psram_allocator!(&peripherals.PSRAM, esp_hal::psram);
    println!("PSRAM initialized");

    println!("Starting RTOS...");
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(
        timg0.timer0,
        #[cfg(target_arch = "riscv32")]
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT)
            .software_interrupt0,
    );
    println!("RTOS started");

    let config = load_config();
    println!(
        "Entry {} | poll every {} ms | server breakdown: {} | bonus ties: {:?}",
        config.entry_id,
        config.poll_interval_ms,
        config.use_server_breakdown(),
        config.tie_break
    );

    let rng = Rng::new();

    // ==================== WiFi Setup ====================
    println!("Initializing WiFi...");
    set_status(&config, Status::ConnectingWifi).await;

    let ctrl = esp_radio::init().unwrap();
    let ctrl = mk_static!(Controller<'static>, ctrl);
    let (wifi_ctrl, ifaces) = esp_radio::wifi::new(ctrl, peripherals.WIFI, WifiConfig::default()).unwrap();

    let net_config = embassy_net::Config::dhcpv4(Default::default());
    let (stack, runner) = embassy_net::new(
        ifaces.sta,
        net_config,
        mk_static!(StackResources<4>, StackResources::<4>::new()),
        (rng.random() as u64) << 32 | rng.random() as u64,
    );
    spawner.spawn(net_task(runner)).ok();

    let tcp_state = mk_static!(
        TcpClientState<1, TCP_BUF_SIZE, TCP_BUF_SIZE>,
        TcpClientState::new()
    );
    let tcp_client: &'static FplTcpClient<'static> =
        mk_static!(FplTcpClient<'static>, TcpClient::new(stack, tcp_state));
    let dns_socket: &'static DnsSocket<'static> = mk_static!(DnsSocket<'static>, DnsSocket::new(stack));

    spawner.spawn(ui_task(config)).ok();
    spawner
        .spawn(fpl_task(stack, tcp_client, dns_socket, rng, config))
        .ok();

    wifi_supervise(wifi_ctrl, stack, config).await
}

/// Keep the station connected, reconnecting after drops
async fn wifi_supervise(mut controller: WifiController<'static>, stack: Stack<'static>, config: Config) -> ! {
    let retry = Duration::from_millis(config.wifi_retry_ms);
    loop {
        if matches!(controller.is_connected(), Ok(true)) {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            println!("WiFi dropped");
            set_status(&config, Status::WifiDown).await;
            Timer::after(retry).await;
        }

        set_status(&config, Status::ConnectingWifi).await;
        wifi_connect(&mut controller, retry).await;
        wait_for_ip(stack).await;
        set_status(&config, Status::WifiConnected).await;
    }
}

/// Status write that gives up rather than stall the supervisor
async fn set_status(config: &Config, status: Status) {
    let timeout = Duration::from_millis(config.lock_timeout_ms);
    if with_timeout(timeout, SHARED.set_status(status)).await.is_err() {
        warn!("Shared state busy, status {:?} not recorded", status);
    }
}

/// Poll FPL once per interval while the network is up
#[embassy_executor::task]
async fn fpl_task(
    stack: Stack<'static>,
    tcp: &'static FplTcpClient<'static>,
    dns: &'static DnsSocket<'static>,
    rng: Rng,
    config: Config,
) {
    let mut client = FplClient::new(tcp, dns, rng, &config);
    let mut poller = Poller::new(config);
    let mut ticker = Ticker::every(Duration::from_millis(config.poll_interval_ms));
    let mut last_clock_sync: Option<Instant> = None;

    loop {
        if !stack.is_config_up() {
            stack.wait_config_up().await;
            ticker.reset();
        }

        let resync = last_clock_sync.is_none_or(|at| at.elapsed() >= Duration::from_secs(CLOCK_RESYNC_SECS));
        if resync && CLOCK.sync(stack).await.is_ok() {
            last_clock_sync = Some(Instant::now());
        }

        let now_ms = Instant::now().as_millis();
        match poller.poll(&mut client, &SHARED, now_ms).await {
            Ok(report) => info!(
                "Poll done: GW{} {} pts, {} events, {} residuals{}",
                report.gameweek,
                report.gameweek_points,
                report.pass.events,
                report.pass.residuals.len(),
                if report.rolled_over { " (new gameweek)" } else { "" }
            ),
            Err(e) => warn!("Poll failed, retrying next interval: {:?}", e),
        }

        ticker.next().await;
    }
}

/// Render loop: never touches the network, never waits on the shared lock
#[embassy_executor::task]
async fn ui_task(config: Config) {
    let mut ticker = Ticker::every(Duration::from_millis(config.ui_tick_ms));
    let mut seen_version: Option<u32> = None;
    let mut seen_squad_version: Option<u32> = None;
    let mut popup_until: Option<Instant> = None;
    let mut last_mode: Option<ScreenMode> = None;

    loop {
        ticker.next().await;
        let now = Instant::now();

        if let Some(mut ui) = SHARED.try_read() {
            ui.refresh_staleness(now.as_millis(), config.stale_after_ms);
            let mode = ui.screen_mode(CLOCK.now_epoch());
            if seen_version != Some(ui.version) || last_mode != Some(mode) {
                seen_version = Some(ui.version);
                last_mode = Some(mode);
                show_status(ui.status);
                render_header(&ui, mode, CLOCK.now_epoch());
            }
        }

        let squad = SHARED.try_feed(|feed| {
            (seen_squad_version != Some(feed.squad_version))
                .then(|| (feed.squad_version, feed.squad().iter().cloned().collect::<Vec<_, MAX_PICKS>>()))
        });
        if let Some(Some((version, rows))) = squad {
            seen_squad_version = Some(version);
            render_squad(&rows);
        }

        if popup_until.is_none_or(|until| now >= until) {
            popup_until = None;
            if let Some(event) = SHARED.try_pop_popup() {
                render_popup(&event);
                popup_until = Some(now + Duration::from_millis(POPUP_MS));
            }
        }
    }
}

fn render_header(ui: &UiState, mode: ScreenMode, now_epoch: Option<i64>) {
    let gw = ui.gameweek.unwrap_or(0);
    let trend = ui.rank_trend().map(|t| t.arrow()).unwrap_or("");
    println!(
        "[{:?}] GW{} {} pts | total {:?} | rank {:?} {}{} | {}{}{}",
        mode,
        gw,
        ui.gameweek_points,
        ui.total_points,
        ui.overall_rank,
        trend,
        ui.rank_diff.map(|d| d.unsigned_abs()).unwrap_or(0),
        if ui.status.is_error() { "!" } else { "" },
        ui.status.as_str(),
        if ui.stale { " (stale)" } else { "" }
    );

    if let (Some(next), Some(deadline), Some(now)) = (ui.next_gameweek, ui.next_deadline, now_epoch) {
        if matches!(mode, ScreenMode::Deadline | ScreenMode::FinalHour) {
            let remaining = (deadline - now).max(0);
            println!(
                "GW{} deadline in {:02}:{:02}:{:02}",
                next,
                remaining / 3600,
                (remaining % 3600) / 60,
                remaining % 60
            );
        }
    }
}

fn render_squad(rows: &[SquadRow]) {
    for row in rows {
        println!(
            "{:<3}{:<16} {:<4} {:>3}{} | {}",
            if row.is_captain {
                "(C)"
            } else if row.is_vice_captain {
                "(V)"
            } else if row.is_bench {
                "b"
            } else {
                ""
            },
            row.player.as_str(),
            row.team.as_str(),
            row.points,
            if row.bonus_projected { "*" } else { "" },
            row.breakdown.as_str()
        );
    }
}

fn render_popup(event: &ScoringEvent) {
    println!(
        "*** {} {} ({} {}) {:+} {} | {} -> {} ***",
        event.kind.headline(),
        event.player.as_str(),
        event.role.as_str(),
        event.team.as_str(),
        event.delta,
        event.label(),
        event.total_before,
        event.total_after
    );
}

/// Connect to WiFi network, retrying until it works
async fn wifi_connect(controller: &mut WifiController<'static>, retry: Duration) {
    println!("Device capabilities: {:?}", controller.capabilities());

    if !matches!(controller.is_started(), Ok(true)) {
        let client_config = ModeConfig::Client(
            ClientConfig::default()
                .with_ssid(SSID.into())
                .with_password(PASSWORD.into()),
        );
        controller.set_config(&client_config).unwrap();
        println!("Starting WiFi...");
        controller.start_async().await.unwrap();
        println!("WiFi started!");
    }

    println!("Connecting to {}...", SSID);
    loop {
        match controller.connect_async().await {
            Ok(_) => {
                println!("WiFi connected!");
                break;
            }
            Err(e) => {
                println!("Failed to connect: {e:?}, retrying...");
                Timer::after(retry).await;
            }
        }
    }
}

/// Wait for network stack to get an IP address
async fn wait_for_ip(stack: Stack<'static>) {
    println!("Waiting for link...");
    loop {
        if stack.is_link_up() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
    println!("Link up!");

    println!("Waiting for IP...");
    loop {
        if let Some(config) = stack.config_v4() {
            println!("Got IP: {}", config.address);
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
