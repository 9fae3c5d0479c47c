//! Wall-clock time from a one-shot SNTP query
//!
//! The deadline countdown screens need Unix time; the monotonic embassy
//! clock is anchored to the offset `sntpc` reports after each sync.

use core::cell::Cell;
use core::net::SocketAddr;

use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpEndpoint, Stack};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant, with_timeout};
use log::{info, warn};
use sntpc::{NtpContext, NtpTimestampGenerator, NtpUdpSocket};

pub const NTP_HOST: &str = "pool.ntp.org";
const NTP_PORT: u16 = 123;
const LOCAL_PORT: u16 = 50123;
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub enum ClockError {
    Dns,
    Socket,
    Timeout,
    /// Reply rejected by the SNTP client (bad mode, stratum, origin, ...)
    Ntp(sntpc::Error),
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    epoch_secs: i64,
    at: Instant,
}

/// Unix time derived from the last successful sync
pub struct WallClock {
    anchor: Mutex<CriticalSectionRawMutex, Cell<Option<Anchor>>>,
}

impl WallClock {
    pub const fn new() -> Self {
        Self {
            anchor: Mutex::new(Cell::new(None)),
        }
    }

    pub fn set(&self, epoch_secs: i64) {
        let anchor = Anchor {
            epoch_secs,
            at: Instant::now(),
        };
        self.anchor.lock(|cell| cell.set(Some(anchor)));
    }

    /// `None` until the first sync
    pub fn now_epoch(&self) -> Option<i64> {
        self.anchor.lock(|cell| cell.get()).map(|anchor| {
            let elapsed = Instant::now().saturating_duration_since(anchor.at);
            anchor.epoch_secs + elapsed.as_secs() as i64
        })
    }

    /// Query the NTP pool and re-anchor the clock
    pub async fn sync(&self, stack: Stack<'_>) -> Result<i64, ClockError> {
        let epoch = query_ntp(stack).await.inspect_err(|e| warn!("SNTP sync failed: {:?}", e))?;
        self.set(epoch);
        info!("Wall clock set to {}", epoch);
        Ok(epoch)
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// `embassy-net` UDP socket as seen by `sntpc`
struct NtpSocket<'a> {
    socket: UdpSocket<'a>,
}

impl NtpUdpSocket for NtpSocket<'_> {
    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> sntpc::Result<usize> {
        self.socket
            .send_to(buf, IpEndpoint::from(addr))
            .await
            .map_err(|_| sntpc::Error::Network)?;
        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> sntpc::Result<(usize, SocketAddr)> {
        let (n, meta) = self
            .socket
            .recv_from(buf)
            .await
            .map_err(|_| sntpc::Error::Network)?;
        Ok((n, SocketAddr::new(meta.endpoint.addr.into(), meta.endpoint.port)))
    }
}

/// Local time for the request: microseconds since boot
#[derive(Debug, Clone, Copy, Default)]
struct Uptime {
    micros: u64,
}

impl NtpTimestampGenerator for Uptime {
    fn init(&mut self) {
        self.micros = Instant::now().as_micros();
    }

    fn timestamp_sec(&self) -> u64 {
        self.micros / 1_000_000
    }

    fn timestamp_subsec_micros(&self) -> u32 {
        (self.micros % 1_000_000) as u32
    }
}

/// Unix seconds now, from the server's offset against the uptime clock
async fn query_ntp(stack: Stack<'_>) -> Result<i64, ClockError> {
    let addrs = stack
        .dns_query(NTP_HOST, DnsQueryType::A)
        .await
        .map_err(|_| ClockError::Dns)?;
    let addr = addrs.first().copied().ok_or(ClockError::Dns)?;
    let server = SocketAddr::new(addr.into(), NTP_PORT);

    let mut rx_meta = [PacketMetadata::EMPTY; 1];
    let mut tx_meta = [PacketMetadata::EMPTY; 1];
    let mut rx_buf = [0u8; 128];
    let mut tx_buf = [0u8; 128];
    let mut socket = UdpSocket::new(stack, &mut rx_meta, &mut rx_buf, &mut tx_meta, &mut tx_buf);
    socket.bind(LOCAL_PORT).map_err(|_| ClockError::Socket)?;
    let socket = NtpSocket { socket };

    let context = NtpContext::new(Uptime::default());
    let result = with_timeout(RESPONSE_TIMEOUT, sntpc::get_time(server, &socket, context))
        .await
        .map_err(|_| ClockError::Timeout)?
        .map_err(ClockError::Ntp)?;

    Ok(epoch_secs(Instant::now().as_micros(), result.offset()))
}

/// Unix seconds from uptime and the server's offset against it
fn epoch_secs(uptime_micros: u64, offset_micros: i64) -> i64 {
    (uptime_micros as i64 + offset_micros).div_euclid(1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_splits_seconds() {
        let stamp = Uptime { micros: 12_345_678 };
        assert_eq!(stamp.timestamp_sec(), 12);
        assert_eq!(stamp.timestamp_subsec_micros(), 345_678);
    }

    #[test]
    fn test_epoch_from_offset() {
        // 90 s after boot, server says boot was at 2024-08-16T17:30:00Z
        let offset = 1_723_829_400_000_000;
        assert_eq!(epoch_secs(90_000_000, offset), 1_723_829_490);
        assert_eq!(epoch_secs(90_999_999, offset), 1_723_829_490);
    }
}
