//! FPL API client over HTTPS
//!
//! Every request opens a fresh TLS connection, reads the whole body into
//! PSRAM and hands it to the decoders in `fpl_buddy::api`.

use alloc::boxed::Box;
use alloc::vec::Vec as AllocVec;
use core::fmt::Write as _;

use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::TcpClient;
use embassy_time::{Duration, Timer, with_timeout};
use embedded_io_async::Read;
use esp_hal::rng::Rng;
use fpl_buddy::api::{self, ApiError, BASE_URL, EntrySummary, GameweekState};
use fpl_buddy::config::Config;
use fpl_buddy::pick::{LivePick, MAX_PICKS, Roster};
use fpl_buddy::poll::{FetchError, TeamSource};
use heapless::{String, Vec};
use log::{debug, warn};
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::request::{Method, RequestBuilder};

/// TLS buffer sizes (a full TLS record plus overhead on the read side)
pub const TLS_READ_BUF_SIZE: usize = 16640;
pub const TLS_WRITE_BUF_SIZE: usize = 4096;

/// TCP socket buffer size
pub const TCP_BUF_SIZE: usize = 4096;

/// Response headers must fit here
const HEADER_BUF_SIZE: usize = 4096;
const CHUNK_SIZE: usize = 2048;

/// `bootstrap-static` is by far the largest document
pub const MAX_BODY_SIZE: usize = 3 * 1024 * 1024;

const URL_LEN: usize = 128;

pub type FplTcpClient<'a> = TcpClient<'a, 1, TCP_BUF_SIZE, TCP_BUF_SIZE>;

const HEADERS: [(&str, &str); 2] = [("User-Agent", "fpl-buddy/0.1"), ("Accept", "application/json")];

pub struct FplClient<'a> {
    tcp: &'a FplTcpClient<'a>,
    dns: &'a DnsSocket<'a>,
    rng: Rng,
    entry_id: u32,
    connect_timeout: Duration,
    read_timeout: Duration,
    retry_delay: Duration,
    tls_read_buf: Box<[u8; TLS_READ_BUF_SIZE]>,
    tls_write_buf: Box<[u8; TLS_WRITE_BUF_SIZE]>,
    header_buf: Box<[u8; HEADER_BUF_SIZE]>,
}

impl<'a> FplClient<'a> {
    pub fn new(tcp: &'a FplTcpClient<'a>, dns: &'a DnsSocket<'a>, rng: Rng, config: &Config) -> Self {
        Self {
            tcp,
            dns,
            rng,
            entry_id: config.entry_id,
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            tls_read_buf: Box::new([0u8; TLS_READ_BUF_SIZE]),
            tls_write_buf: Box::new([0u8; TLS_WRITE_BUF_SIZE]),
            header_buf: Box::new([0u8; HEADER_BUF_SIZE]),
        }
    }

    /// GET `url` and decode the body, retrying once if the body came back short
    async fn get_decoded<T>(
        &mut self,
        url: &str,
        mut decode: impl FnMut(&[u8]) -> Result<T, ApiError>,
    ) -> Result<T, FetchError> {
        match self.get_once(url, &mut decode).await {
            Err(e) if e.is_transient() => {
                warn!("Short read from {}: {:?}, retrying", url, e);
                Timer::after(self.retry_delay).await;
                self.get_once(url, &mut decode).await
            }
            result => result,
        }
    }

    async fn get_once<T>(
        &mut self,
        url: &str,
        decode: &mut impl FnMut(&[u8]) -> Result<T, ApiError>,
    ) -> Result<T, FetchError> {
        let body = self.get(url).await?;
        debug!("GET {} -> {} bytes", url, body.len());
        Ok(decode(&body)?)
    }

    /// Fetch the whole response body
    async fn get(&mut self, url: &str) -> Result<AllocVec<u8>, FetchError> {
        let seed = (self.rng.random() as u64) << 32 | self.rng.random() as u64;
        let tls = TlsConfig::new(
            seed,
            &mut self.tls_read_buf[..],
            &mut self.tls_write_buf[..],
            TlsVerify::None,
        );
        let mut client = HttpClient::new_with_tls(self.tcp, self.dns, tls);

        let request = with_timeout(self.connect_timeout, client.request(Method::GET, url))
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(|e| {
                warn!("Connect to {} failed: {:?}", url, e);
                FetchError::Network
            })?;
        let mut request = request.headers(&HEADERS);

        let header_buf = &mut self.header_buf[..];
        with_timeout(self.read_timeout, async move {
            let response = request.send(header_buf).await.map_err(|e| {
                warn!("Request to {} failed: {:?}", url, e);
                FetchError::Network
            })?;

            if !response.status.is_successful() {
                return Err(FetchError::Status(response.status.0));
            }

            let mut reader = response.body().reader();
            let mut body = AllocVec::new();
            let mut chunk = [0u8; CHUNK_SIZE];
            loop {
                let n = match reader.read(&mut chunk).await {
                    Ok(n) => n,
                    // Connection dropped mid-body: let the decoder see what arrived
                    Err(e) => {
                        warn!("Body read from {} ended early: {:?}", url, e);
                        break;
                    }
                };
                if n == 0 {
                    break;
                }
                if body.len() + n > MAX_BODY_SIZE {
                    return Err(FetchError::BodyTooLarge);
                }
                body.try_reserve(n).map_err(|_| FetchError::BodyTooLarge)?;
                body.extend_from_slice(&chunk[..n]);
            }
            Ok(body)
        })
        .await
        .map_err(|_| FetchError::Timeout)?
    }
}

/// `BASE_URL` followed by `path`
fn endpoint(path: core::fmt::Arguments<'_>) -> Result<String<URL_LEN>, FetchError> {
    let mut url = String::new();
    write!(url, "{}{}", BASE_URL, path).map_err(|_| FetchError::Network)?;
    Ok(url)
}

impl TeamSource for FplClient<'_> {
    async fn fetch_entry(&mut self) -> Result<EntrySummary, FetchError> {
        let url = endpoint(format_args!("entry/{}/", self.entry_id))?;
        self.get_decoded(&url, api::parse_entry_summary).await
    }

    async fn fetch_picks(&mut self, gameweek: u16) -> Result<Roster, FetchError> {
        let url = endpoint(format_args!("entry/{}/event/{}/picks/", self.entry_id, gameweek))?;
        self.get_decoded(&url, |doc| api::parse_picks(doc, gameweek)).await
    }

    async fn fetch_player_meta(&mut self, roster: &mut Roster) -> Result<(), FetchError> {
        let url = endpoint(format_args!("bootstrap-static/"))?;
        self.get_decoded(&url, |doc| api::parse_player_meta(doc, roster)).await
    }

    async fn fetch_live(&mut self, roster: &Roster) -> Result<Vec<LivePick, MAX_PICKS>, FetchError> {
        let url = endpoint(format_args!("event/{}/live/", roster.gameweek))?;
        self.get_decoded(&url, |doc| api::parse_live(doc, roster)).await
    }

    async fn fetch_gameweek_state(&mut self) -> Result<GameweekState, FetchError> {
        let url = endpoint(format_args!("bootstrap-static/"))?;
        self.get_decoded(&url, api::parse_gameweek_state).await
    }

    async fn fetch_previous_rank(&mut self, current_gameweek: u16) -> Result<Option<u32>, FetchError> {
        let url = endpoint(format_args!("entry/{}/history/", self.entry_id))?;
        self.get_decoded(&url, |doc| api::parse_previous_rank(doc, current_gameweek))
            .await
    }
}
