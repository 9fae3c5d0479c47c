//! Runtime configuration
//!
//! The firmware bakes its settings in at compile time (`env!`/`option_env!`)
//! and hands the raw strings to [`Config::from_env`].

use crate::bonus::TieBreak;
use crate::engine::ModePreference;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 60_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 5_000;
/// No successful poll for this long marks the UI stale
pub const DEFAULT_STALE_AFTER_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_WIFI_RETRY_MS: u64 = 10_000;
pub const DEFAULT_UI_TICK_MS: u64 = 10;
/// Writers give up on the shared state after this long
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 100;
/// Delay before the single retry of a short read
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    MissingEntryId,
    InvalidNumber(&'static str),
    InvalidBool(&'static str),
    InvalidChoice(&'static str),
    OutOfRange(&'static str),
}

/// Raw configuration strings, as read from the build environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvValues<'a> {
    /// `FPL_ENTRY_ID`
    pub entry_id: Option<&'a str>,
    /// `FPL_POLL_INTERVAL_MS`
    pub poll_interval_ms: Option<&'a str>,
    /// `FPL_USE_SERVER_EVENT_BREAKDOWN`
    pub use_server_breakdown: Option<&'a str>,
    /// `FPL_BONUS_TIE_BREAK`: `project` or `include`
    pub bonus_tie_break: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub entry_id: u32,
    pub poll_interval_ms: u64,
    pub mode_preference: ModePreference,
    pub tie_break: TieBreak,
    pub stale_after_ms: u64,
    pub wifi_retry_ms: u64,
    pub ui_tick_ms: u64,
    pub lock_timeout_ms: u64,
    pub retry_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
}

impl Config {
    pub const fn new(entry_id: u32) -> Self {
        Self {
            entry_id,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            mode_preference: ModePreference::PreferBreakdown,
            tie_break: TieBreak::Project,
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            wifi_retry_ms: DEFAULT_WIFI_RETRY_MS,
            ui_tick_ms: DEFAULT_UI_TICK_MS,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_server_breakdown(mut self, enabled: bool) -> Self {
        self.mode_preference = if enabled {
            ModePreference::PreferBreakdown
        } else {
            ModePreference::InferredOnly
        };
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_stale_after_ms(mut self, ms: u64) -> Self {
        self.stale_after_ms = ms;
        self
    }

    pub fn use_server_breakdown(&self) -> bool {
        self.mode_preference == ModePreference::PreferBreakdown
    }

    /// Build from raw strings; absent values keep their defaults
    pub fn from_env(values: &EnvValues<'_>) -> Result<Self, ConfigError> {
        let entry_id = values
            .entry_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingEntryId)?;
        let entry_id: u32 = entry_id
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("FPL_ENTRY_ID"))?;
        if entry_id == 0 {
            return Err(ConfigError::OutOfRange("FPL_ENTRY_ID"));
        }

        let mut config = Config::new(entry_id);

        if let Some(raw) = values.poll_interval_ms {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("FPL_POLL_INTERVAL_MS"))?;
            if ms < MIN_POLL_INTERVAL_MS {
                return Err(ConfigError::OutOfRange("FPL_POLL_INTERVAL_MS"));
            }
            config = config.with_poll_interval_ms(ms);
        }

        if let Some(raw) = values.use_server_breakdown {
            let enabled = parse_bool(raw).ok_or(ConfigError::InvalidBool(
                "FPL_USE_SERVER_EVENT_BREAKDOWN",
            ))?;
            config = config.with_server_breakdown(enabled);
        }

        if let Some(raw) = values.bonus_tie_break {
            let tie = parse_tie_break(raw)
                .ok_or(ConfigError::InvalidChoice("FPL_BONUS_TIE_BREAK"))?;
            config = config.with_tie_break(tie);
        }

        Ok(config)
    }
}

/// `1/0`, `true/false`, `yes/no`, `on/off`, any case
pub fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    for yes in ["1", "true", "yes", "on"] {
        if s.eq_ignore_ascii_case(yes) {
            return Some(true);
        }
    }
    for no in ["0", "false", "no", "off"] {
        if s.eq_ignore_ascii_case(no) {
            return Some(false);
        }
    }
    None
}

pub fn parse_tie_break(s: &str) -> Option<TieBreak> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("project") {
        Some(TieBreak::Project)
    } else if s.eq_ignore_ascii_case("include") {
        Some(TieBreak::Include)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(1234);
        assert_eq!(config.poll_interval_ms, 60_000);
        assert_eq!(config.stale_after_ms, 300_000);
        assert!(config.use_server_breakdown());
        assert_eq!(config.tie_break, TieBreak::Project);
    }

    #[test]
    fn test_from_env_minimal() {
        let values = EnvValues {
            entry_id: Some(" 98765 "),
            ..Default::default()
        };
        assert_eq!(Config::from_env(&values), Ok(Config::new(98765)));
    }

    #[test]
    fn test_from_env_overrides() {
        let values = EnvValues {
            entry_id: Some("42"),
            poll_interval_ms: Some("30000"),
            use_server_breakdown: Some("OFF"),
            bonus_tie_break: Some("include"),
        };
        let config = Config::from_env(&values).unwrap();
        assert_eq!(config.poll_interval_ms, 30_000);
        assert_eq!(config.mode_preference, ModePreference::InferredOnly);
        assert_eq!(config.tie_break, TieBreak::Include);
    }

    #[test]
    fn test_from_env_errors() {
        assert_eq!(
            Config::from_env(&EnvValues::default()),
            Err(ConfigError::MissingEntryId)
        );

        let bad_id = EnvValues {
            entry_id: Some("abc"),
            ..Default::default()
        };
        assert_eq!(
            Config::from_env(&bad_id),
            Err(ConfigError::InvalidNumber("FPL_ENTRY_ID"))
        );

        let too_fast = EnvValues {
            entry_id: Some("1"),
            poll_interval_ms: Some("100"),
            ..Default::default()
        };
        assert_eq!(
            Config::from_env(&too_fast),
            Err(ConfigError::OutOfRange("FPL_POLL_INTERVAL_MS"))
        );

        let bad_bool = EnvValues {
            entry_id: Some("1"),
            use_server_breakdown: Some("maybe"),
            ..Default::default()
        };
        assert_eq!(
            Config::from_env(&bad_bool),
            Err(ConfigError::InvalidBool("FPL_USE_SERVER_EVENT_BREAKDOWN"))
        );
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), None);
    }
}
