use std::env;
use std::time::Duration;
use url::Url;

/// Default values for the service endpoints and game economy.
///
/// Every value can be overridden through the environment variable of the
/// same name (see [`Config::from_env`]).
pub mod defaults {
    /// SQLite database file path (DATABASE_PATH)
    pub const DATABASE_PATH: &str = "fox_fury.db";

    /// Log file path (LOG_FILE_PATH)
    pub const LOG_FILE_PATH: &str = "fox_fury.log";

    /// Bind address for the Mini App API server (API_HOST)
    pub const API_HOST: &str = "0.0.0.0";

    /// Port for the Mini App API server (API_PORT)
    pub const API_PORT: u16 = 8000;

    /// URL the "Запустить Mini App" button opens (MINIAPP_URL)
    pub const MINIAPP_URL: &str = "https://fox-fury-miniapp.vercel.app";

    /// FUR granted to every new player (STARTING_FUR)
    pub const STARTING_FUR: i64 = 500;

    /// FUR granted to both sides of a referral (REFERRAL_BONUS)
    pub const REFERRAL_BONUS: i64 = 500;

    /// Energy cap for new players (MAX_ENERGY)
    pub const MAX_ENERGY: i64 = 1000;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Dispatcher retry configuration
pub mod retry {
    use super::Duration;

    /// Maximum dispatcher reconnect attempts after a panic
    pub const MAX_DISPATCHER_RETRIES: u32 = 5;

    /// Base for exponential backoff between reconnects (seconds)
    pub const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

    /// Flat delay between dispatcher retries
    pub fn dispatcher_delay() -> Duration {
        Duration::from_secs(5)
    }
}

/// Game economy knobs: starting balance, referral payout, energy cap.
///
/// Kept separate from [`Config`] so the storage layer can take just the
/// numbers it needs without seeing tokens or endpoints.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// FUR granted on first /start
    pub starting_fur: i64,
    /// FUR granted to both the new player and the referrer
    pub referral_bonus: i64,
    /// Energy cap; one tap costs one energy
    pub max_energy: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_fur: defaults::STARTING_FUR,
            referral_bonus: defaults::REFERRAL_BONUS,
            max_energy: defaults::MAX_ENERGY,
        }
    }
}

impl GameConfig {
    /// Read the game economy from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            starting_fur: env_i64("STARTING_FUR", defaults::STARTING_FUR),
            referral_bonus: env_i64("REFERRAL_BONUS", defaults::REFERRAL_BONUS),
            max_energy: env_i64("MAX_ENERGY", defaults::MAX_ENERGY),
        }
    }
}

/// Runtime configuration, read once at startup and passed down explicitly
/// (no process-global state).
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token from BOT_TOKEN or TELOXIDE_TOKEN. Empty when unset —
    /// validated before polling starts, so `migrate` works without it.
    pub bot_token: String,
    /// SQLite database file path
    pub database_path: String,
    /// Log file path
    pub log_file_path: String,
    /// Bind address for the Mini App API server
    pub api_host: String,
    /// Port for the Mini App API server
    pub api_port: u16,
    /// URL opened by the Mini App keyboard button
    pub miniapp_url: Url,
    /// Game economy values
    pub game: GameConfig,
}

impl Config {
    /// Read the full configuration from the environment.
    ///
    /// Malformed numeric values fall back to their defaults; a malformed
    /// MINIAPP_URL is logged and replaced with the default URL.
    pub fn from_env() -> Self {
        Self {
            bot_token: env::var("BOT_TOKEN")
                .or_else(|_| env::var("TELOXIDE_TOKEN"))
                .unwrap_or_else(|_| String::new()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| defaults::DATABASE_PATH.to_string()),
            log_file_path: env::var("LOG_FILE_PATH")
                .unwrap_or_else(|_| defaults::LOG_FILE_PATH.to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| defaults::API_HOST.to_string()),
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::API_PORT),
            miniapp_url: env::var("MINIAPP_URL")
                .ok()
                .and_then(|s| match Url::parse(&s) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        log::warn!("Ignoring invalid MINIAPP_URL ({}), using default", e);
                        None
                    }
                })
                .unwrap_or_else(default_miniapp_url),
            game: GameConfig::from_env(),
        }
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn default_miniapp_url() -> Url {
    #[allow(clippy::expect_used)]
    Url::parse(defaults::MINIAPP_URL).expect("default MINIAPP_URL is a valid URL")
}
