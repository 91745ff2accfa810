//! Configuration module for the roster backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_DISCOVERY_URL: &str =
    "https://www.googleapis.com/discovery/v1/apis/calendar/v3/rest";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin key that unlocks write operations (unset disables the check)
    pub admin_key: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Local timezone that calendar events are placed in
    pub timezone: Tz,
    /// Google Calendar integration settings
    pub google: GoogleConfig,
}

/// Settings for the Google Calendar integration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    /// Discovery document fetched once when the calendar session initializes
    pub discovery_url: String,
    /// Delay before the single re-attempt of a failed session initialization
    pub init_retry_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let admin_key = env::var("ROSTER_ADMIN_KEY").ok();

        let db_path = env::var("ROSTER_DB_PATH")
            .unwrap_or_else(|_| "./data/roster.sqlite".to_string())
            .into();

        let bind_addr = env::var("ROSTER_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| format!("Invalid ROSTER_BIND_ADDR format: {}", e))?;

        let log_level = env::var("ROSTER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let timezone = env::var("ROSTER_TIMEZONE")
            .unwrap_or_else(|_| "UTC".to_string())
            .parse::<Tz>()
            .map_err(|e| format!("Invalid ROSTER_TIMEZONE: {}", e))?;

        let init_retry_ms = env::var("ROSTER_CALENDAR_INIT_RETRY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1000);

        let google = GoogleConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").ok(),
            client_secret: env::var("GOOGLE_CLIENT_SECRET").ok(),
            redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/api/calendar/callback".to_string()),
            auth_url: env::var("GOOGLE_AUTH_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_AUTH_URL.to_string()),
            token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_GOOGLE_TOKEN_URL.to_string()),
            api_base: env::var("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|_| DEFAULT_CALENDAR_API_BASE.to_string()),
            discovery_url: env::var("GOOGLE_DISCOVERY_URL")
                .unwrap_or_else(|_| DEFAULT_DISCOVERY_URL.to_string()),
            init_retry_delay: Duration::from_millis(init_retry_ms),
        };

        Ok(Self {
            admin_key,
            db_path,
            bind_addr,
            log_level,
            timezone,
            google,
        })
    }
}
