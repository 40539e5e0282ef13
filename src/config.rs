use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;

use crate::error::{Result, SyncError};

const DEFAULT_DATABASE: &str = "fixture-sync.db";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONSENT_WAIT_SECS: u64 = 5;
const DEFAULT_RUN_BUDGET_SECS: u64 = 300;

/// Runtime settings, read from the environment (and a `.env` file if present).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub database: PathBuf,
    /// Bearer secret the scheduled job presents. Scheduled runs are refused without it.
    pub cron_secret: Option<String>,
    pub render_timeout: Duration,
    pub consent_wait: Duration,
    /// Wall-clock budget for a whole run; checked between teams.
    pub run_budget: Duration,
    pub user_agent: String,
    /// Cookie that records consent once the interstitial has been seen.
    pub consent_cookie: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            cron_secret: None,
            render_timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            consent_wait: Duration::from_secs(DEFAULT_CONSENT_WAIT_SECS),
            run_budget: Duration::from_secs(DEFAULT_RUN_BUDGET_SECS),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            consent_cookie: None,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<SyncConfig> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<SyncConfig> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = SyncConfig::default();
        Ok(SyncConfig {
            database: get("FIXTURE_SYNC_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database),
            cron_secret: get("FIXTURE_SYNC_CRON_SECRET"),
            render_timeout: seconds(
                "FIXTURE_SYNC_RENDER_TIMEOUT_SECS",
                get("FIXTURE_SYNC_RENDER_TIMEOUT_SECS"),
                defaults.render_timeout,
            )?,
            consent_wait: seconds(
                "FIXTURE_SYNC_CONSENT_WAIT_SECS",
                get("FIXTURE_SYNC_CONSENT_WAIT_SECS"),
                defaults.consent_wait,
            )?,
            run_budget: seconds(
                "FIXTURE_SYNC_RUN_BUDGET_SECS",
                get("FIXTURE_SYNC_RUN_BUDGET_SECS"),
                defaults.run_budget,
            )?,
            user_agent: get("FIXTURE_SYNC_USER_AGENT").unwrap_or(defaults.user_agent),
            consent_cookie: get("FIXTURE_SYNC_CONSENT_COOKIE"),
        })
    }
}

fn seconds(key: &'static str, raw: Option<String>, default: Duration) -> Result<Duration> {
    match raw {
        None => Ok(default),
        Some(raw) => u64::from_str(raw.trim())
            .map(Duration::from_secs)
            .map_err(|e| SyncError::Config {
                key,
                reason: format!("{raw:?} is not a number of seconds: {e}"),
            }),
    }
}
