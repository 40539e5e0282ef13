use ::scraper::error::SelectorErrorKind;
use std::num::ParseIntError;
use std::time::Duration;

use crate::model::{MatchId, TeamId};

/// All errors that can occur while fetching, extracting or persisting fixtures.
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// HTTP request failed (network, DNS, TLS, etc.).
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    /// Server returned a non-success HTTP status code.
    #[error("unexpected status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to read the response body as text.
    #[error("failed to read response body from {url}: {source}")]
    ResponseBody {
        url: String,
        source: reqwest::Error,
    },

    /// Rendering a page did not finish within the allowed time.
    #[error("rendering {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The consent interstitial was detected but could not be dismissed.
    #[error("consent dialog on {url} could not be dismissed: {reason}")]
    Consent { url: String, reason: String },

    /// A URL could not be parsed or joined.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A CSS selector string could not be parsed.
    #[error("invalid CSS selector: {0}")]
    Selector(String),

    /// Failed to parse an integer from scraped text.
    #[error("failed to parse integer: {0}")]
    IntParse(#[from] ParseIntError),

    /// Failed to parse a date/time from scraped or stored text.
    #[error("failed to parse date: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// An expected HTML element was not found on the page.
    #[error("expected element not found: {context}")]
    ElementNotFound { context: &'static str },

    /// The persistence layer rejected an operation.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON encoding of stored or reported values failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown team {0}")]
    TeamNotFound(TeamId),

    #[error("unknown match {0}")]
    MatchNotFound(MatchId),

    /// An environment value was present but unusable.
    #[error("invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    /// A team synchronization ran and failed; the message is also in its sync log.
    #[error("synchronization of team {team} failed: {message}")]
    TeamSync { team: TeamId, message: String },

    /// The caller is not allowed to trigger this operation.
    #[error("caller is not authorized to {action}")]
    Unauthorized { action: &'static str },
}

impl SyncError {
    /// Whether the error happened while obtaining page content, as opposed to
    /// parsing or persisting it.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Http { .. }
                | SyncError::UnexpectedStatus { .. }
                | SyncError::ResponseBody { .. }
                | SyncError::Timeout { .. }
                | SyncError::Consent { .. }
                | SyncError::InvalidUrl { .. }
        )
    }
}

impl<'a> From<SelectorErrorKind<'a>> for SyncError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        SyncError::Selector(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
