use chrono::{DateTime, Utc};
use serde::Serialize;

use super::team::TeamId;

/// What started a synchronization run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    /// An administrator pressed "synchronize now".
    Manual,
    /// The scheduled job authenticated with the shared secret.
    Scheduled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Error,
}

/// Append-only audit record, one per team per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub team_id: TeamId,
    pub run_type: RunType,
    pub status: SyncStatus,
    pub message: String,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncLogEntry {
    pub team_id: TeamId,
    pub run_type: RunType,
    pub status: SyncStatus,
    pub message: String,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}
