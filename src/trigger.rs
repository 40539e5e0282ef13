//! Entry points for callers asking for a synchronization.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::model::{RunType, SyncOutcome, SyncReport, TeamId};
use crate::page::RenderBackend;
use crate::store::Store;
use crate::sync::Synchronizer;

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// An authenticated administrator.
    Admin,
    /// A scheduled job presenting a bearer credential.
    Bearer(String),
    Anonymous,
}

/// What a per-team trigger reports back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamTriggerSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub standings_count: u32,
}

/// Authorizes callers and runs the synchronizer on their behalf.
pub struct Trigger<B, S> {
    sync: Synchronizer<B, S>,
    cron_secret: Option<String>,
    run_budget: Option<Duration>,
}

impl<B: RenderBackend, S: Store> Trigger<B, S> {
    pub fn new(sync: Synchronizer<B, S>, cron_secret: Option<String>) -> Self {
        Self {
            sync,
            cron_secret,
            run_budget: None,
        }
    }

    /// Bound every all-teams run to `budget` of wall-clock time.
    pub fn with_run_budget(mut self, budget: Duration) -> Self {
        self.run_budget = Some(budget);
        self
    }

    pub fn synchronizer(&self) -> &Synchronizer<B, S> {
        &self.sync
    }

    /// "Synchronize now" for one team. Administrators only.
    ///
    /// A failed team sync is returned as an error carrying its message; the
    /// failure is in the sync log either way.
    #[instrument(skip(self, caller))]
    pub async fn sync_team(&mut self, caller: &Caller, team: TeamId) -> Result<TeamTriggerSummary> {
        if *caller != Caller::Admin {
            warn!("refusing team sync for non-admin caller");
            return Err(SyncError::Unauthorized {
                action: "synchronize a team",
            });
        }
        let result = self.sync.sync_one(team).await?;
        match result.outcome {
            SyncOutcome::Success(summary) => Ok(TeamTriggerSummary {
                created: summary.created,
                updated: summary.updated,
                skipped: summary.skipped,
                standings_count: summary.standings_count.unwrap_or_default(),
            }),
            SyncOutcome::Failed { error } => Err(SyncError::TeamSync {
                team: result.team_id,
                message: error,
            }),
        }
    }

    /// Synchronize every team. Administrators start a manual run; the
    /// scheduler starts a scheduled run by presenting the cron secret.
    #[instrument(skip(self, caller))]
    pub async fn sync_all(&mut self, caller: &Caller) -> Result<SyncReport> {
        let run_type = self.authorize_all(caller)?;
        info!(?run_type, "starting run");
        let deadline = self.run_budget.map(|budget| Instant::now() + budget);
        self.sync.sync_all(run_type, deadline).await
    }

    fn authorize_all(&self, caller: &Caller) -> Result<RunType> {
        match (caller, &self.cron_secret) {
            (Caller::Admin, _) => Ok(RunType::Manual),
            (Caller::Bearer(token), Some(secret)) if !secret.is_empty() && token == secret => {
                Ok(RunType::Scheduled)
            }
            _ => {
                warn!("refusing all-teams sync for unauthenticated caller");
                Err(SyncError::Unauthorized {
                    action: "synchronize all teams",
                })
            }
        }
    }
}
