use serde::Serialize;

use super::sync_log::RunType;
use super::team::TeamId;

/// Counts produced by one successful team synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamSyncSummary {
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    /// Fixture blocks mentioning the team that could not be read.
    pub unparsed: u32,
    /// Fixtures kept as unplayed because their score digits were ambiguous.
    pub needs_review: u32,
    /// Rows written by the standings refresh, `None` when nothing was replaced.
    pub standings_count: Option<u32>,
    pub standings_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Success(TeamSyncSummary),
    Failed { error: String },
}

/// The result for one team, never an error crossing the team boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSyncResult {
    pub team_id: TeamId,
    pub team_name: String,
    pub outcome: SyncOutcome,
}

impl TeamSyncResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Success(_))
    }

    pub fn summary(&self) -> Option<&TeamSyncSummary> {
        match &self.outcome {
            SyncOutcome::Success(summary) => Some(summary),
            SyncOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No team had a source page configured.
    NothingToDo,
    Succeeded,
    PartiallySucceeded,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncTotals {
    pub teams: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
}

/// Aggregate outcome of a run over every configured team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub run_type: RunType,
    pub status: RunStatus,
    pub totals: SyncTotals,
    pub results: Vec<TeamSyncResult>,
}

impl SyncReport {
    pub fn from_results(run_type: RunType, results: Vec<TeamSyncResult>) -> Self {
        let mut totals = SyncTotals {
            teams: results.len() as u32,
            ..SyncTotals::default()
        };
        for result in &results {
            match result.summary() {
                Some(summary) => {
                    totals.succeeded += 1;
                    totals.created += summary.created;
                    totals.updated += summary.updated;
                    totals.skipped += summary.skipped;
                }
                None => totals.failed += 1,
            }
        }
        let status = match (totals.succeeded, totals.failed) {
            (0, 0) => RunStatus::NothingToDo,
            (_, 0) => RunStatus::Succeeded,
            (0, _) => RunStatus::Failed,
            _ => RunStatus::PartiallySucceeded,
        };
        Self {
            run_type,
            status,
            totals,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(id: i64, created: u32) -> TeamSyncResult {
        TeamSyncResult {
            team_id: TeamId(id),
            team_name: format!("team {id}"),
            outcome: SyncOutcome::Success(TeamSyncSummary {
                created,
                ..TeamSyncSummary::default()
            }),
        }
    }

    fn failure(id: i64) -> TeamSyncResult {
        TeamSyncResult {
            team_id: TeamId(id),
            team_name: format!("team {id}"),
            outcome: SyncOutcome::Failed {
                error: "boom".to_string(),
            },
        }
    }

    #[test]
    fn status_distinguishes_partial_runs() {
        let report = SyncReport::from_results(RunType::Manual, vec![success(1, 2), failure(2)]);
        assert_eq!(report.status, RunStatus::PartiallySucceeded);
        assert_eq!(report.totals.created, 2);
        assert_eq!(report.totals.failed, 1);

        let report = SyncReport::from_results(RunType::Manual, vec![failure(1)]);
        assert_eq!(report.status, RunStatus::Failed);

        let report = SyncReport::from_results(RunType::Scheduled, vec![success(1, 0)]);
        assert_eq!(report.status, RunStatus::Succeeded);

        let report = SyncReport::from_results(RunType::Scheduled, vec![]);
        assert_eq!(report.status, RunStatus::NothingToDo);
    }
}
