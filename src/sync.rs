//! Team-by-team synchronization: render, extract, reconcile, persist, audit.

use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::extract::{extract_fixtures, extract_standings, ExtractorOptions, FixtureExtraction};
use crate::model::{
    NewSyncLogEntry, RunType, SyncLogEntry, SyncOutcome, SyncReport, SyncStatus, Team, TeamId,
    TeamSyncResult, TeamSyncSummary,
};
use crate::page::{PageContent, PageContentProvider, RenderBackend};
use crate::reconcile::reconcile;
use crate::store::Store;

/// Links that select one matchday or phase of the competition page.
pub const DEFAULT_PERIOD_SELECTOR: &str = "[role=tablist] a[href], a[role=tab][href]";

const DEADLINE_EXCEEDED: &str = "deadline exceeded";

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub extractor: ExtractorOptions,
    pub period_selector: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            extractor: ExtractorOptions::default(),
            period_selector: DEFAULT_PERIOD_SELECTOR.to_string(),
        }
    }
}

/// Drives synchronization runs against one store.
///
/// Runs take `&mut self`, so two runs can never interleave on the same
/// synchronizer; share it behind a lock to serialize triggers.
pub struct Synchronizer<B, S> {
    backend: B,
    store: S,
    options: SyncOptions,
}

impl<B: RenderBackend, S: Store> Synchronizer<B, S> {
    pub fn new(backend: B, store: S) -> Self {
        Self {
            backend,
            store,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Synchronize every team that has a source page, one after the other.
    ///
    /// Teams are isolated: a failure is recorded against that team and the
    /// run moves on. `deadline` is checked between teams only. Fails only
    /// when the team list itself cannot be read.
    #[instrument(skip(self, deadline))]
    pub async fn sync_all(
        &mut self,
        run_type: RunType,
        deadline: Option<Instant>,
    ) -> Result<SyncReport> {
        let teams = self.store.sync_teams()?;
        if teams.is_empty() {
            info!("no team has a source page");
            return Ok(SyncReport::from_results(run_type, Vec::new()));
        }

        let mut session = self.backend.open().await;
        if let Err(e) = &session {
            error!(error = %e, "could not open render session");
        }

        let mut results = Vec::with_capacity(teams.len());
        for team in &teams {
            let outcome = if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(team = %team.name, "skipping team, run deadline exceeded");
                Err(DEADLINE_EXCEEDED.to_string())
            } else {
                match &mut session {
                    Ok(session) => self
                        .sync_team(session, team)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(format!("render session unavailable: {e}")),
                }
            };
            results.push(self.record(team, run_type, outcome));
        }
        drop(session);

        let report = SyncReport::from_results(run_type, results);
        info!(
            status = ?report.status,
            succeeded = report.totals.succeeded,
            failed = report.totals.failed,
            created = report.totals.created,
            updated = report.totals.updated,
            "sync run finished"
        );
        Ok(report)
    }

    /// Synchronize a single team on demand.
    ///
    /// A team without a source page is a no-op: an empty success, no log entry.
    #[instrument(skip(self))]
    pub async fn sync_one(&mut self, team_id: TeamId) -> Result<TeamSyncResult> {
        let team = self.store.team(team_id)?;
        if team.sync_url().is_none() {
            debug!(team = %team.name, "no source page, nothing to do");
            return Ok(TeamSyncResult {
                team_id: team.id,
                team_name: team.name,
                outcome: SyncOutcome::Success(TeamSyncSummary::default()),
            });
        }

        let outcome = match self.backend.open().await {
            Ok(mut session) => self
                .sync_team(&mut session, &team)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(format!("render session unavailable: {e}")),
        };
        Ok(self.record(&team, RunType::Manual, outcome))
    }

    #[instrument(skip_all, fields(team = %team.name))]
    async fn sync_team<P: PageContentProvider>(
        &mut self,
        session: &mut P,
        team: &Team,
    ) -> Result<TeamSyncSummary> {
        let url = team.sync_url().ok_or(SyncError::ElementNotFound {
            context: "team source url",
        })?;

        let base = session.render(url, None).await?;
        let tabs = base.periods(&self.options.period_selector)?;
        let mut extraction = FixtureExtraction::default();
        if tabs.is_empty() {
            extraction.extend(extract_fixtures(&base, team, &self.options.extractor)?);
        } else {
            debug!(periods = tabs.len(), "walking period tabs");
            for tab in &tabs {
                let page = session.render(url, Some(tab)).await?;
                extraction.extend(extract_fixtures(&page, team, &self.options.extractor)?);
            }
        }

        let existing = self.store.matches_for_team(team.id)?;
        let plan = reconcile(team.id, &existing, &extraction.matches);
        self.store.apply_fixture_plan(&plan)?;

        let mut summary = TeamSyncSummary {
            created: plan.created,
            updated: plan.updated,
            skipped: plan.skipped,
            unparsed: extraction.unparsed,
            needs_review: extraction.needs_review,
            ..TeamSyncSummary::default()
        };

        // Fixtures are committed at this point; standings are best effort.
        match self.refresh_standings(&base, team) {
            Ok(count) => summary.standings_count = count,
            Err(e) => {
                warn!(error = %e, "standings refresh failed");
                summary.standings_error = Some(e.to_string());
            }
        }
        Ok(summary)
    }

    /// Replace the team's standings with the page's table. An empty
    /// extraction keeps what is stored and returns `None`.
    fn refresh_standings(&mut self, page: &PageContent, team: &Team) -> Result<Option<u32>> {
        let extraction = extract_standings(page, &self.options.extractor)?;
        if extraction.rows.is_empty() {
            debug!("no standings rows, keeping stored standings");
            return Ok(None);
        }
        let written = self.store.replace_standings(team.id, &extraction.rows)?;
        Ok(Some(written))
    }

    /// Write the team's single log entry for this run and build its result.
    fn record(
        &mut self,
        team: &Team,
        run_type: RunType,
        outcome: std::result::Result<TeamSyncSummary, String>,
    ) -> TeamSyncResult {
        let entry = match &outcome {
            Ok(summary) => {
                info!(
                    team = %team.name,
                    created = summary.created,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    "team synchronized"
                );
                NewSyncLogEntry {
                    team_id: team.id,
                    run_type,
                    status: SyncStatus::Success,
                    message: success_message(summary),
                    created: summary.created,
                    updated: summary.updated,
                    skipped: summary.skipped,
                }
            }
            Err(message) => {
                error!(team = %team.name, error = %message, "team synchronization failed");
                NewSyncLogEntry {
                    team_id: team.id,
                    run_type,
                    status: SyncStatus::Error,
                    message: message.clone(),
                    created: 0,
                    updated: 0,
                    skipped: 0,
                }
            }
        };
        if let Err(e) = self.store.append_sync_log(&entry) {
            error!(team = %team.name, error = %e, "could not write sync log entry");
        }

        TeamSyncResult {
            team_id: team.id,
            team_name: team.name.clone(),
            outcome: match outcome {
                Ok(summary) => SyncOutcome::Success(summary),
                Err(error) => SyncOutcome::Failed { error },
            },
        }
    }
}

fn success_message(summary: &TeamSyncSummary) -> String {
    let mut message = format!(
        "{} created, {} updated, {} skipped",
        summary.created, summary.updated, summary.skipped
    );
    if summary.unparsed > 0 {
        message.push_str(&format!(", {} unparsed", summary.unparsed));
    }
    if summary.needs_review > 0 {
        message.push_str(&format!(", {} need review", summary.needs_review));
    }
    match (&summary.standings_count, &summary.standings_error) {
        (_, Some(error)) => message.push_str(&format!("; standings failed: {error}")),
        (Some(count), None) => message.push_str(&format!("; {count} standings rows")),
        (None, None) => {}
    }
    message
}

/// Most recent log entries first, for display.
pub fn latest_logs(mut logs: Vec<SyncLogEntry>, limit: usize) -> Vec<SyncLogEntry> {
    logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    logs.truncate(limit);
    logs
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::{NewTeam, RunStatus};
    use crate::page::StaticPages;
    use crate::store::MemoryStore;

    const POOL_URL: &str = "https://competitions.example/poule-4";

    const POOL_PAGE: &str = r#"
        <html><body>
          <h1>Nationale - Poule 4</h1>
          <a href="/m/1"><span>samedi 14 septembre 2024 à 15H00</span><span>RC Massy</span>
             <span>US Dax</span><span>28</span><span>55</span><span>Stade Jules Ladoumègue</span>
             <span>Voir le détail</span></a>
          <a href="/m/2"><span>samedi 21 septembre 2024 à 15H00</span><span>Stade Montois</span>
             <span>RC Massy</span><span>Stade Guy Boniface</span><span>Voir le détail</span></a>
          <table><tbody>
            <tr><td>1</td><td>US Dax</td><td>9</td></tr>
            <tr><td>2</td><td>RC Massy</td><td>5</td></tr>
          </tbody></table>
        </body></html>"#;

    fn seeded(pages: StaticPages) -> Synchronizer<StaticPages, MemoryStore> {
        let mut store = MemoryStore::new();
        store
            .insert_team(&NewTeam {
                name: "RC Massy".to_string(),
                category: "Seniors".to_string(),
                source_url: Some(POOL_URL.to_string()),
                ..NewTeam::default()
            })
            .unwrap();
        Synchronizer::new(pages, store)
    }

    #[tokio::test]
    async fn syncs_fixtures_and_standings_then_logs_once() {
        let mut sync = seeded(StaticPages::new().with_page(POOL_URL, None, POOL_PAGE));
        let report = sync.sync_all(RunType::Scheduled, None).await.unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        let summary = report.results[0].summary().unwrap();
        assert_eq!((summary.created, summary.updated, summary.skipped), (2, 0, 0));
        assert_eq!(summary.standings_count, Some(2));

        let logs = sync.store().sync_logs(None).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, SyncStatus::Success);
        assert_eq!(logs[0].run_type, RunType::Scheduled);
        assert_eq!(logs[0].created, 2);
    }

    #[tokio::test]
    async fn empty_standings_table_keeps_stored_rows() {
        let mut sync = seeded(StaticPages::new().with_page(POOL_URL, None, POOL_PAGE));
        sync.sync_all(RunType::Manual, None).await.unwrap();

        let without_table = POOL_PAGE.replace("<table>", "<div>").replace("</table>", "</div>");
        sync.backend = StaticPages::new().with_page(POOL_URL, None, without_table);
        let result = sync.sync_one(TeamId(1)).await.unwrap();

        assert_eq!(result.summary().unwrap().standings_count, None);
        assert_eq!(sync.store().standings_for_team(TeamId(1)).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teams_past_the_deadline_fail_without_rendering() {
        let pages = StaticPages::new().with_page(POOL_URL, None, POOL_PAGE);
        let mut sync = seeded(pages.clone());
        let deadline = Instant::now();
        tokio::time::advance(Duration::from_secs(1)).await;

        let report = sync.sync_all(RunType::Scheduled, Some(deadline)).await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert!(pages.renders().is_empty());
        let logs = sync.store().sync_logs(Some(TeamId(1))).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "deadline exceeded");
    }

    #[tokio::test]
    async fn team_without_source_is_a_no_op() {
        let mut store = MemoryStore::new();
        let team = store
            .insert_team(&NewTeam {
                name: "Féminines".to_string(),
                ..NewTeam::default()
            })
            .unwrap();
        let mut sync = Synchronizer::new(StaticPages::new(), store);

        let report = sync.sync_all(RunType::Manual, None).await.unwrap();
        assert_eq!(report.status, RunStatus::NothingToDo);

        let result = sync.sync_one(team.id).await.unwrap();
        assert!(result.is_success());
        assert!(sync.store().sync_logs(None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_team_is_an_error() {
        let mut sync = seeded(StaticPages::new());
        assert!(matches!(
            sync.sync_one(TeamId(42)).await.unwrap_err(),
            SyncError::TeamNotFound(TeamId(42))
        ));
    }

    struct Unavailable;

    impl RenderBackend for Unavailable {
        type Session = StaticPages;

        async fn open(&self) -> Result<StaticPages> {
            Err(SyncError::Consent {
                url: POOL_URL.to_string(),
                reason: "browser did not start".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn session_failure_fails_every_team() {
        let mut store = MemoryStore::new();
        for name in ["RC Massy", "RC Massy B"] {
            store
                .insert_team(&NewTeam {
                    name: name.to_string(),
                    source_url: Some(POOL_URL.to_string()),
                    ..NewTeam::default()
                })
                .unwrap();
        }
        let mut sync = Synchronizer::new(Unavailable, store);

        let report = sync.sync_all(RunType::Manual, None).await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.totals.failed, 2);
        let logs = sync.store().sync_logs(None).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.status == SyncStatus::Error));
    }

    #[test]
    fn success_message_mentions_standings_failure() {
        let summary = TeamSyncSummary {
            created: 1,
            unparsed: 2,
            standings_error: Some("database error".to_string()),
            ..TeamSyncSummary::default()
        };
        assert_eq!(
            success_message(&summary),
            "1 created, 0 updated, 0 skipped, 2 unparsed; standings failed: database error"
        );
    }
}
