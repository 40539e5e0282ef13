//! Administrative cleanup of stored fixtures the pipeline should never have
//! produced: rows with a garbled opponent and rows duplicating an earlier one.
//!
//! Nothing here runs during synchronization; deletion is always an explicit
//! administrative action.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::Result;
use crate::extract::fixtures::CALL_TO_ACTION;
use crate::model::{Match, MatchId, TeamId};
use crate::reconcile::RECONCILIATION_WINDOW;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MalformedReason {
    EmptyOpponent,
    /// Score or date digits leaked into the opponent name.
    DigitsInOpponent,
    CallToActionInOpponent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedMatch {
    pub id: MatchId,
    pub opponent: String,
    pub reason: MalformedReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    pub id: MatchId,
    /// The earliest-created row describing the same fixture, which is kept.
    pub duplicate_of: MatchId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub team_id: TeamId,
    pub dry_run: bool,
    pub malformed: Vec<MalformedMatch>,
    pub duplicates: Vec<DuplicateMatch>,
    /// Ids removed, or that would be removed on a dry run.
    pub deleted: Vec<MatchId>,
}

fn malformed_reason(opponent: &str) -> Option<MalformedReason> {
    let opponent = opponent.trim();
    if opponent.is_empty() {
        Some(MalformedReason::EmptyOpponent)
    } else if has_leaked_digits(opponent) {
        Some(MalformedReason::DigitsInOpponent)
    } else if CALL_TO_ACTION.is_match(opponent) {
        Some(MalformedReason::CallToActionInOpponent)
    } else {
        None
    }
}

/// A reserve side's number ("US Dax 2") is a word of its own; score or date
/// digits are glued to letters or run longer.
fn has_leaked_digits(opponent: &str) -> bool {
    opponent.split_whitespace().any(|word| {
        word.chars().any(|c| c.is_ascii_digit())
            && !(word.len() <= 2 && word.chars().all(|c| c.is_ascii_digit()))
    })
}

pub fn find_malformed(matches: &[Match]) -> Vec<MalformedMatch> {
    matches
        .iter()
        .filter_map(|m| {
            malformed_reason(&m.opponent).map(|reason| MalformedMatch {
                id: m.id,
                opponent: m.opponent.clone(),
                reason,
            })
        })
        .collect()
}

/// Rows sharing an opponent with an earlier row (by id) within the
/// reconciliation window of it.
pub fn find_duplicates(matches: &[Match]) -> Vec<DuplicateMatch> {
    let mut kept: Vec<&Match> = Vec::new();
    let mut duplicates = Vec::new();
    for m in matches.iter().sorted_by_key(|m| m.id) {
        let original = kept.iter().find(|k| {
            k.opponent == m.opponent && (k.kickoff - m.kickoff).abs() <= RECONCILIATION_WINDOW
        });
        match original {
            Some(original) => duplicates.push(DuplicateMatch {
                id: m.id,
                duplicate_of: original.id,
            }),
            None => kept.push(m),
        }
    }
    duplicates
}

/// Delete the team's malformed and duplicate rows. With `dry_run` nothing
/// is deleted and the report lists what would be.
#[instrument(skip(store))]
pub fn purge<S: Store>(store: &mut S, team: TeamId, dry_run: bool) -> Result<PurgeReport> {
    store.team(team)?;
    let matches = store.matches_for_team(team)?;
    let malformed = find_malformed(&matches);
    let duplicates = find_duplicates(&matches);

    let targets: BTreeSet<MatchId> = malformed
        .iter()
        .map(|m| m.id)
        .chain(duplicates.iter().map(|d| d.id))
        .collect();
    if !dry_run {
        for id in &targets {
            store.delete_match(*id)?;
        }
    }
    info!(
        malformed = malformed.len(),
        duplicates = duplicates.len(),
        deleted = targets.len(),
        dry_run,
        "purge finished"
    );

    Ok(PurgeReport {
        team_id: team,
        dry_run,
        malformed,
        duplicates,
        deleted: targets.into_iter().collect(),
    })
}
