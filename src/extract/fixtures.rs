//! Reads fixture links into [`ScrapedMatch`] records.
//!
//! A fixture link renders as one run of text: kickoff, both teams, the score
//! once played, the venue, then a call-to-action. The DOM usually keeps each
//! part in its own text node, but nothing guarantees it, so every step also
//! works on a single concatenated blob.

use std::sync::LazyLock;

use ::scraper::{ElementRef, Selector};
use regex::Regex;
use tracing::{debug, warn};

use super::date::find_kickoff;
use super::standings::extract_standings;
use super::{
    find_ignore_case, normalize_img_url, normalize_text, ExtractorOptions, SEGMENT_SEPARATOR,
};
use crate::error::Result;
use crate::model::{ScrapedMatch, Team, VENUE_TO_BE_DETERMINED};
use crate::page::PageContent;

/// Trailing link text that is page chrome rather than fixture data.
pub(crate) static CALL_TO_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)voir[\s\x1f]+(?:l[ea][\s\x1f]+|les[\s\x1f]+)?(?:d[ée]tails?|fiche|match|rencontre|r[ée]sum[ée])|revanche|see[\s\x1f]+details?|rematch",
    )
    .unwrap_or_else(|e| unreachable!("call-to-action pattern: {e}"))
});

/// The text and images of one fixture link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureBlock {
    /// Text nodes in document order, unnormalized.
    pub segments: Vec<String>,
    /// Absolute image URLs in document order.
    pub images: Vec<String>,
}

impl FixtureBlock {
    /// A block whose text arrived as one blob with no segment boundaries.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![text.into()],
            images: vec![],
        }
    }

    pub fn from_element(element: &ElementRef, page_url: &str, img_selector: &Selector) -> Self {
        let segments = element.text().map(str::to_string).collect();
        let images = element
            .select(img_selector)
            .filter_map(|img| {
                img.value()
                    .attr("src")
                    .or_else(|| img.value().attr("data-src"))
            })
            .filter(|src| !src.trim().is_empty())
            .map(|src| normalize_img_url(page_url, src))
            .collect();
        Self { segments, images }
    }

    /// Segments normalized and joined with [`SEGMENT_SEPARATOR`].
    fn joined(&self) -> String {
        let separator = SEGMENT_SEPARATOR.to_string();
        self.segments
            .iter()
            .map(|s| normalize_text(s))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(&separator)
    }
}

/// Fixtures read from one page, with counts of what could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureExtraction {
    pub matches: Vec<ScrapedMatch>,
    /// Blocks mentioning the team that were dropped.
    pub unparsed: u32,
    /// Matches kept as unplayed because their score digits were ambiguous.
    pub needs_review: u32,
}

impl FixtureExtraction {
    pub fn extend(&mut self, other: FixtureExtraction) {
        self.matches.extend(other.matches);
        self.unparsed += other.unparsed;
        self.needs_review += other.needs_review;
    }
}

/// Read every fixture of `team` from a rendered page.
pub fn extract_fixtures(
    page: &PageContent,
    team: &Team,
    options: &ExtractorOptions,
) -> Result<FixtureExtraction> {
    let link_selector = Selector::parse(&options.fixture_selector)?;
    let img_selector = Selector::parse("img")?;
    let document = page.document();
    let blocks: Vec<FixtureBlock> = document
        .select(&link_selector)
        .map(|link| FixtureBlock::from_element(&link, &page.url, &img_selector))
        .collect();
    // Club names from the page's own classification table mark where an
    // opponent's name ends when the link text has no boundaries.
    let clubs: Vec<String> = extract_standings(page, options)?
        .rows
        .into_iter()
        .map(|row| row.club)
        .collect();
    let extraction = extract_from_blocks(&blocks, team, &page.title(), &clubs);
    debug!(
        url = %page.url,
        period = ?page.period,
        blocks = blocks.len(),
        matches = extraction.matches.len(),
        unparsed = extraction.unparsed,
        "extracted fixtures"
    );
    Ok(extraction)
}

/// Read fixtures of `team` from already separated blocks.
///
/// `clubs` lists the club names known to take part in the competition; it
/// may be empty.
pub fn extract_from_blocks(
    blocks: &[FixtureBlock],
    team: &Team,
    competition: &str,
    clubs: &[String],
) -> FixtureExtraction {
    let mut extraction = FixtureExtraction::default();
    for block in blocks {
        let joined = block.joined();
        if !team.is_mentioned_in(&joined.replace(SEGMENT_SEPARATOR, " ")) {
            continue;
        }
        match parse_block(block, &joined, team, competition, clubs) {
            Some(scraped) => {
                if scraped.needs_review {
                    warn!(
                        team = %team.name,
                        opponent = %scraped.opponent,
                        kickoff = %scraped.kickoff,
                        "ambiguous score digits, keeping fixture as unplayed"
                    );
                    extraction.needs_review += 1;
                }
                extraction.matches.push(scraped);
            }
            None => {
                debug!(team = %team.name, block = %joined, "skipping unreadable fixture block");
                extraction.unparsed += 1;
            }
        }
    }
    extraction
}

fn parse_block(
    block: &FixtureBlock,
    joined: &str,
    team: &Team,
    competition: &str,
    clubs: &[String],
) -> Option<ScrapedMatch> {
    let kickoff = find_kickoff(joined)?;
    let rest = &joined[kickoff.end..];
    let body = match CALL_TO_ACTION.find(rest) {
        Some(cta) => &rest[..cta.start()],
        None => rest,
    };

    let pieces = split_pieces(body, team, clubs);
    let (home, away) = match pieces.as_slice() {
        [first, second, ..] if first.kind == PieceKind::Text && second.kind == PieceKind::Text => {
            (first.text.as_str(), second.text.as_str())
        }
        _ => return None,
    };
    let is_home = if team.is_mentioned_in(home) && !is_exact_name(team, away) {
        true
    } else if team.is_mentioned_in(away) {
        false
    } else {
        return None;
    };
    let opponent = if is_home { away } else { home };
    if is_exact_name(team, opponent) {
        return None;
    }

    let score_end = pieces[2..]
        .iter()
        .position(|p| p.kind == PieceKind::Text)
        .map_or(pieces.len(), |i| i + 2);
    let digits: Vec<&str> = pieces[2..score_end]
        .iter()
        .filter(|p| p.kind == PieceKind::Digits)
        .map(|p| p.text.as_str())
        .collect();
    let reading = read_score(&digits);

    let venue = pieces
        .get(score_end)
        .map(|p| normalize_text(&body[p.start..].replace(SEGMENT_SEPARATOR, " ")))
        .unwrap_or_default();
    let venue = venue.trim_matches(|c: char| c.is_whitespace() || "-–—,:".contains(c));
    let venue = if venue.is_empty() {
        VENUE_TO_BE_DETERMINED.to_string()
    } else {
        venue.to_string()
    };

    let (team_score, opponent_score, finished, needs_review) = match reading {
        ScoreReading::Unplayed => (None, None, false, false),
        ScoreReading::Ambiguous => (None, None, false, true),
        ScoreReading::Final { home, away } if is_home => (Some(home), Some(away), true, false),
        ScoreReading::Final { home, away } => (Some(away), Some(home), true, false),
    };

    // Crests follow team order; with fewer than two images the owner is unknown.
    let opponent_crest = if block.images.len() >= 2 {
        block.images.get(usize::from(is_home)).cloned()
    } else {
        None
    };

    Some(ScrapedMatch {
        opponent: opponent.to_string(),
        kickoff: kickoff.kickoff,
        venue,
        is_home,
        competition: competition.to_string(),
        team_score,
        opponent_score,
        finished,
        opponent_crest,
        needs_review,
    })
}

fn is_exact_name(team: &Team, text: &str) -> bool {
    let text = text.trim().to_lowercase();
    team.names().any(|name| name.trim().to_lowercase() == text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKind {
    Text,
    Digits,
    /// A score separator such as "-" or ":".
    Separator,
}

/// A trimmed run of the body with its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    kind: PieceKind,
    text: String,
    start: usize,
}

/// Break the body into pieces: the two team names first, kept whole, then
/// text, digit and separator pieces for whatever follows them.
///
/// Digits only start a score after the second team name, so a reserve side
/// such as "US Dax 2" keeps its number when it has its own text node.
fn split_pieces(body: &str, team: &Team, clubs: &[String]) -> Vec<Piece> {
    let segments = segments(body);
    let Some((home, away, tail_start)) = split_team_names(&segments, team, clubs) else {
        return Vec::new();
    };
    let mut pieces = vec![home, away];
    let mut run_start = tail_start;
    let mut run_is_digit = None;
    for (i, ch) in body[tail_start..].char_indices() {
        let i = i + tail_start;
        if ch == SEGMENT_SEPARATOR {
            push_piece(&mut pieces, body, run_start, i);
            run_start = i + ch.len_utf8();
            run_is_digit = None;
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if run_is_digit.is_some_and(|d| d != is_digit) {
            push_piece(&mut pieces, body, run_start, i);
            run_start = i;
        }
        run_is_digit = Some(is_digit);
    }
    push_piece(&mut pieces, body, run_start, body.len());
    pieces
}

/// Non-empty trimmed segments of the body with their byte offsets.
fn segments(body: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for part in body.split(SEGMENT_SEPARATOR) {
        let text = part.trim();
        if !text.is_empty() {
            out.push((offset + (part.len() - part.trim_start().len()), text));
        }
        offset += part.len() + SEGMENT_SEPARATOR.len_utf8();
    }
    out
}

fn push_piece(pieces: &mut Vec<Piece>, body: &str, start: usize, end: usize) {
    let raw = &body[start..end];
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    let kind = if text.chars().all(|c| c.is_ascii_digit()) {
        PieceKind::Digits
    } else if text.chars().all(|c| "-–—:/".contains(c) || c.is_whitespace()) {
        PieceKind::Separator
    } else {
        PieceKind::Text
    };
    pieces.push(Piece {
        kind,
        text: text.to_string(),
        start: start + (raw.len() - raw.trim_start().len()),
    });
}

fn text_piece(start: usize, raw: &str) -> Option<Piece> {
    let text = raw.trim();
    (!text.is_empty()).then(|| Piece {
        kind: PieceKind::Text,
        text: text.to_string(),
        start: start + (raw.len() - raw.trim_start().len()),
    })
}

/// Longest team name or alias found in `text`, as a byte range.
fn find_team_name(text: &str, team: &Team) -> Option<(usize, usize)> {
    let mut names: Vec<&str> = team.names().map(str::trim).collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.len()));
    names.iter().find_map(|name| find_ignore_case(text, name))
}

/// Find both team names and the offset where the rest of the body starts.
///
/// Segments that hold exactly one team are taken whole. A segment where the
/// tracked team ran into its neighbours is cut around the tracked name; the
/// opponent that follows it ends at a known club name, a digit or a change of
/// letter case.
fn split_team_names(
    segments: &[(usize, &str)],
    team: &Team,
    clubs: &[String],
) -> Option<(Piece, Piece, usize)> {
    let &(first_start, first) = segments.first()?;
    match find_team_name(first, team) {
        Some((from, to)) if from > 0 || to < first.len() => {
            let name = text_piece(first_start + from, &first[from..to])?;
            if let Some(home) = text_piece(first_start, &first[..from]) {
                return Some((home, name, first_start + to));
            }
            let rest = &first[to..];
            let end = opponent_end(rest, clubs);
            let away = text_piece(first_start + to, &rest[..end])?;
            Some((name, away, first_start + to + end))
        }
        _ => {
            let home = text_piece(first_start, first)?;
            let &(second_start, second) = segments.get(1)?;
            match find_team_name(second, team) {
                // the tracked away side ran into the score or venue
                Some((0, to)) if to < second.len() && !team.is_mentioned_in(first) => {
                    let away = text_piece(second_start, &second[..to])?;
                    Some((home, away, second_start + to))
                }
                _ => {
                    let away = text_piece(second_start, second)?;
                    Some((home, away, second_start + second.len()))
                }
            }
        }
    }
}

/// Byte length of the opponent name at the start of `rest`.
fn opponent_end(rest: &str, clubs: &[String]) -> usize {
    let known = clubs
        .iter()
        .filter_map(|club| find_ignore_case(rest, club.trim()))
        .filter(|&(start, _)| rest[..start].trim().is_empty())
        .map(|(_, end)| end)
        .max();
    if let Some(end) = known {
        return end;
    }
    let digit = rest.find(|c: char| c.is_ascii_digit());
    [digit, case_boundary(rest)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len())
}

/// Offset of the first capitalised word glued to the letter before it, as in
/// "STADE MONTOISStade" or "MontoisStade".
fn case_boundary(text: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    chars
        .windows(3)
        .find(|w| w[0].1.is_alphabetic() && w[1].1.is_uppercase() && w[2].1.is_lowercase())
        .map(|w| w[1].0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScoreReading {
    Unplayed,
    Final { home: u8, away: u8 },
    /// Digits present but not a safe score.
    Ambiguous,
}

/// Turn the digit groups found where the score sits into a reading.
///
/// Two groups of at most two digits are the home and away scores. A single
/// run of exactly four digits is two adjacent two-digit scores. Anything else
/// is ambiguous.
fn read_score(groups: &[&str]) -> ScoreReading {
    let pair = match groups {
        [] => return ScoreReading::Unplayed,
        [home, away] if home.len() <= 2 && away.len() <= 2 => (*home, *away),
        [run] if run.len() == 4 => run.split_at(2),
        _ => return ScoreReading::Ambiguous,
    };
    match (pair.0.parse(), pair.1.parse()) {
        (Ok(home), Ok(away)) => ScoreReading::Final { home, away },
        _ => ScoreReading::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::model::{MatchId, TeamId};
    use crate::reconcile::{apply_plan, reconcile};

    fn massy() -> Team {
        Team {
            id: TeamId(1),
            name: "RC Massy".to_string(),
            category: "Seniors".to_string(),
            aliases: vec!["RC Massy Essonne".to_string()],
            source_url: Some("https://competitions.example/poule/4".to_string()),
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn blocks(segments: &[&[&str]]) -> Vec<FixtureBlock> {
        segments
            .iter()
            .map(|s| FixtureBlock {
                segments: s.iter().map(|t| t.to_string()).collect(),
                images: vec![],
            })
            .collect()
    }

    #[test]
    fn reads_finished_home_match_from_concatenated_blob() {
        let block = FixtureBlock::from_text(
            "samedi 14 septembre 2024 à 15H00RC MASSYUS DAX2855Stade Jules Ladoumègue, MassyVoir le détail",
        );
        let out = extract_from_blocks(&[block], &massy(), "Nationale", &[]);
        assert_eq!(out.unparsed, 0);
        assert_eq!(
            out.matches,
            vec![ScrapedMatch {
                opponent: "US DAX".to_string(),
                kickoff: at(2024, 9, 14, 15, 0),
                venue: "Stade Jules Ladoumègue, Massy".to_string(),
                is_home: true,
                competition: "Nationale".to_string(),
                team_score: Some(28),
                opponent_score: Some(55),
                finished: true,
                opponent_crest: None,
                needs_review: false,
            }]
        );
    }

    #[test]
    fn reads_away_match_from_segments_with_invisible_characters() {
        let out = extract_from_blocks(
            &blocks(&[&[
                "dimanche 6 octobre 2024 à 15H00",
                "US Dax",
                "RC Massy",
                "1\u{200b}2",
                "\u{a0}-\u{a0}",
                "2\u{feff}8",
                "Stade Maurice Boyau",
                "Revanche",
            ]]),
            &massy(),
            "Nationale",
            &[],
        );
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "US Dax");
        assert!(!scraped.is_home);
        assert_eq!(scraped.team_score, Some(28));
        assert_eq!(scraped.opponent_score, Some(12));
        assert!(scraped.finished);
        assert_eq!(scraped.venue, "Stade Maurice Boyau");
    }

    #[test]
    fn future_match_without_venue_is_unplayed_and_to_be_determined() {
        let out = extract_from_blocks(
            &blocks(&[&["samedi 1 mars 2025 à 18H30", "RC Massy", "Stade Montois", "Voir le détail"]]),
            &massy(),
            "Nationale",
            &[],
        );
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "Stade Montois");
        assert_eq!(scraped.team_score, None);
        assert_eq!(scraped.opponent_score, None);
        assert!(!scraped.finished);
        assert!(!scraped.needs_review);
        assert_eq!(scraped.venue, VENUE_TO_BE_DETERMINED);
    }

    #[test]
    fn venue_digits_after_the_name_are_not_scores() {
        let out = extract_from_blocks(
            &blocks(&[&[
                "samedi 1 mars 2025 à 18H30",
                "RC Massy",
                "Stade Montois",
                "Stade du 8 Mai 1945",
            ]]),
            &massy(),
            "Nationale",
            &[],
        );
        let scraped = &out.matches[0];
        assert!(!scraped.finished);
        assert_eq!(scraped.venue, "Stade du 8 Mai 1945");
    }

    #[test]
    fn ambiguous_digits_are_flagged_not_guessed() {
        let out = extract_from_blocks(
            &[FixtureBlock::from_text(
                "samedi 8 février 2025 à 15H00RC MASSYUS DAX285Stade Maurice Boyau",
            )],
            &massy(),
            "Nationale",
            &[],
        );
        assert_eq!(out.needs_review, 1);
        let scraped = &out.matches[0];
        assert!(scraped.needs_review);
        assert!(!scraped.finished);
        assert_eq!(scraped.team_score, None);
        assert_eq!(scraped.opponent_score, None);
    }

    #[test]
    fn other_pool_fixtures_are_ignored_and_broken_blocks_counted() {
        let out = extract_from_blocks(
            &blocks(&[
                &["samedi 14 septembre 2024 à 15H00", "US Dax", "Stade Montois", "21", "9"],
                &["RC Massy", "Voir le classement"],
                &["samedi 14 septembre 2024 à 15H00", "RC Massy"],
            ]),
            &massy(),
            "Nationale",
            &[],
        );
        assert!(out.matches.is_empty());
        assert_eq!(out.unparsed, 2);
    }

    #[test]
    fn alias_identifies_tracked_side() {
        let out = extract_from_blocks(
            &[FixtureBlock::from_text(
                "12 avril 2025 à 20H00US DAXRC MASSY ESSONNE3310",
            )],
            &massy(),
            "Nationale",
            &[],
        );
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "US DAX");
        assert!(!scraped.is_home);
        assert_eq!(scraped.team_score, Some(10));
        assert_eq!(scraped.opponent_score, Some(33));
    }

    #[test]
    fn score_policy() {
        assert_eq!(read_score(&[]), ScoreReading::Unplayed);
        assert_eq!(read_score(&["28", "55"]), ScoreReading::Final { home: 28, away: 55 });
        assert_eq!(read_score(&["2855"]), ScoreReading::Final { home: 28, away: 55 });
        assert_eq!(read_score(&["7", "0"]), ScoreReading::Final { home: 7, away: 0 });
        assert_eq!(read_score(&["285"]), ScoreReading::Ambiguous);
        assert_eq!(read_score(&["28"]), ScoreReading::Ambiguous);
        assert_eq!(read_score(&["1", "2", "3"]), ScoreReading::Ambiguous);
        assert_eq!(read_score(&["100", "3"]), ScoreReading::Ambiguous);
    }

    #[test]
    fn extracts_from_page_markup_with_crests() {
        let html = r#"
            <html><body><h1>Nationale - Poule 1</h1>
            <a href="/rencontre/1">
              <span>samedi 14 septembre 2024 à 15H00</span>
              <img src="/logos/massy.png"><span>RC Massy</span>
              <img src="/logos/dax.png"><span>US Dax</span>
              <span>28</span><span>55</span>
              <span>Stade Jules Ladoumègue</span>
              <span>Voir le détail</span>
            </a>
            <a href="/club/massy">RC Massy</a>
            </body></html>"#;
        let page = PageContent::new("https://competitions.example/poule/1", None, html);
        let out = extract_fixtures(&page, &massy(), &ExtractorOptions::default()).unwrap();
        assert_eq!(out.matches.len(), 1);
        // the club link mentions the team but carries no kickoff
        assert_eq!(out.unparsed, 1);
        let scraped = &out.matches[0];
        assert_eq!(scraped.competition, "Nationale - Poule 1");
        assert_eq!(
            scraped.opponent_crest.as_deref(),
            Some("https://competitions.example/logos/dax.png")
        );
        assert_eq!(scraped.team_score, Some(28));
        assert_eq!(scraped.venue, "Stade Jules Ladoumègue");
    }

    #[test]
    fn unplayed_home_blob_ends_opponent_at_the_venue() {
        let out = extract_from_blocks(
            &[FixtureBlock::from_text(
                "samedi 1 mars 2025 à 18H30RC MASSYSTADE MONTOISStade Guy BonifaceVoir le détail",
            )],
            &massy(),
            "Nationale",
            &[],
        );
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "STADE MONTOIS");
        assert!(scraped.is_home);
        assert_eq!(scraped.venue, "Stade Guy Boniface");
        assert!(!scraped.finished);
        assert!(!scraped.needs_review);
    }

    #[test]
    fn unplayed_away_blob_keeps_venue() {
        let out = extract_from_blocks(
            &[FixtureBlock::from_text(
                "samedi 1 mars 2025 à 18H30STADE MONTOISRC MASSYStade Guy BonifaceVoir le détail",
            )],
            &massy(),
            "Nationale",
            &[],
        );
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "STADE MONTOIS");
        assert!(!scraped.is_home);
        assert_eq!(scraped.venue, "Stade Guy Boniface");
        assert!(!scraped.finished);
    }

    #[test]
    fn blob_fixture_keeps_its_opponent_once_the_score_appears() {
        let unplayed = extract_from_blocks(
            &[FixtureBlock::from_text(
                "samedi 1 mars 2025 à 18H30RC MASSYSTADE MONTOISStade Guy BonifaceVoir le détail",
            )],
            &massy(),
            "Nationale",
            &[],
        );
        let played = extract_from_blocks(
            &[FixtureBlock::from_text(
                "samedi 1 mars 2025 à 18H30RC MASSYSTADE MONTOIS2017Stade Guy BonifaceVoir le détail",
            )],
            &massy(),
            "Nationale",
            &[],
        );
        assert_eq!(unplayed.matches[0].opponent, played.matches[0].opponent);

        let first = reconcile(TeamId(1), &[], &unplayed.matches);
        let mut next = 0;
        let stored = apply_plan(&[], &first, || {
            next += 1;
            MatchId(next)
        });
        let second = reconcile(TeamId(1), &stored, &played.matches);
        assert_eq!((second.created, second.updated), (0, 1));
        assert_eq!(second.updates[0].0, MatchId(1));
    }

    #[test]
    fn opponent_with_a_number_in_its_own_segment_stays_whole() {
        let out = extract_from_blocks(
            &blocks(&[&[
                "samedi 1 mars 2025 à 18H30",
                "RC Massy",
                "US Dax 2",
                "Stade Guy Boniface",
            ]]),
            &massy(),
            "Nationale",
            &[],
        );
        assert_eq!(out.needs_review, 0);
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "US Dax 2");
        assert!(!scraped.needs_review);
        assert!(!scraped.finished);
        assert_eq!(scraped.venue, "Stade Guy Boniface");
    }

    #[test]
    fn classification_club_names_end_the_opponent_in_a_blob() {
        let clubs = vec!["US Dax".to_string(), "US Dax 2".to_string()];
        let out = extract_from_blocks(
            &[FixtureBlock::from_text(
                "samedi 1 mars 2025 à 18H30RC MASSYUS DAX 21712Stade Maurice Boyau",
            )],
            &massy(),
            "Nationale",
            &clubs,
        );
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "US DAX 2");
        assert_eq!(scraped.team_score, Some(17));
        assert_eq!(scraped.opponent_score, Some(12));
        assert_eq!(scraped.venue, "Stade Maurice Boyau");
    }

    #[test]
    fn case_boundary_needs_a_glued_capitalised_word() {
        assert_eq!(case_boundary("STADE MONTOISStade Guy"), Some(13));
        assert_eq!(case_boundary("MontoisStade"), Some(7));
        assert_eq!(case_boundary("US Dax"), None);
        assert_eq!(case_boundary("STADE MONTOIS"), None);
    }

    #[test]
    fn page_classification_table_feeds_club_names() {
        let html = r#"
            <html><body><h1>Nationale</h1>
            <a href="/rencontre/9">samedi 1 mars 2025 à 18H30RC MASSYUS DAX 2Stade du 8 Mai 1945</a>
            <table><tbody>
              <tr><td>1</td><td>US Dax 2</td><td>40</td></tr>
              <tr><td>2</td><td>RC Massy</td><td>38</td></tr>
            </tbody></table>
            </body></html>"#;
        let page = PageContent::new("https://competitions.example/poule/1", None, html);
        let out = extract_fixtures(&page, &massy(), &ExtractorOptions::default()).unwrap();
        let scraped = &out.matches[0];
        assert_eq!(scraped.opponent, "US DAX 2");
        assert!(!scraped.needs_review);
        assert_eq!(scraped.venue, "Stade du 8 Mai 1945");
    }
}
