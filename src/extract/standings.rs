use ::scraper::{ElementRef, Selector};
use itertools::Itertools;
use tracing::debug;

use super::{normalize_text, ExtractorOptions};
use crate::error::Result;
use crate::model::ScrapedStanding;
use crate::page::PageContent;

/// Classification rows read from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandingsExtraction {
    pub rows: Vec<ScrapedStanding>,
    /// Body rows that did not carry a numeric position and points.
    pub skipped: u32,
}

/// Read the first table on the page as (position, club, points) rows.
///
/// The table is found by structure only; header wording differs between
/// competitions. Extra columns are ignored.
pub fn extract_standings(
    page: &PageContent,
    options: &ExtractorOptions,
) -> Result<StandingsExtraction> {
    let table_selector = Selector::parse(&options.standings_selector)?;
    let row_selector = Selector::parse("tbody tr")?;
    let cell_selector = Selector::parse("td")?;

    let document = page.document();
    let Some(table) = document.select(&table_selector).next() else {
        debug!(url = %page.url, "no classification table on page");
        return Ok(StandingsExtraction::default());
    };

    let mut extraction = StandingsExtraction::default();
    for row in table.select(&row_selector) {
        let cells = row.select(&cell_selector).collect_vec();
        if cells.is_empty() {
            // header rows rendered with <th> only
            continue;
        }
        match parse_row(&cells) {
            Some(standing) => extraction.rows.push(standing),
            None => extraction.skipped += 1,
        }
    }
    debug!(
        url = %page.url,
        rows = extraction.rows.len(),
        skipped = extraction.skipped,
        "extracted standings"
    );
    Ok(extraction)
}

fn parse_row(cells: &[ElementRef]) -> Option<ScrapedStanding> {
    let [position, club, points, ..] = cells else {
        return None;
    };
    let position = leading_number(&cell_text(position))?;
    let club = cell_text(club);
    if club.is_empty() {
        return None;
    }
    let points = cell_text(points).replace(' ', "").parse().ok()?;
    Some(ScrapedStanding {
        position: u32::try_from(position).ok()?,
        club,
        points,
    })
}

fn cell_text(cell: &ElementRef) -> String {
    normalize_text(&cell.text().collect::<Vec<_>>().join(" "))
}

/// "1", "1er", "2e" and "3." all read as their rank.
fn leading_number(text: &str) -> Option<i64> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
