pub(crate) mod date;
pub mod fixtures;
pub mod standings;

use ::scraper::{ElementRef, Selector};
use reqwest::Url;

pub use fixtures::{extract_fixtures, extract_from_blocks, FixtureBlock, FixtureExtraction};
pub use standings::{extract_standings, StandingsExtraction};

/// Separator placed between DOM text segments when they are joined, so that
/// segment boundaries survive pattern matching over the whole block.
pub(crate) const SEGMENT_SEPARATOR: char = '\u{1f}';

/// Selectors used to find data on competition pages.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Elements whose text is one fixture.
    pub fixture_selector: String,
    /// The classification table; the first match is used.
    pub standings_selector: String,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            fixture_selector: "a".to_string(),
            standings_selector: "table".to_string(),
        }
    }
}

/// Extract trimmed text content from the first element matching `selector`
/// inside `element`. Returns an empty string if nothing matches.
pub(crate) fn select_text(element: &ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .and_then(|d| d.text().map(|t| t.trim()).find(|t| !t.is_empty()))
        .unwrap_or_default()
        .trim()
        .replace(['\n', '\t'], "")
        .to_string()
}

/// Resolve a possibly relative image URL against the page it was found on.
pub(crate) fn normalize_img_url(page_url: &str, src: &str) -> String {
    let src = src.trim();
    if src.starts_with("//") {
        return format!("https:{src}");
    }
    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => url.to_string(),
        Err(_) => src.to_string(),
    }
}

/// Collapse every kind of space to a single ASCII space, drop zero-width and
/// control characters, and trim.
pub fn normalize_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = true;
    for ch in s.chars() {
        if is_invisible(ch) {
            continue;
        }
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else if ch.is_control() {
            continue;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}' | '\u{feff}' | '\u{00ad}'
    )
}

/// Case-insensitive substring search returning the byte range in `haystack`.
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return None;
    }
    for (start, _) in haystack.char_indices() {
        let mut matched = 0;
        for (offset, ch) in haystack[start..].char_indices() {
            let fits = ch
                .to_lowercase()
                .all(|lower| {
                    let ok = needle.get(matched) == Some(&lower);
                    matched += 1;
                    ok
                });
            if !fits {
                break;
            }
            if matched == needle.len() {
                return Some((start, start + offset + ch.len_utf8()));
            }
        }
    }
    None
}
