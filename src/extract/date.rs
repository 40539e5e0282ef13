use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// Long-form French kickoff, e.g. "samedi 14 septembre 2024 à 15H00".
/// Tokens may be split across DOM text segments.
static KICKOFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:(?:lundi|mardi|mercredi|jeudi|vendredi|samedi|dimanche)[\s\x1f]*)?(\d{1,2})(?:er)?[\s\x1f]+(janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre)[\s\x1f]+(\d{4})[\s\x1f]*[àa][\s\x1f]*(\d{1,2})[\s\x1f]*h[\s\x1f]*(\d{2})",
    )
    .unwrap_or_else(|e| unreachable!("kickoff pattern: {e}"))
});

/// A kickoff found in a block, with the byte range it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KickoffToken {
    pub kickoff: NaiveDateTime,
    pub start: usize,
    pub end: usize,
}

/// Locate the first valid kickoff in `text`.
pub(crate) fn find_kickoff(text: &str) -> Option<KickoffToken> {
    KICKOFF.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        let hour: u32 = caps[4].parse().ok()?;
        let minute: u32 = caps[5].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        let whole = caps.get(0)?;
        Some(KickoffToken {
            kickoff: date.and_time(time),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

fn month_number(name: &str) -> Option<u32> {
    let name = name
        .to_lowercase()
        .replace(['é', 'è'], "e")
        .replace('û', "u");
    let month = match name.as_str() {
        "janvier" => 1,
        "fevrier" => 2,
        "mars" => 3,
        "avril" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" => 7,
        "aout" => 8,
        "septembre" => 9,
        "octobre" => 10,
        "novembre" => 11,
        "decembre" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_weekday_prefixed_kickoff() {
        let text = "samedi 14 septembre 2024 à 15H00RC MASSYUS DAX";
        let token = find_kickoff(text).unwrap();
        assert_eq!(token.kickoff, at(2024, 9, 14, 15, 0));
        assert_eq!(token.start, 0);
        assert_eq!(&text[token.end..], "RC MASSYUS DAX");
    }

    #[test]
    fn parses_without_weekday_and_across_segments() {
        let text = "1er\u{1f}février 2025\u{1f}à 20 h 45\u{1f}US Dax";
        let token = find_kickoff(text).unwrap();
        assert_eq!(token.kickoff, at(2025, 2, 1, 20, 45));

        let text = "Dimanche 3 Août 2025 A 9h30";
        assert_eq!(find_kickoff(text).unwrap().kickoff, at(2025, 8, 3, 9, 30));
    }

    #[test]
    fn rejects_impossible_dates_and_missing_time() {
        assert_eq!(find_kickoff("31 février 2025 à 15H00"), None);
        assert_eq!(find_kickoff("14 septembre 2024"), None);
        assert_eq!(find_kickoff("Voir le classement"), None);
    }
}
