//! URL rules of the adopted-texts document chain.
//!
//! TOC pages live at `.../TA-<term>-<yyyy>-<mm>-<dd>-TOC_<LANG>.html`; the
//! matching content page is the same URL without the `-TOC` marker. Some links
//! in the chain carry a wrong term number (e.g. `TA-0-2002-...`); those are
//! repaired from the sitting date via [`TermTable`].

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use url::Url;

use crate::error::CrawlError;

/// The marker separating a TOC URL from its content URL.
const TOC_MARKER: &str = "-TOC";

/// First sitting date of each parliamentary term, oldest first.
const TERM_STARTS: &[(u32, (i32, u32, u32))] = &[
    (5, (1999, 7, 20)),
    (6, (2004, 7, 20)),
    (7, (2009, 7, 14)),
    (8, (2014, 7, 1)),
    (9, (2019, 7, 2)),
    (10, (2024, 7, 16)),
];

// ---------------------------------------------------------------------------
// URL derivation
// ---------------------------------------------------------------------------

static TOC_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-TOC_[A-Z]{2}\.html?").expect("valid regex"));

/// Remove the `-TOC` marker that precedes the language suffix.
///
/// Returns `None` when there is no marker, so applying it to its own output
/// is a no-op.
pub fn strip_toc_marker(url: &str) -> Option<String> {
    let found = TOC_MARKER_RE.find(url)?;
    let start = found.start();
    let mut stripped = String::with_capacity(url.len() - TOC_MARKER.len());
    stripped.push_str(&url[..start]);
    stripped.push_str(&url[start + TOC_MARKER.len()..]);
    Some(stripped)
}

/// Whether the URL carries the TOC marker.
pub fn is_toc_url(url: &Url) -> bool {
    TOC_MARKER_RE.is_match(url.as_str())
}

/// Derive the content-page URL from a TOC-page URL.
pub fn derive_content_url(toc_url: &Url) -> Result<Url, CrawlError> {
    let missing = || CrawlError::MissingTocMarker {
        url: toc_url.to_string(),
    };
    let stripped = strip_toc_marker(toc_url.as_str()).ok_or_else(missing)?;
    Url::parse(&stripped).map_err(|_| missing())
}

// ---------------------------------------------------------------------------
// Term token
// ---------------------------------------------------------------------------

static TERM_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"TA-(\d{1,2})-(\d{4})-(\d{2})-(\d{2})").expect("valid regex")
});

/// The `TA-<term>-<yyyy>-<mm>-<dd>` token of a document URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermToken {
    /// Term number as written in the URL.
    pub term: u32,
    /// Sitting date.
    pub date: NaiveDate,
    /// Byte range of the term digits within the URL string.
    term_span: std::ops::Range<usize>,
}

impl TermToken {
    /// Find the token in a URL string. Invalid calendar dates yield `None`.
    pub fn parse(url: &str) -> Option<Self> {
        let caps = TERM_TOKEN_RE.captures(url)?;
        let term_match = caps.get(1)?;
        let term = term_match.as_str().parse().ok()?;
        let year = caps[2].parse().ok()?;
        let month = caps[3].parse().ok()?;
        let day = caps[4].parse().ok()?;

        Some(Self {
            term,
            date: NaiveDate::from_ymd_opt(year, month, day)?,
            term_span: term_match.range(),
        })
    }

    /// Replace the term digits in `url`, keeping every other character.
    fn rewrite(&self, url: &str, term: u32) -> String {
        format!(
            "{}{term}{}",
            &url[..self.term_span.start],
            &url[self.term_span.end..]
        )
    }
}

// ---------------------------------------------------------------------------
// TermTable
// ---------------------------------------------------------------------------

/// A parliamentary term and the date of its first sitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermPeriod {
    pub term: u32,
    pub starts: NaiveDate,
}

/// Ordered mapping from sitting dates to parliamentary terms.
///
/// A date belongs to the latest period that started on or before it; dates
/// before the first period are unmapped.
#[derive(Debug, Clone)]
pub struct TermTable {
    periods: Vec<TermPeriod>,
}

impl TermTable {
    /// Build a table from periods in any order.
    pub fn new(mut periods: Vec<TermPeriod>) -> Self {
        periods.sort_by_key(|p| p.starts);
        Self { periods }
    }

    /// Terms 5 through 10 of the European Parliament.
    pub fn european_parliament() -> Self {
        let periods = TERM_STARTS
            .iter()
            .filter_map(|&(term, (y, m, d))| {
                NaiveDate::from_ymd_opt(y, m, d).map(|starts| TermPeriod { term, starts })
            })
            .collect();
        Self::new(periods)
    }

    /// Term in office on `date`.
    pub fn term_for(&self, date: NaiveDate) -> Option<u32> {
        self.periods
            .iter()
            .rev()
            .find(|p| p.starts <= date)
            .map(|p| p.term)
    }

    pub fn periods(&self) -> &[TermPeriod] {
        &self.periods
    }
}

impl Default for TermTable {
    fn default() -> Self {
        Self::european_parliament()
    }
}

// ---------------------------------------------------------------------------
// Term correction
// ---------------------------------------------------------------------------

/// Outcome of a term correction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correction {
    /// The URL with its term token rewritten.
    Rewritten(Url),
    /// The URL already carries the right term; nothing to retry.
    AlreadyCorrect,
}

/// Rewrite the term number of `url` to the term in office on its sitting date.
pub fn correct_term(url: &Url, table: &TermTable) -> Result<Correction, CrawlError> {
    use chrono::Datelike;

    let raw = url.as_str();
    let token = TermToken::parse(raw).ok_or_else(|| CrawlError::NoTermToken {
        url: raw.to_string(),
    })?;

    let term = table
        .term_for(token.date)
        .ok_or_else(|| CrawlError::UnmappedYear {
            url: raw.to_string(),
            year: token.date.year(),
        })?;

    if term == token.term {
        return Ok(Correction::AlreadyCorrect);
    }

    let rewritten = token.rewrite(raw, term);
    let corrected = Url::parse(&rewritten).map_err(|_| CrawlError::NoTermToken {
        url: raw.to_string(),
    })?;
    Ok(Correction::Rewritten(corrected))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = "https://www.europarl.europa.eu/doceo/document/TA-5-1999-07-21-TOC_NL.html";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn derive_seed_content_url() {
        let content = derive_content_url(&url(SEED)).unwrap();
        assert_eq!(
            content.as_str(),
            "https://www.europarl.europa.eu/doceo/document/TA-5-1999-07-21_NL.html"
        );
    }

    #[test]
    fn strip_removes_only_the_marker() {
        let toc_urls = [
            SEED,
            "https://www.europarl.europa.eu/doceo/document/TA-9-2023-12-14-TOC_NL.html",
            "https://www.europarl.europa.eu/doceo/document/TA-6-2004-07-22-TOC_EN.html",
            "https://example.test/TOC/TA-7-2010-01-01-TOC_NL.htm",
        ];

        for toc in toc_urls {
            let stripped = strip_toc_marker(toc).unwrap();
            assert_eq!(stripped.len(), toc.len() - TOC_MARKER.len());
            assert_eq!(stripped, toc.replacen("-TOC_", "_", 1));
            // Second application is a no-op.
            assert_eq!(strip_toc_marker(&stripped), None);
        }
    }

    #[test]
    fn derive_without_marker_is_surfaced() {
        let content = url("https://www.europarl.europa.eu/doceo/document/TA-5-1999-07-21_NL.html");
        assert!(!is_toc_url(&content));
        assert_eq!(
            derive_content_url(&content),
            Err(CrawlError::MissingTocMarker {
                url: content.to_string()
            })
        );
    }

    #[test]
    fn term_token_parses() {
        let token = TermToken::parse(SEED).unwrap();
        assert_eq!(token.term, 5);
        assert_eq!(token.date, NaiveDate::from_ymd_opt(1999, 7, 21).unwrap());

        assert!(TermToken::parse("https://example.test/TA-5-1999-13-40-TOC_NL.html").is_none());
        assert!(TermToken::parse("https://example.test/index.html").is_none());
    }

    #[test]
    fn term_table_ranges() {
        let table = TermTable::european_parliament();
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        assert_eq!(table.term_for(date(1999, 7, 19)), None);
        assert_eq!(table.term_for(date(1999, 7, 21)), Some(5));
        assert_eq!(table.term_for(date(2002, 11, 29)), Some(5));
        assert_eq!(table.term_for(date(2004, 5, 6)), Some(5));
        assert_eq!(table.term_for(date(2004, 7, 22)), Some(6));
        assert_eq!(table.term_for(date(2012, 3, 1)), Some(7));
        assert_eq!(table.term_for(date(2019, 4, 18)), Some(8));
        assert_eq!(table.term_for(date(2020, 1, 15)), Some(9));
        assert_eq!(table.term_for(date(2025, 2, 13)), Some(10));
    }

    #[test]
    fn term_table_sorts_periods() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let table = TermTable::new(vec![
            TermPeriod { term: 2, starts: date(2000, 1, 1) },
            TermPeriod { term: 1, starts: date(1990, 1, 1) },
        ]);
        assert_eq!(table.periods()[0].term, 1);
        assert_eq!(table.term_for(date(1995, 6, 1)), Some(1));
    }

    #[test]
    fn correct_wrong_term_from_year() {
        let table = TermTable::default();
        let wrong = url("https://www.europarl.europa.eu/doceo/document/TA-0-2002-11-29-TOC_NL.html");
        assert_eq!(
            correct_term(&wrong, &table),
            Ok(Correction::Rewritten(url(
                "https://www.europarl.europa.eu/doceo/document/TA-5-2002-11-29-TOC_NL.html"
            )))
        );
    }

    #[test]
    fn correction_changes_only_the_term_token() {
        let table = TermTable::default();
        let cases = [
            ("TA-1-2005-03-10-TOC_NL.html", "TA-6-2005-03-10-TOC_NL.html"),
            ("TA-6-2010-06-16_NL.html", "TA-7-2010-06-16_NL.html"),
            ("TA-0-2016-02-25-TOC_NL.html", "TA-8-2016-02-25-TOC_NL.html"),
            ("TA-8-2021-09-16-TOC_NL.html", "TA-9-2021-09-16-TOC_NL.html"),
            ("TA-9-2024-10-10-TOC_NL.html", "TA-10-2024-10-10-TOC_NL.html"),
        ];

        for (input, expected) in cases {
            let base = "https://www.europarl.europa.eu/doceo/document/";
            let got = correct_term(&url(&format!("{base}{input}")), &table).unwrap();
            assert_eq!(got, Correction::Rewritten(url(&format!("{base}{expected}"))));
        }
    }

    #[test]
    fn correct_term_is_noop_when_right() {
        let table = TermTable::default();
        assert_eq!(correct_term(&url(SEED), &table), Ok(Correction::AlreadyCorrect));
    }

    #[test]
    fn unmapped_year_is_distinct_from_not_found() {
        let table = TermTable::default();
        let old = url("https://www.europarl.europa.eu/doceo/document/TA-4-1998-05-14-TOC_NL.html");
        assert_eq!(
            correct_term(&old, &table),
            Err(CrawlError::UnmappedYear {
                url: old.to_string(),
                year: 1998
            })
        );
    }

    #[test]
    fn correct_term_without_token() {
        let table = TermTable::default();
        let other = url("https://www.europarl.europa.eu/doceo/document/index_NL.html");
        assert!(matches!(
            correct_term(&other, &table),
            Err(CrawlError::NoTermToken { .. })
        ));
    }
}
