//! The canonical metadata document and its synthesis from a catalog record.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogMatch;
use crate::{LongboxError, Result};

/// Fixed Notes value stamped into every generated document.
const NOTES: &str = "Metadata generated by longbox from catalog data";

/// Canonical metadata record embedded into an archive as `ComicInfo.xml`.
///
/// Never partially populated: [`ComicInfo::build`] fails instead of emitting a
/// document without a series title or issue number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComicInfo {
    pub series: String,
    pub number: String,
    pub title: Option<String>,
    /// Issue count of the volume, when the caller knows it.
    pub count: Option<u32>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    /// Raw publication date as the catalog reported it.
    pub cover_date: Option<String>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub writer: Option<String>,
    pub penciller: Option<String>,
    pub inker: Option<String>,
    pub colorist: Option<String>,
    pub letterer: Option<String>,
    pub cover_artist: Option<String>,
    pub editor: Option<String>,
    pub publisher: Option<String>,
    pub web: Option<String>,
    pub page_count: Option<u32>,
    pub language_iso: Option<String>,
    pub format: Option<String>,
    /// External id of the catalog record the document was built from.
    pub source_id: Option<String>,
}

impl ComicInfo {
    /// Synthesize a document from a catalog record and the issue's canonical
    /// number string. Pure; no I/O.
    ///
    /// The issue's own number wins over the catalog's (non-numeric forms like
    /// "Annual 1" are preserved verbatim). Fails with `IncompleteMatch` when
    /// the record has no series title or no usable issue number exists.
    pub fn build(record: &CatalogMatch, issue_number: &str) -> Result<Self> {
        let series = record.title.trim();
        if series.is_empty() {
            return Err(LongboxError::IncompleteMatch {
                reason: "catalog record has no series title".to_string(),
            });
        }

        let number = match issue_number.trim() {
            "" => record
                .issue_number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| LongboxError::IncompleteMatch {
                    reason: "no usable issue number".to_string(),
                })?,
            n => n,
        };

        let mut info = ComicInfo {
            series: series.to_string(),
            number: number.to_string(),
            title: record.issue_title.as_deref().map(clean_text).filter(|t| !t.is_empty()),
            summary: record.summary.as_deref().map(clean_text).filter(|s| !s.is_empty()),
            notes: Some(NOTES.to_string()),
            publisher: record.publisher.clone(),
            web: record.site_detail_url.clone(),
            page_count: record.page_count,
            language_iso: Some("en".to_string()),
            format: Some("Comic".to_string()),
            source_id: Some(record.id.to_string()),
            ..Default::default()
        };

        if let Some(date) = record.publication_date() {
            info.cover_date = Some(date.to_string());
            if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                use chrono::Datelike;
                info.year = Some(parsed.year());
                info.month = Some(parsed.month());
                info.day = Some(parsed.day());
            }
        }

        info.writer = credit_list(record, &["writer"]);
        info.penciller = credit_list(record, &["penciler", "penciller", "artist"]);
        info.inker = credit_list(record, &["inker"]);
        info.colorist = credit_list(record, &["colorist"]);
        info.letterer = credit_list(record, &["letterer"]);
        info.cover_artist = credit_list(record, &["cover"]);
        info.editor = credit_list(record, &["editor"]);

        Ok(info)
    }
}

/// Collect credit names carrying any of the given roles, catalog order kept.
fn credit_list(record: &CatalogMatch, roles: &[&str]) -> Option<String> {
    let names: Vec<&str> = record
        .credits
        .iter()
        .filter(|c| roles.iter().any(|r| c.has_role(r)))
        .map(|c| c.name.as_str())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

/// Strip HTML tags and entities from catalog text, collapse whitespace.
pub(crate) fn clean_text(text: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    static SPACE: OnceLock<Regex> = OnceLock::new();
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"));
    let space = SPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));

    let text = tags.replace_all(text, "");
    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    space.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CreditEntry;

    fn record() -> CatalogMatch {
        CatalogMatch {
            id: 912345,
            title: "Batgirl".into(),
            issue_number: Some("1".into()),
            issue_title: Some("Old Enemies".into()),
            store_date: Some("2019-06-12".into()),
            cover_date: Some("2019-08-01".into()),
            summary: Some("<p>Barbara is back &amp; better.</p>".into()),
            credits: vec![
                CreditEntry {
                    name: "Jane Doe".into(),
                    role: "writer, cover".into(),
                },
                CreditEntry {
                    name: "John Roe".into(),
                    role: "artist".into(),
                },
            ],
            publisher: Some("DC Comics".into()),
            page_count: Some(32),
            site_detail_url: Some("https://example.org/issue/912345".into()),
        }
    }

    #[test]
    fn test_build_full_record() {
        let info = ComicInfo::build(&record(), "1").unwrap();

        assert_eq!(info.series, "Batgirl");
        assert_eq!(info.number, "1");
        assert_eq!(info.title.as_deref(), Some("Old Enemies"));
        assert_eq!(info.year, Some(2019));
        assert_eq!(info.month, Some(6));
        assert_eq!(info.day, Some(12));
        assert_eq!(info.cover_date.as_deref(), Some("2019-06-12"));
        assert_eq!(info.summary.as_deref(), Some("Barbara is back & better."));
        assert_eq!(info.writer.as_deref(), Some("Jane Doe"));
        assert_eq!(info.penciller.as_deref(), Some("John Roe"));
        assert_eq!(info.cover_artist.as_deref(), Some("Jane Doe"));
        assert_eq!(info.inker, None);
        assert_eq!(info.source_id.as_deref(), Some("912345"));
    }

    #[test]
    fn test_issue_number_verbatim() {
        let info = ComicInfo::build(&record(), "Annual 1").unwrap();
        assert_eq!(info.number, "Annual 1");
    }

    #[test]
    fn test_missing_series_is_incomplete() {
        let mut r = record();
        r.title = "  ".into();
        let err = ComicInfo::build(&r, "1").unwrap_err();
        assert!(matches!(err, LongboxError::IncompleteMatch { .. }));
    }

    #[test]
    fn test_missing_number_falls_back_to_catalog() {
        let info = ComicInfo::build(&record(), "").unwrap();
        assert_eq!(info.number, "1");

        let mut r = record();
        r.issue_number = None;
        let err = ComicInfo::build(&r, " ").unwrap_err();
        assert!(matches!(err, LongboxError::IncompleteMatch { .. }));
    }

    #[test]
    fn test_unparseable_date_keeps_raw_string() {
        let mut r = record();
        r.store_date = Some("June 2019".into());
        r.cover_date = None;
        let info = ComicInfo::build(&r, "1").unwrap();
        assert_eq!(info.cover_date.as_deref(), Some("June 2019"));
        assert_eq!(info.year, None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(
            clean_text("<p>Barbara  is\nback</p> &amp; <em>better</em>"),
            "Barbara is back & better"
        );
        assert_eq!(clean_text(""), "");
    }
}
