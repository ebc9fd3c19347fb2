//! Catalog record types.

use serde::{Deserialize, Serialize};

/// One candidate record returned by a catalog search. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMatch {
    /// External id of the record in the catalog.
    pub id: i64,
    /// Series title the record belongs to.
    pub title: String,
    /// Issue number as the catalog reports it; may be absent or non-numeric.
    #[serde(default)]
    pub issue_number: Option<String>,
    /// Story title of the individual issue, when the catalog has one.
    #[serde(default)]
    pub issue_title: Option<String>,
    /// In-store date, `YYYY-MM-DD`. Preferred over `cover_date` when present.
    #[serde(default)]
    pub store_date: Option<String>,
    /// Cover date, `YYYY-MM-DD`.
    #[serde(default)]
    pub cover_date: Option<String>,
    /// Issue description; may contain HTML markup.
    #[serde(default)]
    pub summary: Option<String>,
    /// Creator credits, flat list of name/role pairs.
    #[serde(default)]
    pub credits: Vec<CreditEntry>,
    /// Publisher name, when known.
    #[serde(default)]
    pub publisher: Option<String>,
    /// Page count, when known.
    #[serde(default)]
    pub page_count: Option<u32>,
    /// Public detail page for the record.
    #[serde(default)]
    pub site_detail_url: Option<String>,
}

impl CatalogMatch {
    /// Publication date to use, preferring the store date.
    pub fn publication_date(&self) -> Option<&str> {
        self.store_date.as_deref().or(self.cover_date.as_deref())
    }

    /// Publication year parsed from the preferred date, if parseable.
    pub fn publication_year(&self) -> Option<i32> {
        let date = self.publication_date()?;
        date.split('-').next()?.parse().ok()
    }
}

/// One creator credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditEntry {
    pub name: String,
    /// Role string from the catalog; may list several roles comma-separated.
    pub role: String,
}

impl CreditEntry {
    /// Whether this credit carries the given role. Catalog role fields can be
    /// compound ("writer, cover"), so each segment is compared separately.
    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .split(',')
            .any(|r| r.trim().eq_ignore_ascii_case(role))
    }
}
