//! Issue resolver: pick the best catalog record for one issue.
//!
//! The query is built from the volume's folder name; candidate selection is
//! exact issue-number match first, then closest publication year, then catalog
//! order. Every step is deterministic -- the same volume and catalog response
//! always select the same candidate.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{CatalogClient, CatalogMatch};
use crate::config::InjectorConfig;
use crate::library::Volume;
use crate::{LongboxError, Result};

/// Policy for candidates still tied after the year heuristic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Take the first candidate in catalog order. The default: ties are
    /// common (reprints, variant listings) and first-in-order is stable.
    #[default]
    FirstCandidate,
    /// Treat remaining ties as an error (`AmbiguousMatch`).
    Strict,
}

/// Series title and inferred year derived from a volume folder name.
///
/// The comics-root prefix is stripped, then the last path component is taken;
/// a trailing `(YYYY)` marker becomes the inferred year and is removed from
/// the title ("DC Comics/Batgirl (2019)" -> "Batgirl", 2019).
pub fn series_from_folder(folder: &str, comics_root: &Path) -> (String, Option<i32>) {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let year_re = YEAR.get_or_init(|| Regex::new(r"\s*\((\d{4})\)\s*$").expect("valid regex"));

    let root = comics_root.to_string_lossy();
    let stripped = folder
        .strip_prefix(root.as_ref())
        .unwrap_or(folder)
        .trim_start_matches(['/', '\\']);

    let name = stripped
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(stripped)
        .trim();

    let year = year_re
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let title = year_re.replace(name, "").trim().to_string();

    (title, year)
}

/// Resolve the best catalog match for `issue_index` of `volume`.
///
/// Zero candidates -- and any catalog transport failure -- resolve to
/// `NoMatch`; a search that cannot be served degrades to "nothing found"
/// rather than aborting the batch.
pub async fn resolve(
    volume: &Volume,
    issue_index: usize,
    catalog: &dyn CatalogClient,
    config: &InjectorConfig,
) -> Result<CatalogMatch> {
    let issue = volume
        .issue(issue_index)
        .ok_or(LongboxError::IssueNotFound {
            volume_id: volume.id,
            issue_index,
        })?;

    let (series, inferred_year) = series_from_folder(&volume.folder, &config.comics_root);

    let candidates = match catalog.search(&series, &issue.number).await {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(
                "Catalog search failed for {series} #{}: {e}; treating as no match",
                issue.number
            );
            vec![]
        }
    };

    if candidates.is_empty() {
        return Err(LongboxError::NoMatch {
            series,
            number: issue.number.clone(),
        });
    }

    let selected = select_candidate(candidates, &issue.number, inferred_year, config.tie_break)
        .map_err(|tied| LongboxError::AmbiguousMatch {
            series: series.clone(),
            number: issue.number.clone(),
            candidates: tied,
        })?;

    debug!(
        "Resolved {series} #{} to catalog record {}",
        issue.number, selected.id
    );

    // Pull the full record where the catalog has one; a failed detail lookup
    // falls back to the search-level record rather than losing the match.
    match catalog.fetch_detail(selected.id).await {
        Ok(Some(detail)) => Ok(detail),
        Ok(None) => Ok(selected),
        Err(e) => {
            warn!(
                "Catalog detail lookup failed for record {}: {e}; using search result",
                selected.id
            );
            Ok(selected)
        }
    }
}

/// Apply the selection policy. Returns `Err(tied_count)` only under
/// `TieBreak::Strict` with more than one candidate left.
fn select_candidate(
    candidates: Vec<CatalogMatch>,
    issue_number: &str,
    inferred_year: Option<i32>,
    tie_break: TieBreak,
) -> std::result::Result<CatalogMatch, usize> {
    let mut pool = candidates;

    // Step 1: exact issue-number string match narrows the pool.
    let wanted = issue_number.trim();
    let exact: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.issue_number
                .as_deref()
                .map(|n| n.trim().eq_ignore_ascii_case(wanted))
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();
    if !exact.is_empty() && exact.len() < pool.len() {
        pool = keep_indices(pool, &exact);
    }

    // Step 2: closest publication year to the volume's inferred year.
    if let Some(target) = inferred_year {
        let distances: Vec<Option<i64>> = pool
            .iter()
            .map(|c| c.publication_year().map(|y| (i64::from(y) - i64::from(target)).abs()))
            .collect();
        if let Some(best) = distances.iter().filter_map(|d| *d).min() {
            let closest: Vec<usize> = distances
                .iter()
                .enumerate()
                .filter(|(_, d)| **d == Some(best))
                .map(|(i, _)| i)
                .collect();
            if closest.len() < pool.len() {
                pool = keep_indices(pool, &closest);
            }
        }
    }

    // Step 3: remaining ties resolve by catalog order, or error under Strict.
    if pool.len() > 1 && tie_break == TieBreak::Strict {
        return Err(pool.len());
    }
    Ok(pool.into_iter().next().expect("pool is non-empty"))
}

fn keep_indices(pool: Vec<CatalogMatch>, keep: &[usize]) -> Vec<CatalogMatch> {
    pool.into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, c)| c)
        .collect()
}
