//! ComicVine implementation of the catalog client.
//!
//! Issue search against the ComicVine API with the service's own etiquette:
//! a fixed delay between requests and a short retry on 403 (the API throttles
//! aggressive clients that way rather than with 429).

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{CatalogMatch, CreditEntry};
use super::CatalogClient;
use crate::config::NetworkConfig;
use crate::{LongboxError, Result};

pub struct ComicVineClient {
    client: Client,
    api_base: String,
    api_key: String,
    last_request: Mutex<Option<Instant>>,
}

impl ComicVineClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base(NetworkConfig::COMICVINE_API_BASE, api_key)
    }

    /// Build a client against a custom API base (used for test servers).
    pub fn with_base(api_base: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(NetworkConfig::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            last_request: Mutex::new(None),
        })
    }

    /// Enforce the inter-request delay across all callers of this client.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < NetworkConfig::CATALOG_RATE_DELAY {
                tokio::time::sleep(NetworkConfig::CATALOG_RATE_DELAY - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// GET with the shared throttle and the 403 retry etiquette, parsing the
    /// body as JSON on success.
    async fn get_payload<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            self.throttle().await;
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status.as_u16() == 403 && attempt < NetworkConfig::CATALOG_RETRY_ATTEMPTS {
                attempt += 1;
                warn!("Catalog returned 403, retrying (attempt {attempt})");
                tokio::time::sleep(NetworkConfig::CATALOG_RETRY_DELAY).await;
                continue;
            }

            if !status.is_success() {
                return Err(LongboxError::Network {
                    message: format!("catalog {what} failed with HTTP {status}"),
                    cause: None,
                });
            }

            return Ok(response.json().await?);
        }
    }

    async fn get_search(&self, query: &str) -> Result<SearchResponse> {
        let url = format!(
            "{}/search/?api_key={}&format=json&resources=issue&limit={}&query={}",
            self.api_base,
            self.api_key,
            NetworkConfig::SEARCH_LIMIT,
            urlencoding::encode(query)
        );

        let body: SearchResponse = self.get_payload(&url, "search").await?;
        if body.status_code != 1 {
            return Err(api_error("search", body.error.as_deref()));
        }
        Ok(body)
    }

    async fn get_detail(&self, record_id: i64) -> Result<IssueRecord> {
        let url = format!(
            "{}/issue/4000-{}/?api_key={}&format=json",
            self.api_base, record_id, self.api_key
        );

        let body: DetailResponse = self.get_payload(&url, "issue lookup").await?;
        if body.status_code != 1 {
            return Err(api_error("issue lookup", body.error.as_deref()));
        }
        Ok(serde_json::from_value(body.results)?)
    }
}

fn api_error(what: &str, error: Option<&str>) -> LongboxError {
    LongboxError::Network {
        message: format!("catalog {what} error: {}", error.unwrap_or("unknown")),
        cause: None,
    }
}

#[async_trait]
impl CatalogClient for ComicVineClient {
    async fn search(&self, series_title: &str, issue_number: &str) -> Result<Vec<CatalogMatch>> {
        let query = format!("{series_title} {issue_number}");
        debug!("Searching catalog for {query:?}");

        let body = self.get_search(&query).await?;
        let matches = body
            .results
            .into_iter()
            .map(CatalogMatch::from)
            .collect::<Vec<_>>();

        debug!("Catalog returned {} candidate(s) for {query:?}", matches.len());
        Ok(matches)
    }

    /// Search responses omit credits, publisher, and page count; the per-issue
    /// endpoint carries the full record.
    async fn fetch_detail(&self, record_id: i64) -> Result<Option<CatalogMatch>> {
        debug!("Fetching catalog detail for record {record_id}");
        let record = self.get_detail(record_id).await?;
        Ok(Some(record.into()))
    }
}

// Wire types for the ComicVine JSON envelope.

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status_code: i32,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<IssueRecord>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    status_code: i32,
    #[serde(default)]
    error: Option<String>,
    // On an error envelope this is `[]` rather than an object, so it is kept
    // raw until the status code has been checked.
    #[serde(default)]
    results: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct IssueRecord {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    issue_number: Option<String>,
    #[serde(default)]
    cover_date: Option<String>,
    #[serde(default)]
    store_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    site_detail_url: Option<String>,
    #[serde(default)]
    volume: Option<VolumeRef>,
    #[serde(default)]
    publisher: Option<PublisherRef>,
    #[serde(default)]
    page_count: Option<u32>,
    #[serde(default)]
    person_credits: Vec<PersonCredit>,
}

#[derive(Debug, Deserialize)]
struct VolumeRef {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublisherRef {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PersonCredit {
    name: String,
    #[serde(default)]
    role: Option<String>,
}

impl From<IssueRecord> for CatalogMatch {
    fn from(record: IssueRecord) -> Self {
        CatalogMatch {
            id: record.id,
            title: record
                .volume
                .and_then(|v| v.name)
                .or_else(|| record.name.clone())
                .unwrap_or_default(),
            issue_number: record.issue_number,
            issue_title: record.name,
            store_date: record.store_date,
            cover_date: record.cover_date,
            summary: record.description,
            credits: record
                .person_credits
                .into_iter()
                .map(|c| CreditEntry {
                    name: c.name,
                    role: c.role.unwrap_or_default(),
                })
                .collect(),
            publisher: record.publisher.and_then(|p| p.name),
            page_count: record.page_count,
            site_detail_url: record.site_detail_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_record_mapping() {
        let json = r#"{
            "id": 912345,
            "name": "Old Enemies",
            "issue_number": "1",
            "cover_date": "2019-08-01",
            "store_date": "2019-06-12",
            "description": "<p>Barbara is back.</p>",
            "site_detail_url": "https://comicvine.gamespot.com/issue/4000-912345/",
            "volume": {"name": "Batgirl"},
            "person_credits": [{"name": "Jane Doe", "role": "writer, cover"}]
        }"#;
        let record: IssueRecord = serde_json::from_str(json).unwrap();
        let m = CatalogMatch::from(record);

        assert_eq!(m.title, "Batgirl");
        assert_eq!(m.issue_number.as_deref(), Some("1"));
        assert_eq!(m.issue_title.as_deref(), Some("Old Enemies"));
        assert_eq!(m.publication_year(), Some(2019));
        assert_eq!(m.credits.len(), 1);
        assert!(m.credits[0].has_role("writer"));
    }

    #[test]
    fn test_detail_record_mapping() {
        let json = r#"{
            "status_code": 1,
            "results": {
                "id": 912345,
                "name": "Old Enemies",
                "issue_number": "1",
                "cover_date": "2019-08-01",
                "volume": {"name": "Batgirl"},
                "publisher": {"name": "DC Comics"},
                "page_count": 24,
                "person_credits": [
                    {"name": "Jane Doe", "role": "writer"},
                    {"name": "John Roe", "role": "penciler, inker"}
                ]
            }
        }"#;
        let body: DetailResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.status_code, 1);
        let record: IssueRecord = serde_json::from_value(body.results).unwrap();
        let m = CatalogMatch::from(record);

        assert_eq!(m.publisher.as_deref(), Some("DC Comics"));
        assert_eq!(m.page_count, Some(24));
        assert_eq!(m.credits.len(), 2);
        assert!(m.credits[1].has_role("inker"));
    }

    #[test]
    fn test_detail_error_envelope_carries_empty_results() {
        // The API sends `results: []` alongside a non-ok status code.
        let json = r#"{"status_code": 101, "error": "Object Not Found", "results": []}"#;
        let body: DetailResponse = serde_json::from_str(json).unwrap();
        assert_ne!(body.status_code, 1);
        assert_eq!(body.error.as_deref(), Some("Object Not Found"));
    }

    #[test]
    fn test_envelope_error_field() {
        let json = r#"{"status_code": 100, "error": "Invalid API Key", "results": []}"#;
        let body: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.status_code, 100);
        assert_eq!(body.error.as_deref(), Some("Invalid API Key"));
    }
}
