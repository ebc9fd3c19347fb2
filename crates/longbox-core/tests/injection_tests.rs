//! Integration tests for the injection pipeline public interface.
//!
//! These drive the engine and job manager through the crate's public API
//! against real cbz archives on disk, with a scripted catalog in place of
//! the network client.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use longbox_core::{
    ArchiveAdapter, CancellationToken, CatalogClient, CatalogMatch, CreditEntry, InjectionEngine,
    InjectorConfig, Issue, JobManager, JobSpec, JobState, LongboxError, Result, SqliteVolumeStore,
    Volume,
};

/// Catalog stand-in that answers from a fixed record list.
struct FixtureCatalog {
    records: Vec<CatalogMatch>,
    delay: Duration,
}

#[async_trait]
impl CatalogClient for FixtureCatalog {
    async fn search(&self, _series: &str, number: &str) -> Result<Vec<CatalogMatch>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.issue_number.as_deref() == Some(number))
            .cloned()
            .collect())
    }
}

fn record(id: i64, number: &str) -> CatalogMatch {
    CatalogMatch {
        id,
        title: "Batgirl".to_string(),
        issue_number: Some(number.to_string()),
        issue_title: Some(format!("Chapter {number}")),
        store_date: Some("2019-07-24".to_string()),
        cover_date: Some("2019-09-01".to_string()),
        summary: Some("<p>Gotham after dark &amp; before dawn.</p>".to_string()),
        credits: vec![
            CreditEntry {
                name: "Cecil Castellucci".to_string(),
                role: "writer".to_string(),
            },
            CreditEntry {
                name: "Carmine Di Giandomenico".to_string(),
                role: "penciler, inker".to_string(),
            },
        ],
        publisher: Some("DC Comics".to_string()),
        page_count: Some(24),
        site_detail_url: None,
    }
}

fn write_cbz(path: &Path, pages: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).expect("create cbz");
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in pages {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
}

/// Build a comics root with one volume whose issues are `numbers`,
/// one single-page cbz per issue.
fn create_test_library(numbers: &[&str]) -> (TempDir, Arc<SqliteVolumeStore>) {
    let root = TempDir::new().expect("temp comics root");
    let folder = root.path().join("Batgirl (2019)");
    std::fs::create_dir_all(&folder).unwrap();

    let issues: Vec<Issue> = numbers
        .iter()
        .enumerate()
        .map(|(index, number)| {
            let file_name = format!("Batgirl {number}.cbz");
            write_cbz(&folder.join(&file_name), &[("page01.jpg", b"jpegdata")]);
            Issue {
                index,
                number: number.to_string(),
                files: vec![PathBuf::from("Batgirl (2019)").join(file_name)],
            }
        })
        .collect();

    let store = Arc::new(SqliteVolumeStore::in_memory().unwrap());
    store
        .store_volume(&Volume {
            id: 42,
            folder: "Batgirl (2019)".to_string(),
            issues,
        })
        .unwrap();
    (root, store)
}

fn engine(
    root: &TempDir,
    store: Arc<SqliteVolumeStore>,
    records: Vec<CatalogMatch>,
    delay: Duration,
) -> InjectionEngine {
    InjectionEngine::new(
        store,
        Arc::new(FixtureCatalog { records, delay }),
        InjectorConfig::new(root.path()),
    )
}

async fn wait_terminal(manager: &JobManager, job_id: &str) -> longbox_core::Job {
    for _ in 0..300 {
        let job = manager.get_status(job_id).unwrap();
        if job.state.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never finished");
}

#[tokio::test]
async fn test_volume_injection_writes_full_documents() {
    let (root, store) = create_test_library(&["1", "2"]);
    let engine = engine(&root, store, vec![record(900, "1"), record(901, "2")], Duration::ZERO);

    let cancel = CancellationToken::new();
    let results = engine.inject_volume(42, &cancel, |_| {}).await.unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));

    let adapter = ArchiveAdapter::new(None);
    let archive = root.path().join("Batgirl (2019)/Batgirl 2.cbz");
    let bytes = adapter
        .read_member(&archive, "ComicInfo.xml")
        .await
        .unwrap()
        .expect("ComicInfo.xml present");
    let info = longbox_core::comicinfo::read(&bytes).unwrap();

    assert_eq!(info.series, "Batgirl");
    assert_eq!(info.number, "2");
    assert_eq!(info.count, Some(2));
    assert_eq!(info.year, Some(2019));
    assert_eq!(info.writer.as_deref(), Some("Cecil Castellucci"));
    assert_eq!(info.penciller.as_deref(), Some("Carmine Di Giandomenico"));
    assert_eq!(info.inker.as_deref(), Some("Carmine Di Giandomenico"));
    assert_eq!(info.publisher.as_deref(), Some("DC Comics"));
    // HTML markup stripped from the summary.
    let summary = info.summary.unwrap();
    assert!(!summary.contains('<'));
    assert!(summary.contains("Gotham after dark & before dawn."));

    // Original page survives next to the new member.
    assert_eq!(
        adapter.read_member(&archive, "page01.jpg").await.unwrap(),
        Some(b"jpegdata".to_vec())
    );
}

#[tokio::test]
async fn test_partial_failure_leaves_unmatched_archive_untouched() {
    let (root, store) = create_test_library(&["1", "2", "Annual 1"]);
    // The catalog knows issues 1 and 2 but not the annual.
    let engine = engine(&root, store, vec![record(900, "1"), record(901, "2")], Duration::ZERO);

    let annual = root.path().join("Batgirl (2019)/Batgirl Annual 1.cbz");
    let before = std::fs::read(&annual).unwrap();

    let cancel = CancellationToken::new();
    let results = engine.inject_volume(42, &cancel, |_| {}).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(results[1].success);
    assert!(!results[2].success);
    let message = results[2].message.as_deref().unwrap();
    assert!(message.contains("no match"), "unexpected message: {message}");

    // The unmatched archive is byte-identical.
    assert_eq!(std::fs::read(&annual).unwrap(), before);
}

#[tokio::test]
async fn test_reinjection_is_idempotent() {
    let (root, store) = create_test_library(&["1"]);
    let engine = engine(&root, store, vec![record(900, "1")], Duration::ZERO);
    let archive = root.path().join("Batgirl (2019)/Batgirl 1.cbz");

    let cancel = CancellationToken::new();
    engine.inject_volume(42, &cancel, |_| {}).await.unwrap();
    engine.inject_volume(42, &cancel, |_| {}).await.unwrap();

    let adapter = ArchiveAdapter::new(None);
    let members = adapter.list_members(&archive).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(
        members
            .iter()
            .filter(|m| m.eq_ignore_ascii_case("comicinfo.xml"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_job_lifecycle_to_completed() {
    let (_root, store) = create_test_library(&["1", "2"]);
    let manager = JobManager::new(engine(
        &_root,
        store,
        vec![record(900, "1"), record(901, "2")],
        Duration::ZERO,
    ));

    let job_id = manager.submit(JobSpec::Volume { volume_id: 42 });
    let job = wait_terminal(&manager, &job_id).await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.results.len(), 2);
    assert!(job.results.iter().all(|r| r.success));
    assert_eq!(job.issues_done(), 2);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_some());
    assert_eq!(manager.list_jobs().len(), 1);
}

#[tokio::test]
async fn test_job_with_unknown_volume_fails() {
    let (_root, store) = create_test_library(&[]);
    let manager = JobManager::new(engine(&_root, store, vec![], Duration::ZERO));

    let job_id = manager.submit(JobSpec::Volume { volume_id: 7777 });
    let job = wait_terminal(&manager, &job_id).await;

    assert_eq!(job.state, JobState::Failed);
    assert!(job.error.is_some());
    assert!(job.results.is_empty());
}

#[tokio::test]
async fn test_job_cancellation() {
    let (_root, store) = create_test_library(&["1", "2", "3", "4", "5"]);
    let records = (1i64..=5).map(|i| record(900 + i, &i.to_string())).collect();
    let manager = JobManager::new(engine(&_root, store, records, Duration::from_millis(120)));

    let job_id = manager.submit(JobSpec::Volume { volume_id: 42 });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.cancel(&job_id).unwrap());

    let job = wait_terminal(&manager, &job_id).await;
    assert_eq!(job.state, JobState::Cancelled);
    assert!(job.results.len() < 5, "cancellation should stop the batch early");
    assert!(!manager.cancel(&job_id).unwrap());
}

#[tokio::test]
async fn test_issue_set_job_only_touches_selected_issues() {
    let (root, store) = create_test_library(&["1", "2", "3"]);
    let records = (1i64..=3).map(|i| record(900 + i, &i.to_string())).collect();
    let manager = JobManager::new(engine(&root, store, records, Duration::ZERO));

    let job_id = manager.submit(JobSpec::IssueSet {
        volume_id: 42,
        issue_indices: vec![0, 2],
    });
    let job = wait_terminal(&manager, &job_id).await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.results.len(), 2);
    assert_eq!(job.issues_total, Some(2));

    let adapter = ArchiveAdapter::new(None);
    let untouched = root.path().join("Batgirl (2019)/Batgirl 2.cbz");
    assert!(!adapter.has_comic_info(&untouched).await.unwrap());
}

#[tokio::test]
async fn test_issue_set_job_survives_out_of_range_index() {
    let (_root, store) = create_test_library(&["1", "2", "3"]);
    let records = (1i64..=3).map(|i| record(900 + i, &i.to_string())).collect();
    let manager = JobManager::new(engine(&_root, store, records, Duration::ZERO));

    let job_id = manager.submit(JobSpec::IssueSet {
        volume_id: 42,
        issue_indices: vec![0, 99, 2],
    });
    let job = wait_terminal(&manager, &job_id).await;

    // A bad index fails that entry only; the rest of the set still runs.
    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.results.len(), 3);
    assert!(job.results[0].success);
    assert!(!job.results[1].success);
    assert!(job.results[1].message.as_deref().unwrap_or("").contains("99"));
    assert!(job.results[2].success);
    assert!(job.error.is_none());
}

#[tokio::test]
async fn test_corrupt_archive_is_an_issue_scoped_failure() {
    let (root, store) = create_test_library(&["1", "2"]);
    let corrupt = root.path().join("Batgirl (2019)/Batgirl 1.cbz");
    std::fs::write(&corrupt, b"this is not a zip archive").unwrap();

    let engine = engine(&root, store, vec![record(900, "1"), record(901, "2")], Duration::ZERO);
    let cancel = CancellationToken::new();
    let results = engine.inject_volume(42, &cancel, |_| {}).await.unwrap();

    assert!(!results[0].success);
    assert!(results[1].success, "one bad archive must not stop the batch");
    // The corrupt file itself is left as it was.
    assert_eq!(std::fs::read(&corrupt).unwrap(), b"this is not a zip archive");
}

#[tokio::test]
async fn test_transport_failure_records_no_match() {
    struct DownCatalog;

    #[async_trait]
    impl CatalogClient for DownCatalog {
        async fn search(&self, _series: &str, _number: &str) -> Result<Vec<CatalogMatch>> {
            Err(LongboxError::Network {
                message: "connection refused".to_string(),
                cause: None,
            })
        }
    }

    let (root, store) = create_test_library(&["1"]);
    let engine = InjectionEngine::new(
        store,
        Arc::new(DownCatalog),
        InjectorConfig::new(root.path()),
    );

    let cancel = CancellationToken::new();
    let results = engine.inject_volume(42, &cancel, |_| {}).await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(results[0].message.as_deref().unwrap().contains("no match"));
}
