//! Cache persistence integration tests.
//!
//! These tests reopen the data directory the way a restarted process would
//! and check that finished work is reused, interrupted work is redone, and a
//! half-written snapshot never corrupts the index.

use std::fs;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use arxivist_core::{
    testing::Harness, AssetClass, AssetStatus, EnqueueRequest, PdfAsset, PdfIndex, TaskStatus,
    TranslateIndex,
};

async fn translate(harness: &Harness, paper_id: &str) -> arxivist_core::Task {
    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id(paper_id))
        .unwrap();
    let done = harness.wait_for_terminal(&task.task_id).await;
    harness.wait_idle().await;
    done
}

#[tokio::test]
async fn test_finished_work_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let harness = Harness::new(temp_dir.path());
        let done = translate(&harness, "p1").await;
        assert_eq!(done.status, TaskStatus::Succeeded);
    }

    let restarted = Harness::new(temp_dir.path());
    assert!(restarted.pdf_index.get_ready("p1").is_some());
    assert!(restarted.translate_index.get_ready("p1").is_some());

    let task = restarted
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id("p1"))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Succeeded);
    assert_eq!(restarted.translator.translate_count().await, 0);
    assert_eq!(restarted.fetcher.fetch_count().await, 0);
}

#[tokio::test]
async fn test_snapshot_shape_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let harness = Harness::new(temp_dir.path());
    translate(&harness, "p1").await;

    let raw = fs::read_to_string(harness.layout.translate_index_path()).unwrap();
    let snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(snapshot["version"], 1);
    assert!(snapshot["updated_at"].is_string());
    let record = &snapshot["assets"]["p1"];
    assert_eq!(record["status"], "READY");
    assert_eq!(record["service"], "bing");
    assert_eq!(record["threads"], 4);
    assert!(record["sha256"].as_str().unwrap().len() == 64);
}

#[tokio::test]
async fn test_deleted_artifact_forces_slow_path() {
    let temp_dir = TempDir::new().unwrap();
    let harness = Harness::new(temp_dir.path());
    translate(&harness, "p1").await;

    fs::remove_file(harness.layout.mono_pdf_path("p1")).unwrap();
    assert!(harness.translate_index.get_ready("p1").is_none());

    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id("p1"))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    let done = harness.wait_for_terminal(&task.task_id).await;
    assert_eq!(done.status, TaskStatus::Succeeded);
    assert!(harness.layout.mono_pdf_path("p1").exists());
    assert_eq!(harness.translator.translate_count().await, 2);
    // the raw PDF was still there
    assert_eq!(harness.fetcher.fetch_count().await, 1);
}

#[tokio::test]
async fn test_interrupted_snapshot_write_keeps_previous_state() {
    let temp_dir = TempDir::new().unwrap();
    {
        let harness = Harness::new(temp_dir.path());
        translate(&harness, "p1").await;

        // a crash mid-write leaves only a partial temp file behind
        let index_path = harness.layout.pdf_index_path();
        let mut stray = index_path.clone().into_os_string();
        stray.push(".4242.tmp");
        fs::write(&stray, br#"{"version":1,"assets":{"p1":{"paper_"#).unwrap();
    }

    let pdf_index = PdfIndex::open(temp_dir.path().join("pdf_cache.json"));
    let asset = pdf_index.get("p1").unwrap();
    assert_eq!(asset.status, AssetStatus::Ready);
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("translate_cache.json"), b"{ not json").unwrap();

    let index = TranslateIndex::open(temp_dir.path().join("translate_cache.json"));
    assert!(index.is_empty());

    let harness = Harness::new(temp_dir.path());
    let done = translate(&harness, "p1").await;
    assert_eq!(done.status, TaskStatus::Succeeded);

    let reopened = TranslateIndex::open(temp_dir.path().join("translate_cache.json"));
    assert_eq!(reopened.len(), 1);
}

#[tokio::test]
async fn test_in_progress_record_from_crashed_run_is_redone() {
    let temp_dir = TempDir::new().unwrap();
    {
        let index = PdfIndex::open(temp_dir.path().join("pdf_cache.json"));
        let mut asset = PdfAsset::new(
            "p1",
            "https://arxiv.org/pdf/p1",
            temp_dir.path().join("raw").join("p1.pdf"),
        );
        asset.mark_in_progress();
        index.upsert(asset);
    }

    let harness = Harness::new(temp_dir.path());
    assert_eq!(
        harness.pdf_index.get("p1").unwrap().status,
        AssetStatus::InProgress
    );

    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::download("s").with_paper_id("p1"))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    let done = harness.wait_for_terminal(&task.task_id).await;

    assert_eq!(done.status, TaskStatus::Succeeded);
    assert_eq!(harness.pdf_index.get("p1").unwrap().status, AssetStatus::Ready);
    assert_eq!(harness.fetcher.fetch_count().await, 1);
}

#[tokio::test]
async fn test_in_progress_record_from_crashed_run_can_be_deleted() {
    let temp_dir = TempDir::new().unwrap();
    let raw = temp_dir.path().join("raw").join("p1.pdf");
    {
        let index = PdfIndex::open(temp_dir.path().join("pdf_cache.json"));
        let mut asset = PdfAsset::new("p1", "https://arxiv.org/pdf/p1", raw.clone());
        asset.mark_in_progress();
        index.upsert(asset);
    }
    fs::create_dir_all(raw.parent().unwrap()).unwrap();
    fs::write(&raw, b"%PDF-partial").unwrap();

    let harness = Harness::new(temp_dir.path());
    assert!(!harness.orchestrator.locks().is_held("pdf:p1"));

    assert!(harness
        .orchestrator
        .delete_asset(AssetClass::Pdf, "p1", true)
        .unwrap());
    assert!(harness.pdf_index.get("p1").is_none());
    assert!(!raw.exists());

    let reopened = PdfIndex::open(temp_dir.path().join("pdf_cache.json"));
    assert!(reopened.get("p1").is_none());
}

#[tokio::test]
async fn test_stale_lock_from_crashed_run_is_reclaimed() {
    let temp_dir = TempDir::new().unwrap();
    let harness = Harness::new(temp_dir.path());

    let marker = harness.orchestrator.locks().marker_path("pdf:p1");
    fs::create_dir_all(marker.parent().unwrap()).unwrap();
    fs::write(&marker, br#"{"key":"pdf:p1","pid":1}"#).unwrap();
    let three_hours_ago = SystemTime::now() - Duration::from_secs(3 * 3600);
    fs::File::options()
        .write(true)
        .open(&marker)
        .unwrap()
        .set_modified(three_hours_ago)
        .unwrap();

    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::download("s").with_paper_id("p1"))
        .unwrap();
    let done = harness.wait_for_terminal(&task.task_id).await;

    assert_eq!(done.status, TaskStatus::Succeeded);
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_deleting_asset_forgets_it_across_restart() {
    let temp_dir = TempDir::new().unwrap();
    {
        let harness = Harness::new(temp_dir.path());
        translate(&harness, "p1").await;
        assert!(harness
            .orchestrator
            .delete_asset(AssetClass::Translate, "p1", true)
            .unwrap());
    }

    let restarted = Harness::new(temp_dir.path());
    assert!(restarted.translate_index.get("p1").is_none());
    assert!(restarted.pdf_index.get_ready("p1").is_some());
}
