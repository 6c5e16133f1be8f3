//! Orchestrator lifecycle integration tests.
//!
//! These tests drive tasks through the public API with mock collaborators:
//! PENDING -> RUNNING -> SUCCEEDED | FAILED, or straight to SUCCEEDED on a
//! cache hit, and check the events each session observes.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use arxivist_core::{
    testing::{fixtures, Harness, MockFetcher, MockTranslator},
    AssetStatus, EnqueueRequest, FetchError, Polled, Subscription, TaskEvent, TaskEventType,
    TaskStatus, TranslateError,
};

fn setup() -> (TempDir, Harness) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let harness = Harness::new(temp_dir.path());
    (temp_dir, harness)
}

/// Collect events until one for `task_id` is terminal.
async fn events_until_terminal(sub: &mut Subscription, task_id: &str) -> Vec<TaskEvent> {
    let mut events = Vec::new();
    loop {
        match sub.recv_timeout(Duration::from_secs(5)).await {
            Polled::Event(payload) => {
                let event: TaskEvent =
                    serde_json::from_str(&payload).expect("event payload is a TaskEvent");
                if event.task.task_id != task_id {
                    continue;
                }
                let terminal = event.task.status.is_terminal();
                events.push(event);
                if terminal {
                    return events;
                }
            }
            Polled::KeepAlive => panic!("no terminal event for {} within 5s", task_id),
            Polled::Closed => panic!("subscription closed"),
        }
    }
}

fn types(events: &[TaskEvent]) -> Vec<TaskEventType> {
    events.iter().map(|e| e.event_type).collect()
}

#[tokio::test]
async fn test_new_paper_reaches_exactly_one_terminal_state() {
    let (_dir, harness) = setup();
    let mut sub = harness.orchestrator.subscribe("s1");

    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s1").with_paper_id("2401.00001"))
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);

    let events = events_until_terminal(&mut sub, &task.task_id).await;
    assert_eq!(
        types(&events),
        vec![
            TaskEventType::TaskCreated,
            TaskEventType::TaskStarted,
            TaskEventType::TaskSucceeded,
        ]
    );
    assert_eq!(events[0].task.status, TaskStatus::Pending);
    assert_eq!(events[1].task.status, TaskStatus::Running);
    assert!(events[1].task.progress > 0.0 && events[1].task.progress < 1.0);
    assert_eq!(events[2].task.progress, 1.0);

    harness.wait_idle().await;
    // nothing else arrives for this task
    assert!(sub.try_recv().is_none());
    let stored = harness.orchestrator.get_task(&task.task_id).unwrap();
    assert_eq!(stored, events[2].task);
}

#[tokio::test]
async fn test_failed_task_publishes_failure_once() {
    let (_dir, harness) = setup();
    harness
        .translator
        .set_next_error(TranslateError::process_failed("exit status 2", None))
        .await;
    let mut sub = harness.orchestrator.subscribe("s1");

    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s1").with_paper_id("p1"))
        .unwrap();
    let events = events_until_terminal(&mut sub, &task.task_id).await;

    assert_eq!(
        types(&events),
        vec![
            TaskEventType::TaskCreated,
            TaskEventType::TaskStarted,
            TaskEventType::TaskFailed,
        ]
    );
    let failed = &events[2].task;
    assert_eq!(failed.status, TaskStatus::Failed);
    assert!(failed.error.as_deref().unwrap_or_default().contains("exit status 2"));

    // a later request retries instead of serving the failure
    let retry = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s1").with_paper_id("p1"))
        .unwrap();
    assert_eq!(retry.status, TaskStatus::Pending);
    let done = harness.wait_for_terminal(&retry.task_id).await;
    assert_eq!(done.status, TaskStatus::Succeeded);
}

#[tokio::test]
async fn test_cached_paper_completes_without_worker() {
    let (_dir, harness) = setup();
    let first = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s1").with_paper_id("p1"))
        .unwrap();
    harness.wait_for_terminal(&first.task_id).await;
    harness.wait_idle().await;

    let mut sub = harness.orchestrator.subscribe("s1");
    let a = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s1").with_paper_id("p1"))
        .unwrap();
    let b = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s1").with_paper_id("p1"))
        .unwrap();

    for task in [&a, &b] {
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.output_pdf_path, Some(harness.layout.mono_pdf_path("p1")));
    }
    assert_eq!(harness.translator.translate_count().await, 1);
    assert_eq!(harness.fetcher.fetch_count().await, 1);
    assert_eq!(harness.orchestrator.status().active_workers, 0);

    let events = events_until_terminal(&mut sub, &a.task_id).await;
    assert_eq!(
        types(&events),
        vec![TaskEventType::TaskCreated, TaskEventType::TaskSucceeded]
    );
    assert!(events.iter().all(|e| e.task.status == TaskStatus::Succeeded));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_translate_once() {
    let (_dir, harness) = setup();
    harness.translator.set_delay(Duration::from_millis(50)).await;
    harness.fetcher.set_delay(Duration::from_millis(20)).await;

    let orchestrator = harness.orchestrator.clone();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .enqueue(EnqueueRequest::translate(format!("s{}", i)).with_paper_id("p1"))
                    .unwrap()
            })
        })
        .collect();

    let mut task_ids = Vec::new();
    for handle in handles {
        task_ids.push(handle.await.unwrap().task_id);
    }
    for task_id in &task_ids {
        let task = harness.wait_for_terminal(task_id).await;
        assert_eq!(task.status, TaskStatus::Succeeded, "{:?}", task.error);
        assert_eq!(task.output_pdf_path, Some(harness.layout.mono_pdf_path("p1")));
    }

    assert_eq!(harness.translator.translate_count().await, 1);
    assert_eq!(harness.fetcher.fetch_count().await, 1);
}

/// Enqueue `n` concurrent translate requests for `paper_id`, one per session.
async fn enqueue_concurrently(harness: &Harness, paper_id: &str, n: usize) -> Vec<String> {
    let handles: Vec<_> = (0..n)
        .map(|i| {
            let orchestrator = harness.orchestrator.clone();
            let paper_id = paper_id.to_string();
            tokio::spawn(async move {
                orchestrator
                    .enqueue(EnqueueRequest::translate(format!("s{}", i)).with_paper_id(paper_id))
                    .unwrap()
            })
        })
        .collect();

    let mut task_ids = Vec::new();
    for handle in handles {
        task_ids.push(handle.await.unwrap().task_id);
    }
    task_ids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_failed_translation() {
    let (_dir, harness) = setup();
    harness.translator.set_delay(Duration::from_millis(100)).await;
    harness
        .translator
        .set_next_error(TranslateError::process_failed("exit status 1", None))
        .await;

    let task_ids = enqueue_concurrently(&harness, "p1", 3).await;

    let mut errors = Vec::new();
    for task_id in &task_ids {
        let task = harness.wait_for_terminal(task_id).await;
        assert_eq!(task.status, TaskStatus::Failed);
        errors.push(task.error.unwrap());
    }
    harness.wait_idle().await;

    assert_eq!(harness.translator.translate_count().await, 1);
    assert_eq!(harness.fetcher.fetch_count().await, 1);
    assert!(errors.iter().all(|e| e == &errors[0]), "{:?}", errors);
    assert!(errors[0].contains("exit status 1"));

    let asset = harness.translate_index.get("p1").unwrap();
    assert_eq!(asset.status, AssetStatus::Failed);
    assert_eq!(asset.error.as_deref(), Some(errors[0].as_str()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_failed_fetch() {
    let (_dir, harness) = setup();
    harness.fetcher.set_delay(Duration::from_millis(100)).await;
    harness
        .fetcher
        .set_next_error(FetchError::HttpStatus {
            url: "https://arxiv.org/pdf/p1".into(),
            status: 503,
        })
        .await;

    let task_ids = enqueue_concurrently(&harness, "p1", 4).await;

    for task_id in &task_ids {
        let task = harness.wait_for_terminal(task_id).await;
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error.unwrap().contains("HTTP 503"));
    }
    harness.wait_idle().await;

    assert_eq!(harness.fetcher.fetch_count().await, 1);
    assert_eq!(harness.translator.translate_count().await, 0);
    assert_eq!(
        harness.pdf_index.get("p1").unwrap().status,
        AssetStatus::Failed
    );
}

#[tokio::test]
async fn test_request_after_failure_tries_again() {
    let (_dir, harness) = setup();
    harness
        .translator
        .set_next_error(TranslateError::process_failed("exit status 1", None))
        .await;

    let first = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id("p1"))
        .unwrap();
    assert_eq!(
        harness.wait_for_terminal(&first.task_id).await.status,
        TaskStatus::Failed
    );
    harness.wait_idle().await;

    // a FAILED record from before the request does not short-circuit it
    let second = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id("p1"))
        .unwrap();
    assert_eq!(
        harness.wait_for_terminal(&second.task_id).await.status,
        TaskStatus::Succeeded
    );
    assert_eq!(harness.translator.translate_count().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_papers_run_in_parallel() {
    let (_dir, harness) = setup();
    harness.translator.set_delay(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    let tasks: Vec<_> = (1..=4)
        .map(|i| {
            harness
                .orchestrator
                .enqueue(EnqueueRequest::translate("s").with_paper_id(format!("p{}", i)))
                .unwrap()
        })
        .collect();
    for task in &tasks {
        assert_eq!(
            harness.wait_for_terminal(&task.task_id).await.status,
            TaskStatus::Succeeded
        );
    }

    // four 200ms translations would take 800ms if serialized
    assert!(started.elapsed() < Duration::from_millis(700));
    assert_eq!(harness.translator.translate_count().await, 4);
}

#[tokio::test]
async fn test_events_stay_on_their_session() {
    let (_dir, harness) = setup();
    let mut mine = harness.orchestrator.subscribe("mine");
    let mut other = harness.orchestrator.subscribe("other");

    let task = harness
        .orchestrator
        .enqueue(EnqueueRequest::download("mine").with_paper_id("p1"))
        .unwrap();
    let events = events_until_terminal(&mut mine, &task.task_id).await;

    assert_eq!(events.len(), 3);
    assert!(other.try_recv().is_none());
    assert!(matches!(
        other.recv_timeout(Duration::from_millis(20)).await,
        Polled::KeepAlive
    ));
}

#[tokio::test]
async fn test_resolution_by_ordinal_and_last_active() {
    let (_dir, harness) = setup();
    harness.sessions.set_last_papers("s", fixtures::papers(3));

    let by_ordinal = harness
        .orchestrator
        .enqueue(EnqueueRequest::download("s").with_ref("#3"))
        .unwrap();
    assert_eq!(by_ordinal.paper_id, "2401.00003");
    harness.wait_for_terminal(&by_ordinal.task_id).await;

    // no reference: the paper acted on last
    let follow_up = harness
        .orchestrator
        .enqueue(EnqueueRequest::translate("s"))
        .unwrap();
    assert_eq!(follow_up.paper_id, "2401.00003");
    let done = harness.wait_for_terminal(&follow_up.task_id).await;
    assert_eq!(done.status, TaskStatus::Succeeded);

    // the PDF fetched by the first task is reused
    assert_eq!(harness.fetcher.fetch_count().await, 1);

    let by_title = harness
        .orchestrator
        .enqueue(EnqueueRequest::download("s").with_ref("paper 1"))
        .unwrap();
    assert_eq!(by_title.paper_id, "2401.00001");
    harness.wait_for_terminal(&by_title.task_id).await;
}

#[tokio::test]
async fn test_tasks_listed_per_session_newest_first() {
    let (_dir, harness) = setup();
    let mut ids = Vec::new();
    for i in 1..=3 {
        let task = harness
            .orchestrator
            .enqueue(EnqueueRequest::download("s").with_paper_id(format!("p{}", i)))
            .unwrap();
        harness.wait_for_terminal(&task.task_id).await;
        ids.push(task.task_id);
    }
    harness
        .orchestrator
        .enqueue(EnqueueRequest::download("elsewhere").with_paper_id("p9"))
        .unwrap();

    let listed: Vec<_> = harness
        .orchestrator
        .list_tasks("s", 10)
        .into_iter()
        .map(|t| t.task_id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);
    assert_eq!(harness.orchestrator.list_tasks("s", 2).len(), 2);
    harness.wait_idle().await;
}

#[tokio::test]
async fn test_shared_mocks_see_work_from_two_orchestrators() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Arc::new(MockFetcher::new());
    let translator = Arc::new(MockTranslator::new());
    translator.set_delay(Duration::from_millis(30)).await;

    // Two orchestrators over one data directory coordinate through the
    // lock directory and the on-disk artifacts.
    let a = Harness::with_mocks(temp_dir.path(), fetcher.clone(), translator.clone());
    let b = Harness::with_mocks(temp_dir.path(), fetcher.clone(), translator.clone());

    let ta = a
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id("p1"))
        .unwrap();
    let tb = b
        .orchestrator
        .enqueue(EnqueueRequest::translate("s").with_paper_id("p1"))
        .unwrap();

    assert_eq!(a.wait_for_terminal(&ta.task_id).await.status, TaskStatus::Succeeded);
    assert_eq!(b.wait_for_terminal(&tb.task_id).await.status, TaskStatus::Succeeded);
    assert_eq!(translator.translate_count().await, 1);
    assert_eq!(fetcher.fetch_count().await, 1);
}
