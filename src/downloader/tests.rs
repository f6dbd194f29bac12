use super::*;
use crate::assembler::assemble;
use crate::error::FetchError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Fetcher that answers from a script of per-index delays and payloads
#[derive(Default)]
struct ScriptedFetcher {
    delays: HashMap<u32, Duration>,
    payloads: HashMap<u32, Vec<u8>>,
    failing: Vec<u32>,
    completion_order: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SegmentFetcher for ScriptedFetcher {
    async fn fetch(&self, task: SegmentTask) -> Result<SegmentResult, FetchError> {
        let index = task.sequence_index;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&index)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completion_order.lock().unwrap().push(index);

        if self.failing.contains(&index) {
            return Err(FetchError::Status { index, status: 500 });
        }
        Ok(SegmentResult {
            sequence_index: index,
            payload: self.payloads.get(&index).cloned().unwrap_or_default(),
        })
    }
}

fn tasks(count: u32) -> Vec<SegmentTask> {
    (1..=count)
        .map(|i| SegmentTask {
            sequence_index: i,
            locator: Url::parse(&format!("http://cdn.example.com/{i}.ts")).unwrap(),
        })
        .collect()
}

fn coordinator(fetcher: Arc<ScriptedFetcher>, workers: usize) -> DownloadCoordinator {
    let (event_tx, _) = broadcast::channel(256);
    DownloadCoordinator::new(fetcher, workers, event_tx)
}

#[tokio::test]
async fn out_of_order_completion_still_assembles_in_index_order() {
    let fetcher = Arc::new(ScriptedFetcher {
        delays: HashMap::from([
            (1, Duration::from_millis(60)),
            (2, Duration::from_millis(120)),
            (3, Duration::from_millis(5)),
        ]),
        payloads: HashMap::from([
            (1, b"a".to_vec()),
            (2, b"b".to_vec()),
            (3, b"c".to_vec()),
        ]),
        ..Default::default()
    });

    let results = coordinator(Arc::clone(&fetcher), 15)
        .run(&CaseId::from("C100"), tasks(3))
        .await
        .unwrap();

    assert_eq!(*fetcher.completion_order.lock().unwrap(), vec![3, 1, 2]);
    assert_eq!(assemble(results, 3).unwrap(), b"abc".to_vec());
}

#[tokio::test]
async fn any_failed_segment_rejects_the_batch() {
    let fetcher = Arc::new(ScriptedFetcher {
        payloads: HashMap::from([(1, b"a".to_vec()), (3, b"c".to_vec())]),
        failing: vec![2],
        ..Default::default()
    });

    let err = coordinator(Arc::clone(&fetcher), 15)
        .run(&CaseId::from("C100"), tasks(3))
        .await
        .unwrap_err();

    let DownloadError::PartialFailure {
        failed_indices,
        total,
    } = err;
    assert_eq!(failed_indices, vec![2]);
    assert_eq!(total, 3);
    // every task is still awaited
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_indices_are_reported_ascending() {
    let fetcher = Arc::new(ScriptedFetcher {
        delays: HashMap::from([
            (2, Duration::from_millis(80)),
            (5, Duration::from_millis(5)),
        ]),
        failing: vec![2, 5],
        ..Default::default()
    });

    let DownloadError::PartialFailure { failed_indices, .. } = coordinator(fetcher, 10)
        .run(&CaseId::from("C1"), tasks(6))
        .await
        .unwrap_err();
    assert_eq!(failed_indices, vec![2, 5]);
}

#[tokio::test]
async fn concurrency_never_exceeds_worker_count() {
    let fetcher = Arc::new(ScriptedFetcher {
        delays: (1..=40).map(|i| (i, Duration::from_millis(10))).collect(),
        ..Default::default()
    });

    let results = coordinator(Arc::clone(&fetcher), 4)
        .run(&CaseId::from("C1"), tasks(40))
        .await
        .unwrap();

    assert_eq!(results.len(), 40);
    let max = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 4, "saw {max} fetches in flight");
    assert!(max > 1, "fetches never overlapped");
}

#[tokio::test]
async fn zero_workers_is_clamped_to_one() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let coordinator = coordinator(Arc::clone(&fetcher), 0);
    assert_eq!(coordinator.workers(), 1);

    coordinator
        .run(&CaseId::from("C1"), tasks(5))
        .await
        .unwrap();
    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn emits_progress_event_per_completion() {
    let fetcher = Arc::new(ScriptedFetcher {
        failing: vec![4],
        ..Default::default()
    });
    let (event_tx, mut event_rx) = broadcast::channel(64);
    let coordinator = DownloadCoordinator::new(fetcher, 3, event_tx);

    let _ = coordinator.run(&CaseId::from("C7"), tasks(5)).await;

    let mut seen = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        if let Event::SegmentFetched {
            case_id,
            completed,
            total,
            failed,
        } = event
        {
            assert_eq!(case_id, "C7");
            assert_eq!(total, 5);
            seen.push((completed, failed));
        }
    }

    assert_eq!(
        seen.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(seen.iter().filter(|(_, failed)| *failed).count(), 1);
}

#[tokio::test]
async fn empty_task_list_succeeds_without_fetching() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let results = coordinator(Arc::clone(&fetcher), 4)
        .run(&CaseId::from("C1"), Vec::new())
        .await
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}
