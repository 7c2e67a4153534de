//! Bounded concurrent fan-out over independent per-item remote calls.
//!
//! Batch operations (get/delete N clusters, N jobs, run N statements) share
//! one executor: a `buffer_unordered` pool sized `min(max_workers, items)`.
//! Item failures are data in the report, never a batch abort, and the
//! executor itself does no retry; handlers wrap their per-item call in
//! `run_with_retry` before handing it here.

use crate::error::ClassifiedError;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

/// Outcome of one batch item.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Success { data: Value },
    Failed { error: ClassifiedError },
}

/// One item's result, keyed by the caller-supplied item key.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchItemResult {
    pub key: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }
}

/// Aggregate batch outcome. `successful + failed == total` always holds;
/// both counts come from scanning the final results.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

/// Run `per_item` over every key with at most `max_workers` in flight.
///
/// Results arrive in completion order; callers needing input order re-sort by
/// key. A zero `max_workers` is clamped to 1.
pub async fn run_batch<K, F, Fut>(keys: Vec<K>, max_workers: usize, per_item: F) -> BatchReport
where
    K: ToString,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<Value, ClassifiedError>>,
{
    let total = keys.len();
    let pool = max_workers.min(total).max(1);

    let results: Vec<BatchItemResult> = stream::iter(keys.into_iter().map(|item| {
        let key = item.to_string();
        let fut = per_item(item);
        async move {
            match fut.await {
                Ok(data) => BatchItemResult {
                    key,
                    outcome: BatchOutcome::Success { data },
                },
                Err(error) => BatchItemResult {
                    key,
                    outcome: BatchOutcome::Failed { error },
                },
            }
        }
    }))
    .buffer_unordered(pool)
    .collect()
    .await;

    let successful = results.iter().filter(|r| r.is_success()).count();
    let failed = results.iter().filter(|r| !r.is_success()).count();
    BatchReport {
        total,
        successful,
        failed,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn failures_are_isolated_and_counted() {
        let keys: Vec<u64> = (0..10).collect();
        let report = run_batch(keys, 3, |id| async move {
            if id % 4 == 1 {
                Err(ClassifiedError::new(ErrorKind::NotFound, "no such job"))
            } else {
                Ok(json!({ "job_id": id }))
            }
        })
        .await;

        assert_eq!(report.total, 10);
        assert_eq!(report.successful, 7);
        assert_eq!(report.failed, 3);
        assert_eq!(report.successful + report.failed, report.total);

        let keys: HashSet<&str> = report.results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys.len(), 10);
        for id in 0..10u64 {
            assert!(keys.contains(id.to_string().as_str()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pool_is_bounded_by_max_workers() {
        static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);

        let keys: Vec<u64> = (0..10).collect();
        let report = run_batch(keys, 3, |id| async move {
            let now = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
            PEAK.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
            Ok(json!({ "id": id }))
        })
        .await;

        assert_eq!(report.successful, 10);
        assert_eq!(PEAK.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn small_batches_shrink_the_pool() {
        // 2 items with max_workers 10: pool is 2, both still run.
        let report = run_batch(vec!["a", "b"], 10, |key| async move {
            Ok(json!({ "key": key }))
        })
        .await;
        assert_eq!(report.total, 2);
        assert_eq!(report.successful, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_yields_empty_report() {
        let report = run_batch(Vec::<String>::new(), 10, |_| async { Ok(json!({})) }).await;
        assert_eq!(report.total, 0);
        assert_eq!(report.successful, 0);
        assert_eq!(report.failed, 0);
        assert!(report.results.is_empty());
    }

    #[test]
    fn report_serializes_flat_item_shape() {
        let report = BatchReport {
            total: 2,
            successful: 1,
            failed: 1,
            results: vec![
                BatchItemResult {
                    key: "7".into(),
                    outcome: BatchOutcome::Success { data: json!({"id": 7}) },
                },
                BatchItemResult {
                    key: "8".into(),
                    outcome: BatchOutcome::Failed {
                        error: ClassifiedError::new(ErrorKind::NotFound, "404"),
                    },
                },
            ],
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["results"][0]["status"], "success");
        assert_eq!(v["results"][0]["data"]["id"], 7);
        assert_eq!(v["results"][1]["status"], "failed");
        assert_eq!(v["results"][1]["error"]["kind"], "not_found");
    }
}
