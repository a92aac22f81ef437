//! Parallel Fetch Orchestrator
//!
//! Runs every call of a batch as its own task and reports a per-key outcome.
//! A failing (or panicking) call never cancels or hides its siblings.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use indexmap::IndexMap;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::ParallelConfig;
use crate::error::{error_message, FetchError, Result};
use crate::parallel::{BatchReport, CallOutcome, ParallelBatch};

// == Parallel Fetcher ==
#[derive(Debug, Clone, Default)]
pub struct ParallelFetcher {
    config: ParallelConfig,
}

impl ParallelFetcher {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    /// Batch time limit used when none is given.
    pub fn default_timeout(&self) -> Duration {
        self.config.timeout
    }

    // == Run Settled ==
    /// Starts every call in batch order and waits for all of them to settle.
    ///
    /// Outcomes are keyed and ordered like the batch.
    pub async fn run_settled<T>(&self, batch: ParallelBatch<T>) -> IndexMap<String, CallOutcome<T>>
    where
        T: Send + 'static,
    {
        let started = Instant::now();
        let (keys, handles): (Vec<String>, Vec<_>) = batch
            .into_calls()
            .into_iter()
            .map(|call| {
                let (key, operation) = call.into_parts();
                (key, tokio::spawn(operation))
            })
            .unzip();

        let settled = join_all(handles).await;

        let outcomes: IndexMap<String, CallOutcome<T>> = keys
            .into_iter()
            .zip(settled)
            .map(|(key, joined)| {
                let outcome = match joined {
                    Ok(Ok(value)) => CallOutcome::Success { value },
                    Ok(Err(e)) => CallOutcome::Failure {
                        error: error_message(&e),
                    },
                    Err(join_error) => CallOutcome::Failure {
                        error: format!("Operation aborted: {}", join_error),
                    },
                };
                if let CallOutcome::Failure { error } = &outcome {
                    warn!("Parallel call '{}' failed: {}", key, error);
                }
                (key, outcome)
            })
            .collect();

        let failed = outcomes.values().filter(|o| !o.is_success()).count();
        info!(
            "Parallel batch of {} settled in {:?} ({} failed)",
            outcomes.len(),
            started.elapsed(),
            failed
        );
        outcomes
    }

    // == Run All ==
    /// Settles the batch; failed keys map to `None`.
    pub async fn run_all<T>(&self, batch: ParallelBatch<T>) -> IndexMap<String, Option<T>>
    where
        T: Send + 'static,
    {
        self.run_settled(batch)
            .await
            .into_iter()
            .map(|(key, outcome)| (key, outcome.into_value()))
            .collect()
    }

    // == Run All With Errors ==
    /// Settles the batch and reports successes and failure messages apart.
    pub async fn run_all_with_errors<T>(&self, batch: ParallelBatch<T>) -> BatchReport<T>
    where
        T: Send + 'static,
    {
        BatchReport::from_outcomes(self.run_settled(batch).await)
    }

    // == Run All With Timeout ==
    /// Like [`run_all`](Self::run_all), but fails as a whole with
    /// [`FetchError::Timeout`] if the batch has not settled within `timeout`
    /// (the configured default when `None`). No partial results are returned.
    pub async fn run_all_with_timeout<T>(
        &self,
        batch: ParallelBatch<T>,
        timeout: Option<Duration>,
    ) -> Result<IndexMap<String, Option<T>>>
    where
        T: Send + 'static,
    {
        self.within(timeout, self.run_all(batch)).await
    }

    /// Awaits `operation` for at most `timeout`, or the configured default.
    ///
    /// Calls already spawned by a timed-out batch keep running detached;
    /// only the wait is abandoned.
    pub async fn within<F: Future>(
        &self,
        timeout: Option<Duration>,
        operation: F,
    ) -> Result<F::Output> {
        let limit = timeout.unwrap_or(self.config.timeout);
        tokio::time::timeout(limit, operation).await.map_err(|_| {
            warn!("Parallel batch timed out after {:?}", limit);
            FetchError::Timeout(limit)
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ParallelCall;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn fetcher() -> ParallelFetcher {
        ParallelFetcher::default()
    }

    fn delayed(ms: u64, value: i32) -> ParallelCall<i32> {
        ParallelCall::new(format!("k{}", value), async move {
            sleep(Duration::from_millis(ms)).await;
            Ok(value)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_collects_every_value() {
        let batch = ParallelBatch::from_calls(vec![delayed(30, 1), delayed(10, 2), delayed(20, 3)])
            .unwrap();

        let results = fetcher().run_all(batch).await;

        let keys: Vec<&String> = results.keys().collect();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
        assert_eq!(results["k1"], Some(1));
        assert_eq!(results["k2"], Some(2));
        assert_eq!(results["k3"], Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_run_concurrently() {
        let batch = ParallelBatch::from_calls(vec![
            delayed(100, 1),
            delayed(100, 2),
            delayed(100, 3),
        ])
        .unwrap();
        let start = Instant::now();

        fetcher().run_all(batch).await;

        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let batch = ParallelBatch::new()
            .with(ParallelCall::new("first", async { Ok(1) }))
            .and_then(|b| {
                b.with(ParallelCall::new("second", async {
                    Err(anyhow::anyhow!("boom"))
                }))
            })
            .and_then(|b| b.with(ParallelCall::new("third", async { Ok(3) })))
            .unwrap();

        let report = fetcher().run_all_with_errors(batch).await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results["first"], 1);
        assert_eq!(report.results["third"], 3);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors["second"], "boom");
        assert!(report.has_errors);
    }

    #[tokio::test]
    async fn test_run_all_maps_failures_to_none() {
        let batch = ParallelBatch::from_calls(vec![
            ParallelCall::new("ok", async { Ok("yes") }),
            ParallelCall::new("bad", async { Err(anyhow::anyhow!("no")) }),
        ])
        .unwrap();

        let results = fetcher().run_all(batch).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["ok"], Some("yes"));
        assert_eq!(results["bad"], None);
    }

    #[tokio::test]
    async fn test_panicking_call_reported_as_failure() {
        let batch = ParallelBatch::from_calls(vec![
            ParallelCall::new("ok", async { Ok(1) }),
            ParallelCall::new("panics", async { panic!("kaboom") }),
        ])
        .unwrap();

        let outcomes = fetcher().run_settled(batch).await;

        assert!(outcomes["ok"].is_success());
        assert!(!outcomes["panics"].is_success());
    }

    #[tokio::test]
    async fn test_empty_error_message_falls_back() {
        let batch = ParallelBatch::from_calls(vec![ParallelCall::new("k", async {
            Err::<(), _>(anyhow::anyhow!(""))
        })])
        .unwrap();

        let report = fetcher().run_all_with_errors(batch).await;

        assert_eq!(report.errors["k"], "Unknown error");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = fetcher().run_all_with_errors(ParallelBatch::<i32>::new()).await;

        assert!(report.results.is_empty());
        assert!(!report.has_errors);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_all_or_nothing() {
        let batch = ParallelBatch::from_calls(vec![
            ParallelCall::new("fast", async {
                sleep(Duration::from_millis(5)).await;
                Ok(1)
            }),
            ParallelCall::new("stuck", std::future::pending()),
        ])
        .unwrap();
        let start = Instant::now();

        let result = fetcher()
            .run_all_with_timeout(batch, Some(Duration::from_millis(50)))
            .await;

        assert_eq!(result, Err(FetchError::Timeout(Duration::from_millis(50))));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(start.elapsed() < Duration::from_millis(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_path_returns_results_when_fast_enough() {
        let batch = ParallelBatch::from_calls(vec![delayed(10, 1), delayed(20, 2)]).unwrap();

        let results = fetcher()
            .run_all_with_timeout(batch, Some(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(results["k2"], Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_applies() {
        let fetcher = ParallelFetcher::new(ParallelConfig {
            timeout: Duration::from_millis(20),
        });
        let batch = ParallelBatch::from_calls(vec![delayed(100, 1)]).unwrap();

        let result = fetcher.run_all_with_timeout(batch, None).await;

        assert!(matches!(result, Err(FetchError::Timeout(d)) if d == Duration::from_millis(20)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_calls_keep_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let batch = ParallelBatch::from_calls(vec![ParallelCall::new("slow", async move {
            sleep(Duration::from_millis(100)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })])
        .unwrap();

        let result = fetcher()
            .run_all_with_timeout(batch, Some(Duration::from_millis(50)))
            .await;
        assert!(result.is_err());
        assert!(!finished.load(Ordering::SeqCst));

        sleep(Duration::from_millis(100)).await;
        assert!(finished.load(Ordering::SeqCst));
    }
}
