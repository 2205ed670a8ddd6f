//! Throttled batch publishing with a shared retry budget.
//!
//! # Retry Strategy
//!
//! - One attempt counter for the whole failed batch, `1..=max_attempts`
//! - Each attempt re-publishes every item still failing
//! - Fixed delay between attempts; none after the last one or once the
//!   batch is empty
//! - Independently, [`Throttle`] waits `post_delay` after each publish call
//!   finishes before the next one starts, across the first pass and all
//!   retries

use chrono::Utc;
use itertools::{Either, Itertools};
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{info, instrument, warn};

use crate::api::Publish;
use crate::models::{CandidateItem, FailedPublication, PublishedItem};

/// Enforces a minimum idle gap between consecutive publish calls.
#[derive(Debug)]
pub struct Throttle {
    gap: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(gap: Duration) -> Self {
        Self { gap, last: None }
    }

    /// Wait until `gap` has passed since the previous call finished.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let ready_at = last + self.gap;
            if ready_at > Instant::now() {
                info!(delay = ?self.gap, "Waiting before next post");
                sleep_until(ready_at).await;
            }
        }
    }

    /// Mark the end of a publish call.
    pub fn finished(&mut self) {
        self.last = Some(Instant::now());
    }
}

/// Result of publishing a batch: accepted items and items still to retry.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub published: Vec<PublishedItem>,
    pub failed: Vec<CandidateItem>,
}

impl BatchOutcome {
    pub fn failed_publications(&self) -> Vec<FailedPublication> {
        self.failed.iter().map(FailedPublication::from).collect()
    }
}

/// Publish each item once, in order, respecting the throttle.
pub async fn publish_batch<P: Publish>(
    publisher: &P,
    throttle: &mut Throttle,
    items: Vec<CandidateItem>,
) -> BatchOutcome {
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        throttle.wait().await;
        let content = item.post_content();
        let res = publisher
            .publish(&item.title, &content, item.image_url.as_deref())
            .await
            .map(|receipt| (receipt, Utc::now()));
        throttle.finished();
        results.push((item, res));
    }

    let (published, failed): (Vec<_>, Vec<_>) =
        results.into_iter().partition_map(|(item, res)| match res {
            Ok((receipt, posted_at)) => Either::Left(PublishedItem {
                item,
                post_id: receipt.id,
                post_url: receipt.url,
                posted_at,
            }),
            Err(_) => Either::Right(item),
        });
    BatchOutcome { published, failed }
}

/// Bounds for [`retry`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

/// Re-publish failed items until they all succeed or the budget runs out.
///
/// The returned outcome partitions the input: every item ends up either
/// in `published` or in `failed`.
#[instrument(level = "info", skip_all, fields(items = failed.len(), max_attempts = policy.max_attempts))]
pub async fn retry<P: Publish>(
    publisher: &P,
    throttle: &mut Throttle,
    failed: Vec<CandidateItem>,
    policy: RetryPolicy,
) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        published: Vec::new(),
        failed,
    };

    for attempt in 1..=policy.max_attempts {
        if outcome.failed.is_empty() {
            break;
        }
        info!(attempt, remaining = outcome.failed.len(), "Retrying failed posts");

        let pending = std::mem::take(&mut outcome.failed);
        let round = publish_batch(publisher, throttle, pending).await;
        outcome.published.extend(round.published);
        outcome.failed = round.failed;

        if outcome.failed.is_empty() || attempt == policy.max_attempts {
            break;
        }
        warn!(attempt, remaining = outcome.failed.len(), delay = ?policy.delay, "Posts still failing; backing off");
        sleep(policy.delay).await;
    }

    info!(
        succeeded = outcome.published.len(),
        still_failed = outcome.failed.len(),
        "Retry finished"
    );
    outcome
}


#[cfg(test)]
mod tests {
    use super::testing::FlakyPublisher;
    use super::*;
    use crate::models::sample_item;

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_publish_batch_partitions_results() {
        let publisher = FlakyPublisher::failing("B", 1);
        let mut throttle = Throttle::new(Duration::ZERO);

        let outcome = publish_batch(
            &publisher,
            &mut throttle,
            vec![sample_item("a", "A"), sample_item("b", "B")],
        )
        .await;

        assert_eq!(outcome.published.len(), 1);
        assert_eq!(outcome.published[0].post_id, "id-A");
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].title, "B");
        assert_eq!(outcome.failed_publications()[0].title, "B");
    }

    #[tokio::test]
    async fn test_retry_stops_once_everything_succeeds() {
        let publisher = FlakyPublisher::failing("A", 1).also_failing("B", 2);
        let mut throttle = Throttle::new(Duration::ZERO);

        let outcome = retry(
            &publisher,
            &mut throttle,
            vec![sample_item("a", "A"), sample_item("b", "B")],
            policy(5),
        )
        .await;

        assert_eq!(outcome.published.len(), 2);
        assert!(outcome.failed.is_empty());
        // Attempt 1: A fails, B fails. Attempt 2: A ok, B fails. Attempt 3: B ok.
        assert_eq!(publisher.calls(), ["A", "B", "A", "B", "B"]);
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let publisher = FlakyPublisher::failing("A", usize::MAX).also_failing("B", 1);
        let mut throttle = Throttle::new(Duration::ZERO);
        let items = vec![sample_item("a", "A"), sample_item("b", "B"), sample_item("c", "C")];

        let outcome = retry(&publisher, &mut throttle, items, policy(3)).await;

        assert_eq!(outcome.published.len() + outcome.failed.len(), 3);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].title, "A");
        let a_calls = publisher.calls().iter().filter(|t| *t == "A").count();
        assert_eq!(a_calls, 3);
    }

    #[tokio::test]
    async fn test_retry_with_zero_attempts_returns_everything_failed() {
        let publisher = FlakyPublisher::default();
        let mut throttle = Throttle::new(Duration::ZERO);

        let outcome = retry(&publisher, &mut throttle, vec![sample_item("a", "A")], policy(0)).await;

        assert!(outcome.published.is_empty());
        assert_eq!(outcome.failed.len(), 1);
        assert!(publisher.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_out_calls() {
        let mut throttle = Throttle::new(Duration::from_secs(10));
        let start = Instant::now();

        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        throttle.finished();
        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    /// Publisher that takes a fixed time per call and records when each ran.
    struct SlowPublisher {
        latency: Duration,
        spans: std::sync::Mutex<Vec<(Instant, Instant)>>,
    }

    impl Publish for SlowPublisher {
        async fn publish(
            &self,
            title: &str,
            _content: &str,
            _image_url: Option<&str>,
        ) -> Result<crate::api::PostReceipt, crate::error::PublishError> {
            let started = Instant::now();
            sleep(self.latency).await;
            self.spans.lock().unwrap().push((started, Instant::now()));
            Ok(crate::api::PostReceipt {
                id: title.to_string(),
                url: None,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_delay_counts_from_end_of_slow_publish() {
        let publisher = SlowPublisher {
            latency: Duration::from_secs(15),
            spans: Default::default(),
        };
        let mut throttle = Throttle::new(Duration::from_secs(10));

        let outcome = publish_batch(
            &publisher,
            &mut throttle,
            vec![sample_item("a", "A"), sample_item("b", "B")],
        )
        .await;

        assert_eq!(outcome.published.len(), 2);
        let spans = publisher.spans.lock().unwrap().clone();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].0 - spans[0].1, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_posted_at_is_stamped_per_item() {
        let publisher = SlowPublisher {
            latency: Duration::from_millis(20),
            spans: Default::default(),
        };
        let mut throttle = Throttle::new(Duration::from_millis(200));

        let outcome = publish_batch(
            &publisher,
            &mut throttle,
            vec![sample_item("a", "A"), sample_item("b", "B")],
        )
        .await;

        let gap = outcome.published[1].posted_at - outcome.published[0].posted_at;
        assert!(gap >= chrono::Duration::milliseconds(200), "gap was {gap}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_only_between_attempts() {
        let delay = Duration::from_secs(60);
        let policy = RetryPolicy {
            max_attempts: 3,
            delay,
        };

        // Budget exhausted: three attempts, two pauses, none after the last.
        let publisher = FlakyPublisher::failing("A", usize::MAX);
        let mut throttle = Throttle::new(Duration::ZERO);
        let start = Instant::now();
        let outcome = retry(&publisher, &mut throttle, vec![sample_item("a", "A")], policy).await;
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(publisher.calls().len(), 3);
        assert_eq!(start.elapsed(), 2 * delay);

        // Success on the second attempt: one pause, none once the set is empty.
        let publisher = FlakyPublisher::failing("A", 1);
        let start = Instant::now();
        let outcome = retry(&publisher, &mut throttle, vec![sample_item("a", "A")], policy).await;
        assert_eq!(outcome.published.len(), 1);
        assert_eq!(publisher.calls().len(), 2);
        assert_eq!(start.elapsed(), delay);

        // Nothing to retry: no pause at all.
        let start = Instant::now();
        retry(&publisher, &mut throttle, Vec::new(), policy).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_applies_during_retry_rounds() {
        let publisher = FlakyPublisher::failing("A", usize::MAX).also_failing("B", usize::MAX);
        let mut throttle = Throttle::new(Duration::from_secs(10));
        let start = Instant::now();

        let outcome = retry(
            &publisher,
            &mut throttle,
            vec![sample_item("a", "A"), sample_item("b", "B")],
            RetryPolicy {
                max_attempts: 2,
                delay: Duration::ZERO,
            },
        )
        .await;

        assert_eq!(outcome.failed.len(), 2);
        // Four calls, each after a 10s gap except the first.
        assert_eq!(publisher.calls(), ["A", "B", "A", "B"]);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }
}
