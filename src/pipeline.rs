//! One scheduled run: collect → dedup → publish → retry → record.
//!
//! Only a broken ledger or a failed write ends the run with an error.
//! Individual scrape or publish failures are absorbed and reported in the
//! returned [`RunReport`].

use std::error::Error;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::api::Publish;
use crate::config::Config;
use crate::ledger::Ledger;
use crate::models::{LedgerEntry, PublishedItem};
use crate::outputs::{digest, json};
use crate::retry::{RetryPolicy, Throttle, publish_batch, retry};
use crate::scrapers::ada::Collector;

/// Counts describing what a run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub collected: usize,
    pub fresh: usize,
    pub published: usize,
    pub failed: usize,
}

#[instrument(level = "info", skip_all)]
pub async fn run<P: Publish>(
    config: &Config,
    collector: &Collector,
    publisher: &P,
) -> Result<RunReport, Box<dyn Error>> {
    let t0 = Instant::now();
    let ledger = Ledger::load(&config.ledger_path).await?;

    let candidates = collector.collect().await;
    let collected = candidates.len();
    let fresh = ledger.fresh(candidates);
    info!(collected, fresh = fresh.len(), "Filtered against ledger");

    let mut report = RunReport {
        collected,
        fresh: fresh.len(),
        ..RunReport::default()
    };
    if fresh.is_empty() {
        info!("No new news to add");
        return Ok(report);
    }

    let mut throttle = Throttle::new(config.post_delay);
    let first_pass = publish_batch(publisher, &mut throttle, fresh).await;
    let mut published = first_pass.published;

    let mut outcome = retry(
        publisher,
        &mut throttle,
        first_pass.failed,
        RetryPolicy {
            max_attempts: config.max_attempts,
            delay: config.retry_delay,
        },
    )
    .await;
    published.append(&mut outcome.published);

    report.published = published.len();
    report.failed = outcome.failed.len();

    // Set failures aside before recording successes.
    if !outcome.failed.is_empty() {
        warn!(count = outcome.failed.len(), "Some posts failed permanently");
        json::write_failed(&config.failed_path, &outcome.failed_publications()).await?;
    }

    record(config, &published).await?;

    let elapsed = t0.elapsed();
    info!(
        ?elapsed,
        published = report.published,
        failed = report.failed,
        "Run complete"
    );
    Ok(report)
}

/// Extend the ledger and the digest with successfully published items.
async fn record(config: &Config, published: &[PublishedItem]) -> Result<(), Box<dyn Error>> {
    if published.is_empty() {
        info!("No articles were published; ledger and digest left untouched");
        return Ok(());
    }
    let entries: Vec<LedgerEntry> = published.iter().map(PublishedItem::ledger_entry).collect();
    Ledger::append(&config.ledger_path, &entries).await?;
    digest::update_file(&config.digest_path, published).await?;
    for item in published {
        debug!(
            title = %item.item.title,
            summary = %item.item.summary,
            post_id = %item.post_id,
            post_url = item.post_url.as_deref().unwrap_or("-"),
            "Recorded"
        );
    }
    info!(count = published.len(), "Recorded published articles");
    Ok(())
}
