//! Data models for scraped articles, ledger records, and failed posts.
//!
//! This module defines the core data structures used throughout the application:
//! - [`CandidateItem`]: An article freshly scraped from the listing page
//! - [`PublishedAt`]: Best-effort parsed publication timestamp
//! - [`PublishedItem`]: A candidate that the platform accepted
//! - [`LedgerEntry`]: Durable record of an already-published article
//! - [`FailedPublication`]: A post that exhausted its retries

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Date format used by the news site, e.g. `18 10 2026 14:05:00`.
pub const SOURCE_DATE_FORMAT: &str = "%d %m %Y %H:%M:%S";

/// Human-readable format used in posts and the digest.
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y, %I:%M %p";

/// Publication timestamp of a scraped article.
///
/// The site prints dates in a single numeric format. When a date does not
/// match it, the raw text is kept so downstream rendering still has
/// something to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedAt {
    /// Successfully parsed local timestamp.
    Parsed(NaiveDateTime),
    /// Raw string as it appeared on the page.
    Raw(String),
}

impl PublishedAt {
    /// Parse a date string in [`SOURCE_DATE_FORMAT`], falling back to the raw text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match NaiveDateTime::parse_from_str(trimmed, SOURCE_DATE_FORMAT) {
            Ok(dt) => PublishedAt::Parsed(dt),
            Err(_) => PublishedAt::Raw(trimmed.to_string()),
        }
    }
}

impl fmt::Display for PublishedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedAt::Parsed(dt) => write!(f, "{}", dt.format(DISPLAY_DATE_FORMAT)),
            PublishedAt::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A news article as scraped from the listing page and its own page.
///
/// Created fresh on every run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    /// Absolute article URL; primary dedup key.
    pub url: String,
    /// Article headline; secondary dedup key.
    pub title: String,
    /// Publication timestamp shown on the listing.
    pub published_at: PublishedAt,
    /// Short teaser text from the listing.
    pub summary: String,
    /// Thumbnail shown on the listing, if any.
    pub image_url: Option<String>,
    /// Full article text, paragraphs separated by blank lines.
    pub body: String,
}

impl CandidateItem {
    /// Text handed to the publisher: a dated preamble followed by the body.
    pub fn post_content(&self) -> String {
        format!("Published on {}\n\n{}", self.published_at, self.body)
    }
}

/// A candidate the platform accepted, with the identifiers it returned.
#[derive(Debug, Clone)]
pub struct PublishedItem {
    pub item: CandidateItem,
    pub post_id: String,
    pub post_url: Option<String>,
    pub posted_at: DateTime<Utc>,
}

impl PublishedItem {
    pub fn ledger_entry(&self) -> LedgerEntry {
        LedgerEntry {
            url: self.item.url.clone(),
            title: self.item.title.clone(),
            external_post_id: self.post_id.clone(),
            posted_at: Some(self.posted_at),
        }
    }
}

/// Durable record of an article that has been published.
///
/// Older ledgers stored nothing but the article URL. Those bare strings
/// still deserialize, as entries with an empty title and post id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub url: String,
    pub title: String,
    pub external_post_id: String,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Full {
        url: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        external_post_id: String,
        #[serde(default)]
        posted_at: Option<DateTime<Utc>>,
    },
    UrlOnly(String),
}

impl<'de> Deserialize<'de> for LedgerEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match StoredEntry::deserialize(deserializer)? {
            StoredEntry::Full {
                url,
                title,
                external_post_id,
                posted_at,
            } => LedgerEntry {
                url,
                title,
                external_post_id,
                posted_at,
            },
            StoredEntry::UrlOnly(url) => LedgerEntry {
                url,
                title: String::new(),
                external_post_id: String::new(),
                posted_at: None,
            },
        })
    }
}

/// A post that could not be published within the retry budget.
///
/// Written to a side file for manual follow-up. It stays out of the
/// ledger, so the next scheduled run will try the article again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedPublication {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

impl From<&CandidateItem> for FailedPublication {
    fn from(item: &CandidateItem) -> Self {
        FailedPublication {
            title: item.title.clone(),
            content: item.post_content(),
            image_url: item.image_url.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_item(url: &str, title: &str) -> CandidateItem {
    CandidateItem {
        url: url.to_string(),
        title: title.to_string(),
        published_at: PublishedAt::parse("18 10 2026 14:05:00"),
        summary: "Short summary".to_string(),
        image_url: None,
        body: "First paragraph.\n\nSecond paragraph.".to_string(),
    }
}
