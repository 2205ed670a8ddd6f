//! Ada Derana "latest news" scraper.
//!
//! # URL Pattern
//!
//! The listing lives at `https://www.ada.lk/latest-news/11`. Each entry links
//! to an article page whose text sits in `div.single-body-wrap`. Links are
//! resolved against the listing URL so relative hrefs work too.

use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::models::{CandidateItem, PublishedAt};
use crate::utils::squash_whitespace;

/// Body used when an article page cannot be fetched or has no text block.
pub const CONTENT_NOT_FOUND: &str = "Full content not found.";

static LISTING_ENTRY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.row.bg-white.cat-b-row.mt-3").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h5").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("h6").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("p.cat-b-text").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static BODY_PARAGRAPHS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.single-body-wrap p").unwrap());
static BODY_WRAP: Lazy<Selector> = Lazy::new(|| Selector::parse("div.single-body-wrap").unwrap());

/// Metadata for one listing entry, before the article page is fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub url: String,
    pub title: String,
    pub date: String,
    pub summary: String,
    pub image_url: Option<String>,
}

/// Scrapes one listing page and the articles it links to.
#[derive(Debug, Clone)]
pub struct Collector {
    client: Client,
    listing_url: String,
}

impl Collector {
    pub fn new(client: Client, listing_url: impl Into<String>) -> Self {
        Self {
            client,
            listing_url: listing_url.into(),
        }
    }

    /// Collect every article on the listing page, in listing order.
    ///
    /// Never fails: an unreachable listing yields an empty vector.
    #[instrument(level = "info", skip_all, fields(listing = %self.listing_url))]
    pub async fn collect(&self) -> Vec<CandidateItem> {
        let entries = match self.index_articles().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to fetch news listing; nothing to do this run");
                return Vec::new();
            }
        };

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            debug!(url = %entry.url, title = %entry.title, summary = %entry.summary, "Fetching article");
            let body = self.fetch_article(&entry.url).await;
            items.push(CandidateItem {
                published_at: PublishedAt::parse(&entry.date),
                url: entry.url,
                title: entry.title,
                summary: entry.summary,
                image_url: entry.image_url,
                body,
            });
        }

        info!(count = items.len(), "Collected articles");
        items
    }

    /// Fetch the listing page and extract its entries.
    #[instrument(level = "info", skip_all)]
    pub async fn index_articles(&self) -> Result<Vec<ListingEntry>, Box<dyn Error>> {
        let base = Url::parse(&self.listing_url)?;
        let html = fetch_ok(&self.client, &self.listing_url)
            .await?
            .ok_or("listing did not return 200 OK")?;
        let entries = parse_listing(&html, &base);
        info!(count = entries.len(), "Indexed listing entries");
        Ok(entries)
    }

    /// Fetch one article page and return its text, or [`CONTENT_NOT_FOUND`].
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn fetch_article(&self, url: &str) -> String {
        match fetch_ok(&self.client, url).await {
            Ok(Some(html)) => match parse_article_body(&html) {
                Some(body) => {
                    debug!(bytes = body.len(), "Parsed article body");
                    body
                }
                None => {
                    warn!("Article page has no content block");
                    CONTENT_NOT_FOUND.to_string()
                }
            },
            Ok(None) => {
                warn!("Article page did not return 200 OK");
                CONTENT_NOT_FOUND.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed");
                CONTENT_NOT_FOUND.to_string()
            }
        }
    }
}

/// GET `url`, returning the body only for a 200 response.
async fn fetch_ok(client: &Client, url: &str) -> Result<Option<String>, reqwest::Error> {
    let response = client.get(url).send().await?;
    if response.status() != StatusCode::OK {
        debug!(%url, status = %response.status(), "Non-200 response");
        return Ok(None);
    }
    Ok(Some(response.text().await?))
}

fn element_text(element: ElementRef<'_>) -> String {
    squash_whitespace(&element.text().collect::<String>())
}

fn first_text(parent: ElementRef<'_>, selector: &Selector) -> Option<String> {
    parent.select(selector).next().map(element_text)
}

/// Extract listing entries from the listing page HTML.
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for node in document.select(&LISTING_ENTRY) {
        let href = node
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"));
        let Some(url) = href.and_then(|h| base.join(h).ok()) else {
            warn!("Listing entry without a usable link; skipping");
            continue;
        };
        let Some(title) = first_text(node, &TITLE).filter(|t| !t.is_empty()) else {
            warn!(%url, "Listing entry without a title; skipping");
            continue;
        };

        let date = first_text(node, &DATE)
            .map(|d| squash_whitespace(&d.replace('•', "")))
            .unwrap_or_default();
        let summary = first_text(node, &SUMMARY).unwrap_or_default();
        let image_url = node
            .select(&IMAGE)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);

        entries.push(ListingEntry {
            url: url.to_string(),
            title,
            date,
            summary,
            image_url,
        });
    }

    entries
}

/// Extract the article text, paragraphs joined by blank lines.
///
/// Returns `None` when the page has no content block at all. A block with
/// no paragraphs yields an empty body.
pub fn parse_article_body(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&BODY_WRAP).next()?;

    let paragraphs: Vec<String> = document
        .select(&BODY_PARAGRAPHS)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .collect();
    Some(paragraphs.join("\n\n"))
}
