//! Rolling markdown digest of published articles.
//!
//! The digest has an optional static preamble fenced by
//! [`STATIC_START`]/[`STATIC_END`], followed by item sections, newest first.
//! Everything up to and including the end marker is preserved byte for
//! byte; new sections go right after it.

use std::error::Error;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::models::PublishedItem;
use crate::outputs::json::write_atomic;

pub const STATIC_START: &str = "<!-- STATIC-START -->";
pub const STATIC_END: &str = "<!-- STATIC-END -->";

/// Split a document into its static prefix (marker included) and dynamic rest.
///
/// Without both markers the whole document is dynamic.
pub fn split(document: &str) -> (&str, &str) {
    if !document.contains(STATIC_START) {
        return ("", document);
    }
    match document.find(STATIC_END) {
        Some(pos) => document.split_at(pos + STATIC_END.len()),
        None => ("", document),
    }
}

/// Render one published item as a digest section.
pub fn render_section(published: &PublishedItem) -> String {
    let item = &published.item;
    let mut md = String::new();
    write!(
        md,
        "---\n\n## {}\n\n*Published on: {}*\n\n{}",
        item.title, item.published_at, item.body
    )
    .unwrap();
    if let Some(image) = &item.image_url {
        write!(md, "\n\n![Image]({image})").unwrap();
    }
    md
}

/// Produce the new digest text with `items` inserted ahead of older sections.
pub fn update(existing: &str, items: &[PublishedItem]) -> String {
    if items.is_empty() {
        return existing.to_string();
    }
    let (static_part, dynamic_part) = split(existing);
    let sections = items
        .iter()
        .map(render_section)
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut out = String::with_capacity(existing.len() + sections.len() + 4);
    if !static_part.is_empty() {
        out.push_str(static_part);
        out.push_str("\n\n");
    }
    out.push_str(&sections);
    out.push_str("\n\n");
    out.push_str(dynamic_part.trim_start());
    out
}

/// Apply [`update`] to the digest file, creating it if needed.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = items.len()))]
pub async fn update_file(path: &Path, items: &[PublishedItem]) -> Result<(), Box<dyn Error>> {
    if items.is_empty() {
        return Ok(());
    }
    let existing = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    write_atomic(path, update(&existing, items).as_bytes()).await?;
    info!("Updated digest");
    Ok(())
}
