//! Turning plain article text into a Blogger post body.
//!
//! Content is split on blank lines, each non-empty paragraph gets its own
//! styled `<p>`, and an optional image leads the post. The result is capped
//! at a fixed number of characters; overflow is cut off, not rejected.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write;

use crate::error::PublishError;
use crate::utils::truncate_chars;

const CONTAINER_OPEN: &str = r#"<div style="font-family: Arial, sans-serif; line-height: 1.6;">"#;
const CONTAINER_CLOSE: &str = "</div>";

/// A post that passed validation and is ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPost {
    pub title: String,
    pub html: String,
    /// Whether the HTML was cut to fit the size limit.
    pub truncated: bool,
}

/// Validate, format, and size-limit a post. Performs no I/O.
pub fn prepare(
    title: &str,
    content: &str,
    image_url: Option<&str>,
    max_chars: usize,
) -> Result<PreparedPost, PublishError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PublishError::EmptyTitle);
    }
    if content.trim().is_empty() {
        return Err(PublishError::EmptyContent);
    }

    let html = format_html(title, content, image_url);
    let limited = truncate_chars(&html, max_chars);
    Ok(PreparedPost {
        title: title.to_string(),
        truncated: limited.len() != html.len(),
        html: limited.to_string(),
    })
}

/// Wrap content in the styled container used for every post.
pub fn format_html(title: &str, content: &str, image_url: Option<&str>) -> String {
    let mut html = String::from(CONTAINER_OPEN);

    if let Some(src) = image_url.filter(|s| !s.trim().is_empty()) {
        write!(
            html,
            r#"<img src="{}" alt="{}" style="max-width: 100%; height: auto; margin-bottom: 20px;"><br>"#,
            encode_double_quoted_attribute(src.trim()),
            encode_double_quoted_attribute(title),
        )
        .unwrap();
    }

    for para in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        write!(html, r#"<p style="margin-bottom: 15px;">{}</p>"#, encode_text(para)).unwrap();
    }

    html.push_str(CONTAINER_CLOSE);
    html
}
