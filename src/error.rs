//! Error types for configuration, credentials, and publishing.
//!
//! Only [`ConfigError`] (and an [`AuthError`] raised before the run starts)
//! stops the process. [`PublishError`] is per item: the pipeline turns it
//! into a failed outcome and hands the item to the retry coordinator.

use std::path::PathBuf;

use thiserror::Error;

/// Problems detected while resolving configuration, before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BLOG_ID is not set (pass --blog-id or set it in .env)")]
    MissingBlogId,

    #[error("credentials file not found at {0}; download the OAuth client secrets from the Google console")]
    MissingCredentials(PathBuf),

    #[error("failed to read settings file {path}: {message}")]
    Settings { path: PathBuf, message: String },

    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Credential acquisition failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed credentials in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("client secrets have neither an `installed` nor a `web` section")]
    NoClientSection,

    #[error("no usable token; run the `authorize` command to grant access")]
    AuthorizationRequired,

    #[error("token endpoint rejected the request (status {status}): {body}")]
    TokenRejected { status: u16, body: String },

    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Why a single post could not be published.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("post title is empty")]
    EmptyTitle,

    #[error("post content is empty")]
    EmptyContent,

    #[error("credentials unavailable: {0}")]
    Auth(#[from] AuthError),

    #[error("cannot access blog {blog_id} (status {status})")]
    AccessDenied { blog_id: String, status: u16 },

    #[error("platform rejected the post (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
