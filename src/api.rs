//! Blogger v3 publishing client.
//!
//! # Architecture
//!
//! - [`Publish`]: Core trait for creating one post on the destination blog
//! - [`BloggerClient`]: Implementation against the Blogger REST API
//!
//! Every call validates and formats the post first (see [`crate::post`]),
//! so an invalid post never reaches the network. Then it acquires a token,
//! checks that the blog is reachable with that token, and inserts the post.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::auth::TokenSource;
use crate::error::PublishError;
use crate::post::prepare;
use crate::utils::truncate_for_log;

/// Identifiers the platform assigns to a new post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PostReceipt {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Creates posts on an external platform.
///
/// Implementors report every failure through [`PublishError`]; they never
/// panic, so one bad item cannot abort a batch.
pub trait Publish {
    async fn publish(
        &self,
        title: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<PostReceipt, PublishError>;
}

#[derive(Serialize)]
struct BlogRef<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct NewPost<'a> {
    kind: &'static str,
    blog: BlogRef<'a>,
    title: &'a str,
    content: &'a str,
}

/// Publishes to one Blogger blog.
#[derive(Debug)]
pub struct BloggerClient {
    http: Client,
    api_base: String,
    blog_id: String,
    max_content_chars: usize,
    tokens: TokenSource,
}

impl BloggerClient {
    pub fn new(
        http: Client,
        api_base: impl Into<String>,
        blog_id: impl Into<String>,
        max_content_chars: usize,
        tokens: TokenSource,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into(),
            blog_id: blog_id.into(),
            max_content_chars,
            tokens,
        }
    }

    /// Confirm the token grants access to the destination blog.
    async fn verify_access(&self, token: &str) -> Result<(), PublishError> {
        let url = format!("{}/blogs/{}", self.api_base, self.blog_id);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::AccessDenied {
                blog_id: self.blog_id.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn insert(&self, token: &str, title: &str, html: &str) -> Result<PostReceipt, PublishError> {
        let url = format!("{}/blogs/{}/posts", self.api_base, self.blog_id);
        let body = NewPost {
            kind: "blogger#post",
            blog: BlogRef { id: &self.blog_id },
            title,
            content: html,
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: truncate_for_log(&text, 300),
            });
        }
        Ok(response.json().await?)
    }

    async fn try_publish(
        &self,
        title: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<PostReceipt, PublishError> {
        let post = prepare(title, content, image_url, self.max_content_chars)?;
        if post.truncated {
            warn!(limit = self.max_content_chars, "Post content exceeded limit; truncated");
        }
        let token = self.tokens.access_token().await?;
        self.verify_access(&token).await?;
        self.insert(&token, &post.title, &post.html).await
    }
}

impl Publish for BloggerClient {
    #[instrument(level = "info", skip_all, fields(%title))]
    async fn publish(
        &self,
        title: &str,
        content: &str,
        image_url: Option<&str>,
    ) -> Result<PostReceipt, PublishError> {
        let t0 = Instant::now();
        let res = self.try_publish(title, content, image_url).await;
        let dt = t0.elapsed();

        match &res {
            Ok(receipt) => info!(
                elapsed_ms = dt.as_millis() as u64,
                post_id = %receipt.id,
                post_url = receipt.url.as_deref().unwrap_or("URL not available"),
                "Published post"
            ),
            Err(e) => error!(elapsed_ms = dt.as_millis() as u64, error = %e, "Failed to publish post"),
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StoredToken, test_secrets};
    use chrono::{Duration, Utc};
    use std::path::PathBuf;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client_for(server: &MockServer, max_chars: usize) -> BloggerClient {
        let tokens = TokenSource::new(
            Client::new(),
            test_secrets(&format!("{}/token", server.uri())),
            PathBuf::from("unused.json"),
            Some(StoredToken {
                access_token: "tok".to_string(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            }),
        );
        BloggerClient::new(Client::new(), server.uri(), "42", max_chars, tokens)
    }

    async fn mount_blog(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/blogs/42"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "42"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_publish_returns_post_id() {
        let server = MockServer::start().await;
        mount_blog(&server).await;
        Mock::given(method("POST"))
            .and(path("/blogs/42/posts"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "blogger#post",
                "id": "777",
                "url": "https://blog.example.com/2026/10/post.html"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client_for(&server, 100_000)
            .publish("Title", "Body text", Some("https://cdn.example.com/i.jpg"))
            .await
            .unwrap();

        assert_eq!(receipt.id, "777");
        assert_eq!(receipt.url.as_deref(), Some("https://blog.example.com/2026/10/post.html"));

        let requests = server.received_requests().await.unwrap();
        let insert: &Request = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
        assert_eq!(body["kind"], "blogger#post");
        assert_eq!(body["blog"]["id"], "42");
        assert_eq!(body["title"], "Title");
        assert!(body["content"].as_str().unwrap().contains("<img src=\"https://cdn.example.com/i.jpg\""));
    }

    #[tokio::test]
    async fn test_invalid_post_makes_no_request() {
        let server = MockServer::start().await;
        let client = client_for(&server, 100_000);

        assert!(matches!(
            client.publish("", "Body", None).await,
            Err(PublishError::EmptyTitle)
        ));
        assert!(matches!(
            client.publish("Title", "   ", None).await,
            Err(PublishError::EmptyContent)
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_content_is_truncated_not_rejected() {
        let server = MockServer::start().await;
        mount_blog(&server).await;
        Mock::given(method("POST"))
            .and(path("/blogs/42/posts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .mount(&server)
            .await;

        let long = "paragraph text ".repeat(2_000);
        client_for(&server, 1_000).publish("Title", &long, None).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
        let body: serde_json::Value = serde_json::from_slice(&insert.body).unwrap();
        assert_eq!(body["content"].as_str().unwrap().chars().count(), 1_000);
    }

    #[tokio::test]
    async fn test_inaccessible_blog_fails_without_posting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs/42"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server, 100_000)
            .publish("Title", "Body", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::AccessDenied { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_platform_rejection_is_reported() {
        let server = MockServer::start().await;
        mount_blog(&server).await;
        Mock::given(method("POST"))
            .and(path("/blogs/42/posts"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = client_for(&server, 100_000)
            .publish("Title", "Body", None)
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected { status: 429, ref body } if body == "rate limited"));
    }
}
