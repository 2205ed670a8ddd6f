//! # News Poster
//!
//! Scrapes a news listing page, publishes articles it has not seen before to
//! a Blogger blog, and keeps two files up to date: a JSON ledger of what was
//! posted and a rolling markdown digest.
//!
//! ## Usage
//!
//! ```sh
//! news_poster --blog-id 1234567890 authorize   # once
//! news_poster --blog-id 1234567890             # from cron
//! ```
//!
//! ## Architecture
//!
//! 1. **Collecting**: Read the listing and each article page
//! 2. **Deduplicating**: Drop articles whose URL or title is in the ledger
//! 3. **Publishing**: Post each article, spaced out by a fixed delay
//! 4. **Retrying**: Re-post failures with a shared attempt budget
//! 5. **Recording**: Extend the ledger and digest; set aside permanent failures

use clap::Parser;
use std::error::Error;
use std::io::{self, BufRead, Write};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod auth;
mod cli;
mod config;
mod error;
mod ledger;
mod models;
mod outputs;
mod pipeline;
mod post;
mod retry;
mod scrapers;
mod utils;

use api::BloggerClient;
use auth::TokenSource;
use cli::{Cli, Command};
use config::Config;
use scrapers::ada::Collector;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Err(e) = dotenvy::dotenv() {
        debug!(error = %e, "No .env file loaded");
    }

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration (fail fast, before any network activity) ----
    let config = match Config::resolve(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(blog_id = %config.blog_id, listing = %config.listing_url, "Configuration loaded");

    let http = config.http_client()?;
    let tokens = TokenSource::load(http.clone(), &config.credentials_path, &config.token_path)
        .inspect_err(|e| error!(error = %e, "Failed to load OAuth credentials"))?;

    match args.command() {
        Command::Authorize => authorize(&tokens).await,
        Command::Run => {
            // ---- Credentials (fail before scraping if unusable) ----
            if let Err(e) = tokens.access_token().await {
                error!(error = %e, "Cannot obtain Blogger credentials; nothing was changed");
                return Err(e.into());
            }

            let collector = Collector::new(http.clone(), config.listing_url.clone());
            let publisher = BloggerClient::new(
                http,
                config.api_base.clone(),
                config.blog_id.clone(),
                config.max_content_chars,
                tokens,
            );

            let report = pipeline::run(&config, &collector, &publisher).await?;
            info!(
                collected = report.collected,
                new = report.fresh,
                published = report.published,
                failed = report.failed,
                "Execution complete"
            );
            Ok(())
        }
    }
}

/// Walk the operator through the one-time consent flow.
async fn authorize(tokens: &TokenSource) -> Result<(), Box<dyn Error>> {
    println!("Open this URL in a browser and grant access:\n\n{}\n", tokens.authorization_url());
    println!("After approving, the browser is sent to {}?code=…", auth::REDIRECT_URI);
    print!("Paste the value of the `code` parameter here: ");
    io::stdout().flush()?;

    let mut code = String::new();
    io::stdin().lock().read_line(&mut code)?;
    if code.trim().is_empty() {
        return Err("no authorization code entered".into());
    }

    let token = tokens.exchange_code(&code).await?;
    info!(expires_at = %token.expires_at, "Authorization complete; token saved");
    if token.refresh_token.is_none() {
        error!("No refresh token was issued; scheduled runs will stop working when this token expires");
    }
    Ok(())
}
