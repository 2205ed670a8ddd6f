//! Command-line interface definitions for the news poster.
//!
//! Required values can come from flags, the environment, or a `.env` file
//! loaded before parsing. Tuning knobs live in the optional YAML settings
//! file (see [`crate::config::Settings`]).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the news poster.
///
/// # Examples
///
/// ```sh
/// # One-time: grant the app access to the blog
/// news_poster --blog-id 1234567890 authorize
///
/// # Scheduled run (default command)
/// news_poster --blog-id 1234567890
///
/// # With a settings file
/// news_poster -c settings.yaml run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Blogger blog the posts are created under
    #[arg(long, env = "BLOG_ID")]
    pub blog_id: Option<String>,

    /// OAuth client secrets downloaded from the Google console
    #[arg(long, env = "BLOGGER_CREDENTIALS", default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Where the OAuth token is cached between runs
    #[arg(long, env = "BLOGGER_TOKEN", default_value = "token.json")]
    pub token: PathBuf,

    /// Optional path to a settings.yaml file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Scrape, publish new articles, and update the ledger and digest
    Run,
    /// Grant access interactively and store a refreshable token
    Authorize,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}
