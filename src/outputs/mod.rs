//! Files written at the end of a run.
//!
//! # Submodules
//!
//! - [`json`]: JSON persistence for the ledger and the failed-posts file
//! - [`digest`]: The rolling markdown digest
//!
//! # Output Structure
//!
//! ```text
//! ./
//! ├── news_log.json       # Ledger of published articles
//! ├── README.md           # Digest (static preamble + newest-first sections)
//! └── failed_posts.json   # Posts that exhausted their retries (last run only)
//! ```

pub mod digest;
pub mod json;
