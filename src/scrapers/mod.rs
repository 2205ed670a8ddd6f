//! News source scraper.
//!
//! The collector follows a two-phase pattern:
//!
//! 1. **Indexing**: Read the listing page and pull out per-article metadata
//! 2. **Fetching**: Download each article page and extract its full text
//!
//! Both phases degrade instead of failing: a listing that cannot be fetched
//! yields no items, and an article page that cannot be fetched yields an
//! item whose body is [`ada::CONTENT_NOT_FOUND`].

pub mod ada;
