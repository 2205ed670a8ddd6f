//! Deduplication ledger of already-published articles.
//!
//! Both the URL and the title act as independent keys: a candidate that
//! matches an existing entry on either one is a duplicate, even if the other
//! field differs. The store is a JSON array, fully re-read and rewritten on
//! every append. Stored elements are written back in their original JSON
//! form, so bare URL strings from older ledgers stay bare strings.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::models::{CandidateItem, LedgerEntry};
use crate::outputs::json::{read_json_or_default, write_json};

#[derive(Debug, Default, Clone)]
pub struct Ledger {
    urls: HashSet<String>,
    titles: HashSet<String>,
}

impl Ledger {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let mut ledger = Ledger::default();
        for entry in entries {
            ledger.insert(&entry.url, &entry.title);
        }
        ledger
    }

    /// Load the ledger file; a missing file is an empty ledger.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let entries: Vec<LedgerEntry> = read_json_or_default(path).await?;
        info!(entries = entries.len(), "Loaded ledger");
        Ok(Self::from_entries(&entries))
    }

    fn insert(&mut self, url: &str, title: &str) {
        self.urls.insert(url.to_string());
        if !title.is_empty() {
            self.titles.insert(title.to_string());
        }
    }

    /// True only if neither the URL nor the title is already recorded.
    pub fn is_new(&self, item: &CandidateItem) -> bool {
        !self.urls.contains(&item.url) && !self.titles.contains(&item.title)
    }

    /// Candidates not yet published, in their original order.
    ///
    /// A candidate colliding with an earlier one in the same batch is
    /// dropped too, so one run can never publish the same article twice.
    pub fn fresh(&self, candidates: Vec<CandidateItem>) -> Vec<CandidateItem> {
        let mut seen = self.clone();
        candidates
            .into_iter()
            .filter(|item| {
                if seen.is_new(item) {
                    seen.insert(&item.url, &item.title);
                    true
                } else {
                    debug!(url = %item.url, title = %item.title, "Skipping known article");
                    false
                }
            })
            .collect()
    }

    /// Append entries to the ledger file.
    ///
    /// Existing entries are never rewritten or removed. Entries colliding
    /// with a stored one (on URL or title) are dropped. Returns how many
    /// were actually added.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn append(path: &Path, new_entries: &[LedgerEntry]) -> Result<usize, Box<dyn Error>> {
        if new_entries.is_empty() {
            return Ok(0);
        }
        let mut stored: Vec<Value> = read_json_or_default(path).await?;
        let parsed = stored
            .iter()
            .map(LedgerEntry::deserialize)
            .collect::<Result<Vec<_>, _>>()?;
        let mut keys = Self::from_entries(&parsed);

        let before = stored.len();
        for entry in new_entries {
            let taken = keys.urls.contains(&entry.url)
                || (!entry.title.is_empty() && keys.titles.contains(&entry.title));
            if taken {
                debug!(url = %entry.url, "Entry already in ledger; not appending");
                continue;
            }
            keys.insert(&entry.url, &entry.title);
            stored.push(serde_json::to_value(entry)?);
        }
        let added = stored.len() - before;

        write_json(path, &stored).await?;
        info!(added, total = stored.len(), "Updated ledger");
        Ok(added)
    }
}
