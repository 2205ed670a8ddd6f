//! JSON file persistence for the ledger and the failed-posts file.
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a crash mid-write leaves the previous file intact.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::models::FailedPublication;

/// Read a JSON document, returning `T::default()` when the file does not exist.
pub async fn read_json_or_default<T>(path: &Path) -> Result<T, Box<dyn Error>>
where
    T: DeserializeOwned + Default,
{
    match fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

/// Serialize `value` as pretty JSON and replace `path` with it.
pub async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes).await
}

/// Write bytes via a temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Overwrite the failed-posts file with this run's permanent failures.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = failed.len()))]
pub async fn write_failed(path: &Path, failed: &[FailedPublication]) -> Result<(), Box<dyn Error>> {
    write_json(path, failed).await?;
    info!("Saved failed posts for manual follow-up");
    Ok(())
}
