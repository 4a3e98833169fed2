//! The structured record file (`structured.json`).
//!
//! A pretty-printed JSON array of [`StructuredRecord`], in blob order. This
//! is the contract between the structure and load stages.

use crate::models::StructuredRecord;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Overwrite `path` with `records`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), records = records.len()))]
pub async fn write_records(records: &[StructuredRecord], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create data dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!("Wrote structured records");
    Ok(())
}

/// Read the records written by [`write_records`].
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_records(path: &Path) -> Result<Vec<StructuredRecord>, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let records: Vec<StructuredRecord> = serde_json::from_str(&raw)?;
    info!(records = records.len(), "Read structured records");
    Ok(records)
}
