//! Persistence of structured records.
//!
//! [`ArticleStore`] is the narrow interface to the hosted table: a keyed
//! upsert and an ordered read. [`persist`] is the store writer stage; it
//! stamps `updated_at` at write time so re-running the pipeline overwrites
//! rows instead of adding new ones.

pub mod memory;
pub mod supabase;

use crate::errors::PersistenceError;
use crate::models::StructuredRecord;
use crate::utils::now_iso;
use itertools::Itertools;
use tracing::{info, instrument, warn};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

pub trait ArticleStore {
    /// Insert or update `records`, resolving conflicts on `id`. Returns rows written.
    async fn upsert(&self, records: &[StructuredRecord]) -> Result<usize, PersistenceError>;

    /// Newest rows first by `published_at` (unknown dates last), at most `limit`.
    async fn recent(&self, limit: usize) -> Result<Vec<StructuredRecord>, PersistenceError>;
}

/// Collapse records sharing an `id`, keeping the last one at its own position.
pub fn dedupe_by_id(records: Vec<StructuredRecord>) -> Vec<StructuredRecord> {
    let mut kept: Vec<StructuredRecord> = records
        .into_iter()
        .rev()
        .unique_by(|r| r.id.clone())
        .collect();
    kept.reverse();
    kept
}

/// Stamp `updated_at` and upsert every record. Errors are fatal to the run.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn persist<S>(store: &S, records: &[StructuredRecord]) -> Result<usize, PersistenceError>
where
    S: ArticleStore,
{
    if records.is_empty() {
        info!("Nothing to persist");
        return Ok(0);
    }

    let stamp = now_iso();
    let stamped: Vec<StructuredRecord> = records
        .iter()
        .cloned()
        .map(|mut r| {
            r.updated_at = Some(stamp.clone());
            r
        })
        .collect();

    let batch = dedupe_by_id(stamped);
    if batch.len() < records.len() {
        warn!(
            dropped = records.len() - batch.len(),
            "Duplicate ids in batch; keeping the last of each"
        );
    }

    let written = store.upsert(&batch).await?;
    info!(written, updated_at = %stamp, "Upserted records");
    Ok(written)
}
