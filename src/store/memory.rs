//! In-process article table, used for `--dry-run` and tests.

use super::ArticleStore;
use crate::errors::PersistenceError;
use crate::models::StructuredRecord;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, StructuredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn get(&self, id: &str) -> Option<StructuredRecord> {
        self.rows.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

/// `published_at` descending, rows without a date last.
pub fn newest_first(a: &StructuredRecord, b: &StructuredRecord) -> Ordering {
    match (&a.published_at, &b.published_at) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl ArticleStore for MemoryStore {
    async fn upsert(&self, records: &[StructuredRecord]) -> Result<usize, PersistenceError> {
        let mut rows = self.rows.write().await;
        for record in records {
            rows.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<StructuredRecord>, PersistenceError> {
        let rows = self.rows.read().await;
        let mut out: Vec<StructuredRecord> = rows.values().cloned().collect();
        out.sort_by(|a, b| newest_first(a, b).then_with(|| a.id.cmp(&b.id)));
        out.truncate(limit);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(id: &str, published_at: Option<&str>) -> StructuredRecord {
        StructuredRecord {
            id: id.to_string(),
            title: id.to_string(),
            author: None,
            published_at: published_at.map(str::to_string),
            summary: String::new(),
            tags: vec![],
            source_url: format!("http://x/{id}"),
            extracted_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_recent_orders_by_published_desc_with_limit() {
        let store = MemoryStore::new();
        store
            .upsert(&[
                dated("old", Some("2024-01-01T00:00:00Z")),
                dated("undated", None),
                dated("new", Some("2024-03-01T00:00:00Z")),
                dated("mid", Some("2024-02-01T00:00:00Z")),
            ])
            .await
            .unwrap();

        let ids: Vec<String> = store.recent(10).await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old", "undated"]);

        assert_eq!(store.recent(2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_by_id() {
        let store = MemoryStore::new();
        store.upsert(&[dated("abc", None)]).await.unwrap();
        store.upsert(&[dated("abc", Some("2024-01-01"))]).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("abc").await.unwrap().published_at.as_deref(), Some("2024-01-01"));
    }
}
