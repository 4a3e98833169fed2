//! Supabase (PostgREST) backed article table.
//!
//! - upsert: `POST {url}/rest/v1/{table}?on_conflict=id` with
//!   `Prefer: resolution=merge-duplicates,return=minimal`
//! - read: `GET {url}/rest/v1/{table}?select=*&order=published_at.desc.nullslast&limit=N`

use super::ArticleStore;
use crate::errors::PersistenceError;
use crate::models::StructuredRecord;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SupabaseStore {
    /// Build a store from the project URL and anon/service key.
    ///
    /// Both are required; a missing one is reported by its environment variable name.
    pub fn new(
        url: Option<&str>,
        api_key: Option<&str>,
        table: &str,
    ) -> Result<Self, PersistenceError> {
        let base_url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or(PersistenceError::MissingCredentials("SUPABASE_URL"))?;
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(PersistenceError::MissingCredentials("SUPABASE_ANON_KEY"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PersistenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    error!(status = status.as_u16(), %message, "Store request rejected");
    Err(PersistenceError::Status {
        status: status.as_u16(),
        message,
    })
}

impl ArticleStore for SupabaseStore {
    #[instrument(level = "info", skip_all, fields(table = %self.table, rows = records.len()))]
    async fn upsert(&self, records: &[StructuredRecord]) -> Result<usize, PersistenceError> {
        let request = self
            .http
            .post(self.table_url())
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(records);
        let response = self.authed(request).send().await?;
        check_status(response).await?;
        debug!("Upsert accepted");
        Ok(records.len())
    }

    #[instrument(level = "info", skip_all, fields(table = %self.table, limit = limit))]
    async fn recent(&self, limit: usize) -> Result<Vec<StructuredRecord>, PersistenceError> {
        let limit = limit.to_string();
        let request = self.http.get(self.table_url()).query(&[
            ("select", "*"),
            ("order", "published_at.desc.nullslast"),
            ("limit", limit.as_str()),
        ]);
        let response = check_status(self.authed(request).send().await?).await?;
        let raw = response.text().await?;
        let rows: Vec<StructuredRecord> = serde_json::from_str(&raw)?;
        Ok(rows)
    }
}
