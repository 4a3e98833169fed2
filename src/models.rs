//! Data models flowing through the pipeline.
//!
//! - [`ArticleLink`]: an absolute URL that passed the article-shape filter
//! - [`RawArticle`]: one scraped page, before structuring
//! - [`StructuredRecord`]: the normalized row that ends up in the `articles` table
//!
//! `StructuredRecord` is total: every field is always serialized, `null`
//! included, so the structured record file and the store rows share one shape.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// An absolute URL pointing at an article detail page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleLink(pub String);

impl ArticleLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scraped article as pulled out of the origin HTML.
///
/// Serialized into the raw corpus blob and never stored directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawArticle {
    /// The URL the article was fetched from.
    pub source_url: String,
    /// Text of the first top-level heading, empty when the page has none.
    pub title: String,
    /// Byline, when one could be found.
    pub author: Option<String>,
    /// Machine-readable publish timestamp, as found on the page.
    pub published: Option<String>,
    /// Plain text body, paragraphs joined by newlines.
    pub body: String,
}

/// A normalized article record, keyed by `id` in the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StructuredRecord {
    /// Stable identifier derived from `source_url`; the upsert key.
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    /// ISO-8601 publish timestamp when known.
    pub published_at: Option<String>,
    /// Two or three sentence summary.
    pub summary: String,
    /// Nullable in the store; `null` and a missing key both read as no tags.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    pub source_url: String,
    /// When the record was structured.
    pub extracted_at: String,
    /// When the record was last written to the store. `None` until then.
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
