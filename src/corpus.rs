//! The raw corpus blob: the on-disk hand-off between scraping and structuring.
//!
//! Each article is rendered as a fixed header block, a blank line, the body,
//! and an end-of-document marker on its own line:
//!
//! ```text
//! SOURCE_URL: https://www.nhl.com/hurricanes/news/canes-beat-devils-4-2
//! TITLE: Canes beat Devils 4-2
//! AUTHOR: Walt Ruff
//! PUBLISHED: 2024-01-01T00:00:00Z
//!
//! Body text...
//! ---ENDDOC---
//! ```
//!
//! Missing author or publish date are written as empty header values and
//! read back as `None`.

use crate::models::RawArticle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

pub const END_MARKER: &str = "---ENDDOC---";

static SOURCE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^SOURCE_URL:[ \t]*(.*)$").expect("valid header regex"));
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^TITLE:[ \t]*(.*)$").expect("valid header regex"));
static AUTHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^AUTHOR:[ \t]*(.*)$").expect("valid header regex"));
static PUBLISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^PUBLISHED:[ \t]*(.*)$").expect("valid header regex"));

/// One document chunk with its header fields recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub source_url: String,
    pub title: String,
    pub author: Option<String>,
    pub published_at: Option<String>,
    pub body: String,
}

/// Render articles into one blob, in order.
pub fn serialize(articles: &[RawArticle]) -> String {
    let mut blob = String::new();
    for a in articles {
        // Writing into a String cannot fail.
        let _ = write!(
            blob,
            "SOURCE_URL: {}\nTITLE: {}\nAUTHOR: {}\nPUBLISHED: {}\n\n{}\n{}\n",
            single_line(&a.source_url),
            single_line(&a.title),
            single_line(a.author.as_deref().unwrap_or("")),
            single_line(a.published.as_deref().unwrap_or("")),
            a.body.trim(),
            END_MARKER,
        );
    }
    blob
}

/// Header values must stay on one line or the fixed-field patterns misread them.
///
/// Only line breaks are replaced; inner spacing is kept so values read back exactly.
fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

/// Split a blob into trimmed, non-empty document chunks.
pub fn split_chunks(blob: &str) -> Vec<&str> {
    blob.split(END_MARKER)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

fn header(re: &Regex, doc: &str) -> Option<String> {
    re.captures(doc)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Recover header fields and body from one chunk.
///
/// The body is everything after the first blank line. Missing headers
/// degrade to empty strings (`source_url`, `title`) or `None`.
pub fn parse_document(doc: &str) -> ParsedDocument {
    let body = doc
        .split_once("\n\n")
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default();

    ParsedDocument {
        source_url: header(&SOURCE_URL, doc).unwrap_or_default(),
        title: header(&TITLE, doc).unwrap_or_default(),
        author: header(&AUTHOR, doc).filter(|a| !a.is_empty()),
        published_at: header(&PUBLISHED, doc).filter(|p| !p.is_empty()),
        body,
    }
}
