//! Read side used by the dashboard: the newest stored articles as text lines.

use crate::models::StructuredRecord;
use std::fmt::Write;

/// Ids with this prefix are store smoke-test rows, never real articles.
pub const TEST_ROW_PREFIX: &str = "test_";

pub fn visible_rows(rows: Vec<StructuredRecord>) -> Vec<StructuredRecord> {
    rows.into_iter()
        .filter(|r| !r.id.starts_with(TEST_ROW_PREFIX))
        .collect()
}

/// One line per article: date, author, title, then the link and summary indented.
pub fn render_rows(rows: &[StructuredRecord]) -> String {
    let mut out = String::new();
    for r in rows {
        let date = r
            .published_at
            .as_deref()
            .and_then(|p| p.get(..10))
            .unwrap_or("----------");
        let author = r.author.as_deref().unwrap_or("Unknown");
        let _ = writeln!(out, "{date}  {author:<20}  {}", r.title);
        let _ = writeln!(out, "    {}", r.source_url);
        if !r.summary.is_empty() {
            let _ = writeln!(out, "    {}", r.summary);
        }
    }
    out
}
