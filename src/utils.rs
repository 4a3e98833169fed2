//! Small helpers shared across the pipeline stages.
//!
//! - Ordered strategy selection ([`first_match`])
//! - Timestamps and whitespace normalization
//! - String truncation for logging
//! - JSON error classification for truncated model replies
//! - File system validation for the data directory

use chrono::{SecondsFormat, Utc};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Run strategies in order and return the first result accepted by `accept`.
///
/// Each strategy is only evaluated once every earlier one has produced
/// nothing or been rejected.
///
/// # Examples
///
/// ```ignore
/// let strategies: [fn() -> Option<&'static str>; 3] = [|| None, || Some("short"), || Some("long enough")];
/// assert_eq!(first_match(strategies, |s| s.len() > 5), Some("long enough"));
/// ```
pub fn first_match<T, I, F, P>(strategies: I, accept: P) -> Option<T>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Option<T>,
    P: Fn(&T) -> bool,
{
    strategies
        .into_iter()
        .filter_map(|strategy| strategy())
        .find(|candidate| accept(candidate))
}

/// Current UTC time as an ISO-8601 string, e.g. `2025-05-06T14:30:00Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Detect if a serde_json error indicates truncated/incomplete JSON.
///
/// When the model reply is cut off (e.g. by a token limit) the JSON fails
/// with an EOF error; the structurer re-asks once in that case.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Data directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
