//! Deterministic, model-free pieces of a record: identifier and summary.

use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Character budget for a summary built by shortening the body.
pub const SUMMARY_MAX_CHARS: usize = 400;

/// Hex characters kept from the URL hash when the slug is unusable.
pub const HASH_ID_WIDTH: usize = 16;

const ELLIPSIS: &str = "…";

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

/// Stable identifier for an article URL.
///
/// The final path segment when it is a usable slug, otherwise the first
/// [`HASH_ID_WIDTH`] hex characters of the URL's SHA-256.
pub fn derive_id(url: &str) -> String {
    let slug = url.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if slug.is_empty() || slug.eq_ignore_ascii_case("news") {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        digest[..HASH_ID_WIDTH].to_string()
    } else {
        slug.to_string()
    }
}

/// Split text after `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // The punctuation is one ASCII byte.
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Collapse whitespace and cut on a word boundary so the result, ellipsis
/// included, fits in `width` characters.
pub fn shorten(text: &str, width: usize) -> String {
    let collapsed = collapse_whitespace(text);
    if collapsed.chars().count() <= width {
        return collapsed;
    }

    let budget = width.saturating_sub(ELLIPSIS.chars().count());
    let mut out = String::new();
    let mut used = 0;
    for word in collapsed.split(' ') {
        let extra = word.chars().count() + usize::from(!out.is_empty());
        if used + extra > budget {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += extra;
    }
    out.push_str(ELLIPSIS);
    out
}

/// First two sentences of the body, or the shortened body when it has fewer.
pub fn naive_summary(body: &str) -> String {
    if body.trim().is_empty() {
        return String::new();
    }
    let sentences = split_sentences(body);
    if sentences.len() >= 2 {
        sentences[..2].join(" ")
    } else {
        shorten(body, SUMMARY_MAX_CHARS)
    }
}
