//! Turning the raw corpus blob into structured records.
//!
//! Each document chunk gets a deterministic fallback record first. The
//! model's reply is then layered on top of it: any field the model leaves
//! out or leaves falsy (null, empty string, empty list, ...) takes the
//! fallback's value. When the model call or its reply fails in any way the
//! fallback is emitted unchanged, so every input document yields exactly one
//! record and the batch always completes.

pub mod fallback;
pub mod json;

use crate::api::AskAsync;
use crate::corpus::{ParsedDocument, parse_document, split_chunks};
use crate::errors::StructureError;
use crate::models::StructuredRecord;
use crate::utils::{now_iso, truncate_for_log};
use fallback::{derive_id, naive_summary};
use futures::stream::{self, StreamExt};
use json::best_effort_json;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

/// The record built from the document alone, with no model involvement.
pub fn fallback_record(doc: &ParsedDocument, extracted_at: &str) -> StructuredRecord {
    StructuredRecord {
        id: derive_id(&doc.source_url),
        title: doc.title.clone(),
        author: doc.author.clone(),
        published_at: doc.published_at.clone(),
        summary: naive_summary(&doc.body),
        tags: Vec::new(),
        source_url: doc.source_url.clone(),
        extracted_at: extracted_at.to_string(),
        updated_at: None,
    }
}

/// JavaScript-style truthiness: null, false, 0, "", [] and {} are falsy.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Fill every missing or falsy field of the model's object from `fallback`.
///
/// Truthy model values always win. The result must match the record schema.
pub fn merge_with_fallback(
    mut model_obj: Map<String, Value>,
    fallback: &StructuredRecord,
) -> Result<StructuredRecord, StructureError> {
    let Value::Object(floor) = serde_json::to_value(fallback).map_err(StructureError::Schema)?
    else {
        return Err(StructureError::NotObject);
    };

    for (key, value) in floor {
        if model_obj.get(&key).is_none_or(is_falsy) {
            model_obj.insert(key, value);
        }
    }
    serde_json::from_value(Value::Object(model_obj)).map_err(StructureError::Schema)
}

/// Ask the model about one chunk and merge its reply over `fallback`.
///
/// A reply that looks cut off is asked for once more.
async fn normalize<M>(
    model: &M,
    chunk: &str,
    fallback: &StructuredRecord,
) -> Result<StructuredRecord, StructureError>
where
    M: AskAsync<Response = String>,
{
    let reply = model.ask(chunk).await?;
    debug!(reply = %truncate_for_log(&reply, 160), "Model reply");

    let obj = match best_effort_json(&reply) {
        Err(StructureError::Truncated(e)) => {
            warn!(id = %fallback.id, error = %e, "Reply looks truncated; re-asking once");
            let retry = model.ask(chunk).await?;
            best_effort_json(&retry)?
        }
        other => other?,
    };
    merge_with_fallback(obj, fallback)
}

/// Structure one document chunk. Never fails: errors yield the fallback record.
#[instrument(level = "info", skip_all)]
pub async fn structure_document<M>(model: &M, chunk: &str, extracted_at: &str) -> StructuredRecord
where
    M: AskAsync<Response = String>,
{
    let doc = parse_document(chunk);
    let fallback = fallback_record(&doc, extracted_at);

    match normalize(model, chunk, &fallback).await {
        Ok(record) => {
            info!(id = %record.id, tags = record.tags.len(), "Structured article via model");
            record
        }
        Err(e) => {
            warn!(id = %fallback.id, error = %e, "Falling back to local record");
            fallback
        }
    }
}

/// Structure every document in `blob`, at most `concurrency` model calls at a time.
///
/// Output order matches the order of documents in the blob.
#[instrument(level = "info", skip_all, fields(concurrency = concurrency))]
pub async fn structure<M>(model: &M, blob: &str, concurrency: usize) -> Vec<StructuredRecord>
where
    M: AskAsync<Response = String>,
{
    let chunks = split_chunks(blob);
    let extracted_at = now_iso();
    info!(docs = chunks.len(), "Structuring documents");

    let records: Vec<StructuredRecord> = stream::iter(chunks)
        .map(|chunk| structure_document(model, chunk, &extracted_at))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    info!(records = records.len(), "Structured documents");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    const DOC: &str = "SOURCE_URL: http://x/hurricanes/news/foo-bar-123\nTITLE: Foo\nAUTHOR: Jane\nPUBLISHED: 2024-01-01T00:00:00Z\n\nSentence one. Sentence two. Sentence three.\n---ENDDOC---\n";

    /// Replays scripted replies; `None` simulates a failed call.
    struct ScriptedModel {
        replies: RefCell<VecDeque<Option<String>>>,
        seen: RefCell<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self::new(vec![])
        }
    }

    impl AskAsync for ScriptedModel {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, FetchError> {
            self.seen.borrow_mut().push(text.to_string());
            match self.replies.borrow_mut().pop_front().flatten() {
                Some(reply) => Ok(reply),
                None => Err(FetchError::Body {
                    url: "stub".to_string(),
                    message: "simulated timeout".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_model_failure_yields_fallback_record() {
        let model = ScriptedModel::failing();
        let records = structure(&model, DOC, 1).await;

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.id, "foo-bar-123");
        assert_eq!(r.title, "Foo");
        assert_eq!(r.author.as_deref(), Some("Jane"));
        assert_eq!(r.published_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(r.summary, "Sentence one. Sentence two.");
        assert!(r.tags.is_empty());
        assert_eq!(r.source_url, "http://x/hurricanes/news/foo-bar-123");
        assert_eq!(r.updated_at, None);
    }

    #[tokio::test]
    async fn test_model_reply_missing_tags_keeps_empty_tags() {
        let reply = r#"{"id": "foo-bar-123", "title": "Foo!", "summary": "Model summary. Two sentences."}"#;
        let model = ScriptedModel::new(vec![Some(reply)]);
        let records = structure(&model, DOC, 1).await;

        let r = &records[0];
        assert_eq!(r.title, "Foo!");
        assert_eq!(r.summary, "Model summary. Two sentences.");
        assert_eq!(r.tags, Vec::<String>::new());
        assert_eq!(r.author.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_falsy_model_values_are_floored() {
        let reply = r#"Here is the JSON: {"id": "", "title": "Foo", "author": null, "summary": "", "tags": ["canes", "recap"], "source_url": ""} done."#;
        let model = ScriptedModel::new(vec![Some(reply)]);
        let records = structure(&model, DOC, 1).await;

        let r = &records[0];
        assert_eq!(r.id, "foo-bar-123");
        assert_eq!(r.author.as_deref(), Some("Jane"));
        assert_eq!(r.summary, "Sentence one. Sentence two.");
        assert_eq!(r.tags, vec!["canes".to_string(), "recap".to_string()]);
        assert_eq!(r.source_url, "http://x/hurricanes/news/foo-bar-123");
    }

    #[tokio::test]
    async fn test_non_json_and_wrong_types_fall_back() {
        let model = ScriptedModel::new(vec![
            Some("I cannot help with that."),
            Some(r#"{"tags": "canes, recap"}"#),
        ]);
        let blob = format!("{DOC}{DOC}");
        let records = structure(&model, &blob, 1).await;

        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.summary, "Sentence one. Sentence two.");
            assert!(r.tags.is_empty());
        }
    }

    #[tokio::test]
    async fn test_truncated_reply_is_asked_again() {
        let model = ScriptedModel::new(vec![
            Some(r#"{"id": "foo-bar-123", "tags": ["ca"#),
            Some(r#"{"tags": ["canes"]}"#),
        ]);
        let records = structure(&model, DOC, 1).await;

        assert_eq!(records[0].tags, vec!["canes".to_string()]);
        assert_eq!(model.seen.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_completes_and_keeps_order() {
        let blob = [
            "SOURCE_URL: http://x/hurricanes/news/first-game-recap\nTITLE: First\nAUTHOR: \nPUBLISHED: \n\nOnly one sentence here\n---ENDDOC---\n",
            "SOURCE_URL: http://x/hurricanes/news/\nTITLE: Second\nAUTHOR: \nPUBLISHED: \n\nA. B. C.\n---ENDDOC---\n",
            "SOURCE_URL: http://x/hurricanes/news/third-game-recap\nTITLE: Third\nAUTHOR: \nPUBLISHED: \n\n\n---ENDDOC---\n",
        ]
        .concat();
        let model = ScriptedModel::new(vec![None, Some(r#"{"tags": ["x"]}"#), None]);
        let records = structure(&model, &blob, 1).await;

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        assert_eq!(records[0].id, "first-game-recap");
        assert_eq!(records[0].summary, "Only one sentence here");
        assert_eq!(records[0].author, None);

        assert_eq!(records[1].id.len(), fallback::HASH_ID_WIDTH);
        assert_eq!(records[1].summary, "A. B.");
        assert_eq!(records[1].tags, vec!["x".to_string()]);

        assert_eq!(records[2].summary, "");
        assert!(records.iter().all(|r| r.extracted_at == records[0].extracted_at));
    }

    #[tokio::test]
    async fn test_model_receives_whole_document() {
        let model = ScriptedModel::failing();
        structure(&model, DOC, 1).await;
        let seen = model.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("SOURCE_URL: http://x/hurricanes/news/foo-bar-123"));
        assert!(seen[0].ends_with("Sentence three."));
    }

    #[test]
    fn test_is_falsy() {
        assert!(is_falsy(&Value::Null));
        assert!(is_falsy(&serde_json::json!("")));
        assert!(is_falsy(&serde_json::json!([])));
        assert!(is_falsy(&serde_json::json!({})));
        assert!(is_falsy(&serde_json::json!(0)));
        assert!(is_falsy(&serde_json::json!(false)));
        assert!(!is_falsy(&serde_json::json!("x")));
        assert!(!is_falsy(&serde_json::json!(["x"])));
    }
}
