//! Article page extraction.
//!
//! The origin's markup differs between templates, so every field is pulled
//! with a forgiving heuristic and missing elements degrade to empty values
//! instead of errors. The body is picked by trying [`BODY_SELECTORS`] in
//! order and keeping the first candidate with a real amount of text.

use crate::errors::FetchError;
use crate::http::Fetcher;
use crate::models::{ArticleLink, RawArticle};
use crate::utils::{collapse_whitespace, first_match};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};

/// Candidate body containers, most specific first.
pub const BODY_SELECTORS: [&str; 5] = [
    "div.article-body",
    "div.Article__Content",
    "div#story-body",
    "article",
    "main",
];

/// A body candidate must be longer than this (in characters) to be accepted.
pub const MIN_BODY_CHARS: usize = 300;

static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").expect("valid h1 selector"));
static META_AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="author"]"#).expect("valid meta selector"));
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("valid time selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid p selector"));
static BYLINE_CANDIDATES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, span, div").expect("valid byline selector"));
static BODY_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    BODY_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid body selector"))
        .collect()
});

/// Text nodes under `element`, trimmed, skipping script and style contents.
fn visible_text_nodes<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> + 'a {
    element.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript"));
        let text = text.trim();
        (!hidden && !text.is_empty()).then_some(text)
    })
}

fn joined_text(element: ElementRef<'_>, sep: &str) -> String {
    visible_text_nodes(element).collect::<Vec<_>>().join(sep)
}

pub fn extract_title(document: &Html) -> String {
    document
        .select(&H1)
        .next()
        .map(|h1| collapse_whitespace(&joined_text(h1, " ")))
        .unwrap_or_default()
}

/// Text after a leading "by " (any case), if present.
fn strip_byline_prefix(text: &str) -> Option<&str> {
    let prefix = text.get(..3)?;
    prefix.eq_ignore_ascii_case("by ").then(|| &text[3..])
}

/// Author from `<meta name="author">`, else the first `p`/`span`/`div` reading "By ...".
///
/// The whole element text counts, so a name wrapped in a link still matches.
pub fn extract_author(document: &Html) -> Option<String> {
    let from_meta = document
        .select(&META_AUTHOR)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty());
    if let Some(author) = from_meta {
        return Some(author.to_string());
    }

    document
        .select(&BYLINE_CANDIDATES)
        .map(|el| collapse_whitespace(&joined_text(el, " ")))
        .find_map(|text| strip_byline_prefix(&text).map(collapse_whitespace))
        .filter(|name| !name.is_empty())
}

/// `datetime` attribute of the first `<time>` element.
pub fn extract_published(document: &Html) -> Option<String> {
    document
        .select(&TIME)
        .next()
        .and_then(|t| t.value().attr("datetime"))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Body text from the first qualifying container, else every paragraph on the page.
pub fn extract_body(document: &Html) -> String {
    let candidates = BODY_CANDIDATES.iter().map(|selector| {
        move || {
            document
                .select(selector)
                .next()
                .map(|node| joined_text(node, "\n"))
        }
    });

    first_match(candidates, |text: &String| text.chars().count() > MIN_BODY_CHARS)
        .unwrap_or_else(|| {
            debug!("No body container qualified; falling back to paragraphs");
            document
                .select(&PARAGRAPH)
                .map(|p| collapse_whitespace(&joined_text(p, " ")))
                .collect::<Vec<_>>()
                .join("\n")
        })
}

/// Parse an article page that was fetched from `source_url`.
pub fn parse_article(source_url: &str, html: &str) -> RawArticle {
    let document = Html::parse_document(html);
    RawArticle {
        source_url: source_url.to_string(),
        title: extract_title(&document),
        author: extract_author(&document),
        published: extract_published(&document),
        body: extract_body(&document),
    }
}

/// Fetch one article page and extract its fields.
#[instrument(level = "info", skip_all, fields(url = %link))]
pub async fn extract(fetcher: &Fetcher, link: &ArticleLink) -> Result<RawArticle, FetchError> {
    let html = fetcher.fetch_html(link.as_str()).await?;
    let article = parse_article(link.as_str(), &html);
    info!(
        title = %article.title,
        body_chars = article.body.chars().count(),
        has_author = article.author.is_some(),
        "Extracted article"
    );
    Ok(article)
}
