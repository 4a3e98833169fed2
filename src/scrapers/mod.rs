//! Scraping of the configured news section.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Discovery** ([`links`]): walk the paginated index and collect article URLs
//! 2. **Extraction** ([`article`]): download each article and pull out its fields
//!
//! Fetches go through one shared [`Fetcher`], whose pacer keeps requests to
//! the origin at least the configured delay apart. Failed article fetches are
//! logged and skipped without failing the batch.

pub mod article;
pub mod links;

use crate::http::Fetcher;
use crate::models::{ArticleLink, RawArticle};
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument};

/// Extract every link, at most `concurrency` at a time.
///
/// Output keeps the order of `links`; failing links are dropped.
#[instrument(level = "info", skip_all, fields(links = links.len(), concurrency = concurrency))]
pub async fn fetch_articles(
    fetcher: &Fetcher,
    links: &[ArticleLink],
    concurrency: usize,
) -> Vec<RawArticle> {
    let results: Vec<Option<RawArticle>> = stream::iter(links)
        .map(|link| async move {
            match article::extract(fetcher, link).await {
                Ok(article) => Some(article),
                Err(e) => {
                    error!(error = %e, url = %link, "Article fetch failed; skipping");
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let articles: Vec<RawArticle> = results.into_iter().flatten().collect();
    info!(
        fetched = articles.len(),
        failed = links.len() - articles.len(),
        "Fetched article contents"
    );
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::http::test_server;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_fetch_articles_skips_failures_and_keeps_order() {
        let mut pages = HashMap::new();
        pages.insert("/hurricanes/news/first-story-here".to_string(), "<h1>First</h1>".to_string());
        pages.insert("/hurricanes/news/third-story-here".to_string(), "<h1>Third</h1>".to_string());
        let base = test_server::serve(pages, 3);

        let fetcher = Fetcher::new(&HttpConfig {
            request_delay_ms: 0,
            ..HttpConfig::default()
        })
        .unwrap();
        let links: Vec<ArticleLink> = ["first-story-here", "missing-story-here", "third-story-here"]
            .iter()
            .map(|slug| ArticleLink(format!("{base}/hurricanes/news/{slug}")))
            .collect();

        let articles = fetch_articles(&fetcher, &links, 2).await;
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third"]);
    }
}
