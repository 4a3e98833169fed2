//! Article link discovery on the paginated news index.
//!
//! Page 0 is the bare index URL, page `p` is `index?page=p`. Every `a[href]`
//! on a page is resolved against the index URL, restricted to the site host,
//! and kept only when its path looks like an article detail page.

use crate::config::SiteConfig;
use crate::errors::FetchError;
use crate::http::Fetcher;
use crate::models::ArticleLink;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// Final path segments shorter than this are treated as categories, not slugs.
const MIN_SLUG_LEN: usize = 8;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Decide whether a URL path points at an article detail page.
///
/// The path must live under `prefix`, must not be a topic or tag
/// aggregation, and its final segment must look like a slug: hyphenated,
/// longer than [`MIN_SLUG_LEN`] and not the bare section name.
pub fn is_article_path(path: &str, prefix: &str) -> bool {
    if !path.starts_with(prefix) {
        return false;
    }
    if path.contains("/topic/") || path.contains("/tag/") {
        return false;
    }
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    if last.eq_ignore_ascii_case("news") {
        return false;
    }
    last.contains('-') && last.chars().count() > MIN_SLUG_LEN
}

/// URL of index page `page`; page 0 is the bare index.
pub fn page_url(index: &Url, page: usize) -> Url {
    let mut url = index.clone();
    if page > 0 {
        url.query_pairs_mut().append_pair("page", &page.to_string());
    }
    url
}

/// Pull every article link out of one index page, in document order.
///
/// Relative hrefs are resolved against `page_url`; links on other hosts and
/// links failing [`is_article_path`] are dropped. Fragments are stripped so
/// `#comments` variants collapse onto the article URL.
pub fn extract_article_links(html: &str, page_url: &Url, site: &SiteConfig) -> Vec<ArticleLink> {
    let document = Html::parse_document(html);
    let site_host = Url::parse(&site.base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned));

    let mut links = Vec::new();
    for element in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = page_url.join(href.trim()) else {
            continue;
        };
        if resolved.host_str().map(str::to_owned) != site_host {
            continue;
        }
        if !is_article_path(resolved.path(), &site.article_prefix) {
            continue;
        }
        resolved.set_fragment(None);
        links.push(ArticleLink(resolved.to_string()));
    }
    links
}

/// Merge per-page link lists: dedupe by URL keeping first-seen order, cap at `max_links`.
pub fn merge_links<I>(pages: I, max_links: usize) -> Vec<ArticleLink>
where
    I: IntoIterator<Item = Vec<ArticleLink>>,
{
    pages
        .into_iter()
        .flatten()
        .unique()
        .take(max_links)
        .collect()
}

/// Walk up to `max_pages` index pages and collect up to `max_links` article links.
///
/// Stops as soon as `max_links` distinct links are known. A failed page
/// fetch aborts discovery; an empty result is not an error.
#[instrument(level = "info", skip(fetcher, site), fields(index_url = %site.index_url))]
pub async fn discover(
    fetcher: &Fetcher,
    site: &SiteConfig,
    max_pages: usize,
    max_links: usize,
) -> Result<Vec<ArticleLink>, FetchError> {
    let index = Url::parse(&site.index_url).map_err(|source| FetchError::InvalidUrl {
        url: site.index_url.clone(),
        source,
    })?;

    let mut kept: Vec<ArticleLink> = Vec::new();
    for page in 0..max_pages {
        if kept.len() >= max_links {
            break;
        }
        let url = page_url(&index, page);
        let html = fetcher.fetch_html(url.as_str()).await?;
        let found = extract_article_links(&html, &url, site);
        debug!(page, found = found.len(), "Scanned index page");

        kept = merge_links([kept, found], max_links);
        info!(page, kept = kept.len(), "Index page processed");
    }

    info!(count = kept.len(), "Discovered article links");
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::http::test_server;
    use std::collections::HashMap;

    const PREFIX: &str = "/hurricanes/news/";

    fn site_for(base: &str) -> SiteConfig {
        SiteConfig {
            base_url: base.to_string(),
            index_url: format!("{base}/hurricanes/news/"),
            article_prefix: PREFIX.to_string(),
        }
    }

    #[test]
    fn test_is_article_path_accepts_slugs() {
        assert!(is_article_path("/hurricanes/news/canes-beat-devils-4-2", PREFIX));
        assert!(is_article_path("/hurricanes/news/aho-signs-extension/", PREFIX));
    }

    #[test]
    fn test_is_article_path_rejects_aggregations() {
        assert!(!is_article_path("/hurricanes/news/topic/game-recaps", PREFIX));
        assert!(!is_article_path("/hurricanes/news/tag/sebastian-aho", PREFIX));
        assert!(!is_article_path("/hurricanes/news/", PREFIX));
        assert!(!is_article_path("/hurricanes/news", PREFIX));
    }

    #[test]
    fn test_is_article_path_rejects_short_or_unhyphenated() {
        assert!(!is_article_path("/hurricanes/news/a-b", PREFIX));
        assert!(!is_article_path("/hurricanes/news/longsegmentnohyphen", PREFIX));
        assert!(!is_article_path("/devils/news/canes-beat-devils-4-2", PREFIX));
    }

    #[test]
    fn test_page_url() {
        let index = Url::parse("https://www.nhl.com/hurricanes/news/").unwrap();
        assert_eq!(page_url(&index, 0).as_str(), "https://www.nhl.com/hurricanes/news/");
        assert_eq!(
            page_url(&index, 3).as_str(),
            "https://www.nhl.com/hurricanes/news/?page=3"
        );
    }

    #[test]
    fn test_extract_article_links_filters_and_resolves() {
        let html = r##"
            <a href="/hurricanes/news/canes-beat-devils-4-2">recap</a>
            <a href="/hurricanes/news/topic/game-recaps">topic</a>
            <a href="/hurricanes/news/">index</a>
            <a href="https://www.nhl.com/hurricanes/news/aho-signs-extension#top">abs</a>
            <a href="https://evil.example/hurricanes/news/canes-beat-devils-4-2">other host</a>
            <a href="/hurricanes/schedule">schedule</a>
            <a>no href</a>
        "##;
        let site = site_for("https://www.nhl.com");
        let page = Url::parse(&site.index_url).unwrap();

        let links = extract_article_links(html, &page, &site);
        assert_eq!(
            links,
            vec![
                ArticleLink("https://www.nhl.com/hurricanes/news/canes-beat-devils-4-2".to_string()),
                ArticleLink("https://www.nhl.com/hurricanes/news/aho-signs-extension".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_links_dedupes_across_pages() {
        let a = ArticleLink("https://www.nhl.com/hurricanes/news/canes-beat-devils-4-2".to_string());
        let b = ArticleLink("https://www.nhl.com/hurricanes/news/aho-signs-extension".to_string());

        let merged = merge_links(vec![vec![a.clone()], vec![a.clone(), b.clone()]], 10);
        assert_eq!(merged, vec![a.clone(), b.clone()]);

        let capped = merge_links(vec![vec![a.clone()], vec![b]], 1);
        assert_eq!(capped, vec![a]);
    }

    #[tokio::test]
    async fn test_discover_walks_pages_and_dedupes() {
        let page0 = r#"<a href="/hurricanes/news/canes-beat-devils-4-2">a</a>
                       <a href="/hurricanes/news/aho-signs-extension">b</a>"#;
        let page1 = r#"<a href="/hurricanes/news/aho-signs-extension">b again</a>
                       <a href="/hurricanes/news/svechnikov-hat-trick-night">c</a>"#;
        let mut pages = HashMap::new();
        pages.insert("/hurricanes/news/".to_string(), page0.to_string());
        pages.insert("/hurricanes/news/?page=1".to_string(), page1.to_string());
        pages.insert("/hurricanes/news/?page=2".to_string(), String::new());
        let base = test_server::serve(pages, 3);

        let site = site_for(&base);
        let fetcher = Fetcher::new(&HttpConfig {
            request_delay_ms: 0,
            ..HttpConfig::default()
        })
        .unwrap();

        let links = discover(&fetcher, &site, 3, 10).await.unwrap();
        let paths: Vec<String> = links
            .iter()
            .map(|l| Url::parse(l.as_str()).unwrap().path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec![
                "/hurricanes/news/canes-beat-devils-4-2",
                "/hurricanes/news/aho-signs-extension",
                "/hurricanes/news/svechnikov-hat-trick-night",
            ]
        );
    }

    #[tokio::test]
    async fn test_discover_stops_at_max_links() {
        let page0 = r#"<a href="/hurricanes/news/canes-beat-devils-4-2">a</a>
                       <a href="/hurricanes/news/aho-signs-extension">b</a>"#;
        let mut pages = HashMap::new();
        pages.insert("/hurricanes/news/".to_string(), page0.to_string());
        // Only one request is served; fetching a second page would fail.
        let base = test_server::serve(pages, 1);

        let site = site_for(&base);
        let fetcher = Fetcher::new(&HttpConfig {
            request_delay_ms: 0,
            ..HttpConfig::default()
        })
        .unwrap();

        let links = discover(&fetcher, &site, 5, 2).await.unwrap();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_discover_page_failure_is_fatal() {
        let base = test_server::serve(HashMap::new(), 1);
        let site = site_for(&base);
        let fetcher = Fetcher::new(&HttpConfig {
            request_delay_ms: 0,
            ..HttpConfig::default()
        })
        .unwrap();

        let err = discover(&fetcher, &site, 2, 10).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }
}
