//! The raw corpus blob file (`raw_blob.txt`).

use crate::corpus;
use crate::models::RawArticle;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize `articles` and overwrite `path` with the blob.
#[instrument(level = "info", skip_all, fields(path = %path.display(), articles = articles.len()))]
pub async fn write_blob(articles: &[RawArticle], path: &Path) -> Result<(), Box<dyn Error>> {
    let blob = corpus::serialize(articles);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }
    fs::write(path, &blob).await?;
    info!(bytes = blob.len(), "Wrote raw corpus");
    Ok(())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn read_blob(path: &Path) -> Result<String, Box<dyn Error>> {
    let blob = fs::read_to_string(path).await?;
    info!(bytes = blob.len(), "Read raw corpus");
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(slug: &str) -> RawArticle {
        RawArticle {
            source_url: format!("https://www.nhl.com/hurricanes/news/{slug}"),
            title: slug.to_string(),
            author: None,
            published: None,
            body: "Body.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_blob_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("raw_blob.txt");

        write_blob(&[article("one-two-three"), article("four-five-six")], &path)
            .await
            .unwrap();
        write_blob(&[article("seven-eight-nine")], &path).await.unwrap();

        let blob = read_blob(&path).await.unwrap();
        assert_eq!(corpus::split_chunks(&blob).len(), 1);
        assert!(blob.contains("seven-eight-nine"));
        assert!(!blob.contains("one-two-three"));
    }
}
