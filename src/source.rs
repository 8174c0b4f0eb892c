// src/source.rs
//! Candidate source boundary. The pipeline consumes this trait; the real
//! full-text search backend lives behind it. A failed shard query is the
//! caller's signal to log and continue, never to abort the run.

use crate::candidate::CandidateItem;
use crate::profile::RecencyWindow;
use anyhow::Result;

#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    /// Run one shard query and return raw candidates, newest-first or in
    /// source-native relevance order. `limit` bounds the page size.
    async fn search(
        &self,
        query: &str,
        window: RecencyWindow,
        limit: usize,
    ) -> Result<Vec<CandidateItem>>;

    fn name(&self) -> &'static str;
}

/// In-memory source over a fixed item set. Matches a quoted OR-query the
/// way the remote backend does at its simplest: a candidate matches if any
/// quoted phrase occurs (case-insensitively) in title or body. Used by
/// tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    items: Vec<CandidateItem>,
}

impl StaticSource {
    pub fn from_items(items: Vec<CandidateItem>) -> Self {
        Self { items }
    }

    /// Load a JSON array of candidates, e.g. a captured search response.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<CandidateItem> = serde_json::from_str(json)?;
        Ok(Self { items })
    }

    fn phrases(query: &str) -> Vec<String> {
        query
            .split(" OR ")
            .map(|p| p.trim().trim_matches('"').to_lowercase())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

#[async_trait::async_trait]
impl CandidateSource for StaticSource {
    async fn search(
        &self,
        query: &str,
        _window: RecencyWindow,
        limit: usize,
    ) -> Result<Vec<CandidateItem>> {
        let phrases = Self::phrases(query);
        let hits = self
            .items
            .iter()
            .filter(|it| {
                let text = it.full_text().to_lowercase();
                phrases.iter().any(|p| text.contains(p))
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(hits)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, title: &str) -> CandidateItem {
        CandidateItem {
            id: id.into(),
            title: title.into(),
            body: String::new(),
            url: "https://example.com".into(),
            popularity: 0,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            comment_count: 0,
            group: "g".into(),
            group_subscribers: 1_000,
            author: None,
            flair: None,
        }
    }

    #[tokio::test]
    async fn matches_any_quoted_phrase() {
        let src = StaticSource::from_items(vec![
            item("1", "Espresso machine advice"),
            item("2", "Sourdough starter help"),
        ]);
        let hits = src
            .search("\"espresso\" OR \"grinder\"", RecencyWindow::Unbounded, 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
    }

    #[tokio::test]
    async fn limit_bounds_the_page() {
        let src = StaticSource::from_items(vec![
            item("1", "espresso one"),
            item("2", "espresso two"),
            item("3", "espresso three"),
        ]);
        let hits = src
            .search("\"espresso\"", RecencyWindow::Unbounded, 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }
}
