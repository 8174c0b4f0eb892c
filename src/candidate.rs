// src/candidate.rs
//! Candidate records flowing through the pipeline, plus text normalization
//! and the identity key used for cross-shard deduplication.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// One raw post as returned by the candidate source. Read-only after
/// construction; ownership moves filter -> dedup -> scorer -> ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Source-native identifier, unique per source.
    pub id: String,
    pub title: String,
    /// Self-text; may be empty for link-only posts.
    #[serde(default)]
    pub body: String,
    pub url: String,
    /// Source-native popularity (upvotes). Used only as a tie-break.
    pub popularity: i64,
    pub created_at: DateTime<Utc>,
    pub comment_count: u32,
    /// Source-group name (community the post was published in).
    pub group: String,
    pub group_subscribers: u64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub flair: Option<String>,
}

impl CandidateItem {
    /// Combined text used for all scoring.
    pub fn full_text(&self) -> String {
        let mut s = String::with_capacity(self.title.len() + self.body.len() + 1);
        s.push_str(&self.title);
        s.push(' ');
        s.push_str(&self.body);
        s
    }

    /// Required fields other than `author` must be present; anything else is
    /// dropped at the filter stage rather than propagated as an error.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }

    /// Identity key for dedup: `(author, normalized title)`.
    /// Items without an author are always treated as novel.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        let author = self.author.as_deref()?.trim();
        if author.is_empty() {
            return None;
        }
        Some(IdentityKey {
            author: author.to_string(),
            title: normalize_title(&self.title),
        })
    }
}

/// `(author, normalized_title)` pair. At most one item per key survives a
/// pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub author: String,
    pub title: String,
}

/// Lower-case and strip all whitespace, so retitled reposts with spacing
/// tweaks still collide.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Normalize candidate text before scoring: decode HTML entities, strip
/// tags, fold curly quotes to ASCII, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();

    out.trim().to_string()
}

/// A candidate plus its attached scores. Created once per surviving item;
/// the composite fields stay `None` unless the engagement stage ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub item: CandidateItem,
    /// Final fused lexical score in [0, 1].
    pub similarity_score: f32,
    pub primary_score: f32,
    pub secondary_score: f32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_score: Option<f32>,
}

impl ScoredCandidate {
    pub fn new(item: CandidateItem, similarity: f32, primary: f32, secondary: f32) -> Self {
        Self {
            item,
            similarity_score: similarity,
            primary_score: primary,
            secondary_score: secondary,
            semantic_score: None,
            sentiment_label: None,
            sentiment_score: None,
            intent_label: None,
            intent_score: None,
            promo_score: None,
        }
    }
}
