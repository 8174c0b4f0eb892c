// src/engage/providers.rs
//! Provider boundary for the engagement stage: embeddings, sentiment, and
//! zero-shot intent classification, all consumed over HTTP. Everything is
//! batched; the pipeline never issues per-item calls.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Candidate labels handed to the zero-shot intent classifier, in ranking
/// priority order.
pub const INTENT_LABELS: [&str; 4] = [
    "problem statement",
    "seeking recommendation",
    "discussion",
    "off-topic",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => f.write_str("positive"),
            SentimentLabel::Negative => f.write_str("negative"),
        }
    }
}

#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One fixed-length vector per input text, deterministic per model
    /// version.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// `(label, confidence)` per input text, confidence in [0, 1].
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<(SentimentLabel, f32)>>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Ranked `(label, confidence)` list per input text, best first. The
    /// pipeline uses only the top entry.
    async fn classify_batch(
        &self,
        texts: &[String],
        candidate_labels: &[&str],
    ) -> Result<Vec<Vec<(String, f32)>>>;
    fn name(&self) -> &'static str;
}

pub type DynEmbedder = Arc<dyn EmbeddingProvider>;
pub type DynSentiment = Arc<dyn SentimentClassifier>;
pub type DynIntent = Arc<dyn IntentClassifier>;

/* ----------------------------
Config
---------------------------- */

/// Loaded from `config/engage.json`. Reading/parsing failures fall back to
/// the disabled default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngageConfig {
    pub enabled: bool,
    /// Base URL of the hosted inference service.
    pub endpoint: Option<String>,
    /// Env var holding the bearer token; the token itself never lives in
    /// the config file.
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key_env: None,
            timeout_secs: Some(15),
        }
    }
}

pub fn load_engage_config() -> EngageConfig {
    let path = Path::new("config/engage.json");
    match std::fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => EngageConfig::default(),
    }
}

/* ----------------------------
HTTP-backed providers
---------------------------- */

/// One client against a hosted inference service exposing `/embed`,
/// `/sentiment`, and `/intent` batch routes. Requires a bearer token.
pub struct HttpInference {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpInference {
    pub fn new(config: &EngageConfig) -> Result<Self> {
        let base_url = config
            .endpoint
            .clone()
            .ok_or_else(|| anyhow!("engage config enabled but endpoint missing"))?;
        let api_key = config
            .api_key_env
            .as_deref()
            .map(|var| std::env::var(var).unwrap_or_default())
            .unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("post-relevance-ranker/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.timeout_secs.unwrap_or(15)))
            .build()
            .context("building inference http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn post_json<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        route: &str,
        req: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{route}", self.base_url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .with_context(|| format!("calling {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("{url} returned {}", resp.status()));
        }
        resp.json::<Resp>()
            .await
            .with_context(|| format!("decoding response from {url}"))
    }
}

#[derive(Serialize)]
struct BatchReq<'a> {
    inputs: &'a [String],
}

#[derive(Serialize)]
struct IntentReq<'a> {
    inputs: &'a [String],
    candidate_labels: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResp {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct SentimentResp {
    results: Vec<SentimentEntry>,
}

#[derive(Deserialize)]
struct SentimentEntry {
    label: SentimentLabel,
    score: f32,
}

#[derive(Deserialize)]
struct IntentResp {
    results: Vec<Vec<IntentEntry>>,
}

#[derive(Deserialize)]
struct IntentEntry {
    label: String,
    score: f32,
}

#[async_trait::async_trait]
impl EmbeddingProvider for HttpInference {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let resp: EmbedResp = self.post_json("embed", &BatchReq { inputs: texts }).await?;
        if resp.embeddings.len() != texts.len() {
            return Err(anyhow!(
                "embedding count mismatch: asked {}, got {}",
                texts.len(),
                resp.embeddings.len()
            ));
        }
        Ok(resp.embeddings)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[async_trait::async_trait]
impl SentimentClassifier for HttpInference {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<(SentimentLabel, f32)>> {
        let resp: SentimentResp = self
            .post_json("sentiment", &BatchReq { inputs: texts })
            .await?;
        Ok(resp
            .results
            .into_iter()
            .map(|e| (e.label, e.score.clamp(0.0, 1.0)))
            .collect())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[async_trait::async_trait]
impl IntentClassifier for HttpInference {
    async fn classify_batch(
        &self,
        texts: &[String],
        candidate_labels: &[&str],
    ) -> Result<Vec<Vec<(String, f32)>>> {
        let resp: IntentResp = self
            .post_json(
                "intent",
                &IntentReq {
                    inputs: texts,
                    candidate_labels,
                },
            )
            .await?;
        Ok(resp
            .results
            .into_iter()
            .map(|ranked| {
                ranked
                    .into_iter()
                    .map(|e| (e.label, e.score.clamp(0.0, 1.0)))
                    .collect()
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/* ----------------------------
Deterministic mock for tests/local runs
---------------------------- */

/// Cheap deterministic stand-in: hashed bag-of-words embeddings, tiny
/// lexicon sentiment, and rule-of-thumb intent. Good enough to exercise the
/// fusion math end to end without a network.
#[derive(Debug, Clone)]
pub struct MockInference {
    pub dim: usize,
}

impl Default for MockInference {
    fn default() -> Self {
        Self { dim: 64 }
    }
}

impl MockInference {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut v = vec![0.0f32; self.dim];
        for tok in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut h = DefaultHasher::new();
            tok.to_ascii_lowercase().hash(&mut h);
            v[(h.finish() as usize) % self.dim] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

const POSITIVE_WORDS: [&str; 8] = [
    "love", "great", "good", "excellent", "happy", "recommend", "best", "works",
];
const NEGATIVE_WORDS: [&str; 8] = [
    "hate", "terrible", "awful", "broken", "worst", "frustrated", "problem", "fails",
];

#[async_trait::async_trait]
impl EmbeddingProvider for MockInference {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait::async_trait]
impl SentimentClassifier for MockInference {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<(SentimentLabel, f32)>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let pos = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as i32;
                let neg = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as i32;
                let label = if pos >= neg {
                    SentimentLabel::Positive
                } else {
                    SentimentLabel::Negative
                };
                let confidence = 0.5 + 0.1 * (pos - neg).unsigned_abs().min(5) as f32;
                (label, confidence.min(1.0))
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait::async_trait]
impl IntentClassifier for MockInference {
    async fn classify_batch(
        &self,
        texts: &[String],
        candidate_labels: &[&str],
    ) -> Result<Vec<Vec<(String, f32)>>> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let top = if lower.contains("recommend")
                    || lower.contains("looking for")
                    || lower.contains("suggest")
                    || lower.contains("which one")
                {
                    "seeking recommendation"
                } else if lower.contains("problem")
                    || lower.contains("issue")
                    || lower.contains("broken")
                    || lower.contains("help")
                {
                    "problem statement"
                } else {
                    "discussion"
                };
                let mut ranked = vec![(top.to_string(), 0.85f32)];
                for label in candidate_labels.iter().filter(|l| **l != top) {
                    ranked.push((label.to_string(), 0.05));
                }
                ranked
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic_and_normalized() {
        let mock = MockInference::default();
        let texts = vec!["espresso machine advice".to_string()];
        let a = mock.embed_batch(&texts).await.unwrap();
        let b = mock.embed_batch(&texts).await.unwrap();
        assert_eq!(a, b);
        let norm = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn mock_intent_picks_recommendation_phrases() {
        let mock = MockInference::default();
        let texts = vec!["Can anyone recommend a quiet grinder?".to_string()];
        let ranked = IntentClassifier::classify_batch(&mock, &texts, &INTENT_LABELS).await.unwrap();
        assert_eq!(ranked[0][0].0, "seeking recommendation");
    }

    #[test]
    fn missing_config_is_disabled() {
        // load_engage_config falls back to the disabled default when the
        // file is absent; the default must keep the stage off.
        assert!(!EngageConfig::default().enabled);
    }
}
