// src/engage/mod.rs
//! Engagement refinement stage: re-scores a ranked slice with semantic
//! similarity to a profile description, sentiment, and intent, fused into a
//! single promotion-worthiness score. Strictly additive; the pipeline
//! produces a valid lexical ranking without it, and any provider failure
//! falls back to that ranking.

pub mod providers;

use crate::candidate::{normalize_text, ScoredCandidate};
use crate::ranker::sort_by_promo;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing::warn;

pub use providers::{
    load_engage_config, DynEmbedder, DynIntent, DynSentiment, EmbeddingProvider, EngageConfig,
    HttpInference, IntentClassifier, MockInference, SentimentClassifier, SentimentLabel,
    INTENT_LABELS,
};

pub const WEIGHT_SEMANTIC: f32 = 0.4;
pub const WEIGHT_INTENT: f32 = 0.4;
pub const WEIGHT_SENTIMENT: f32 = 0.2;

/// Intent boost: posts asking for a recommendation are the ones worth
/// engaging, problem statements close behind.
pub fn intent_boost(label: &str) -> f32 {
    match label {
        "seeking recommendation" => 1.5,
        "problem statement" => 1.3,
        _ => 1.0,
    }
}

/// Fuse the three component signals into the promotion score.
pub fn promo_score(
    semantic_score: f32,
    intent_label: &str,
    intent_score: f32,
    sentiment_label: SentimentLabel,
    sentiment_score: f32,
) -> f32 {
    let intent_component = intent_score * intent_boost(intent_label);
    let sentiment_component = match sentiment_label {
        SentimentLabel::Positive => sentiment_score,
        SentimentLabel::Negative => -sentiment_score,
    };
    WEIGHT_SEMANTIC * semantic_score
        + WEIGHT_INTENT * intent_component
        + WEIGHT_SENTIMENT * sentiment_component
}

/// The scorer owns its provider handles for the duration of one call;
/// construct it per request (or hold it in app state) rather than as
/// ambient module state.
#[derive(Clone)]
pub struct EngagementScorer {
    embedder: DynEmbedder,
    sentiment: DynSentiment,
    intent: DynIntent,
}

impl EngagementScorer {
    pub fn new(embedder: DynEmbedder, sentiment: DynSentiment, intent: DynIntent) -> Self {
        Self {
            embedder,
            sentiment,
            intent,
        }
    }

    /// Deterministic in-process scorer for tests and local runs.
    pub fn mock() -> Self {
        let mock = Arc::new(MockInference::default());
        Self::new(mock.clone(), mock.clone(), mock)
    }

    /// Build from config. `None` when the stage is disabled, which the
    /// pipeline treats as "lexical ranking only".
    pub fn from_config(config: &EngageConfig) -> Result<Option<Self>> {
        if std::env::var("ENGAGE_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
            return Ok(Some(Self::mock()));
        }
        if !config.enabled {
            return Ok(None);
        }
        let http = Arc::new(HttpInference::new(config)?);
        Ok(Some(Self::new(http.clone(), http.clone(), http)))
    }

    /// Re-score the batch against the profile description and re-sort by
    /// `promo_score`. On any provider error the lexical ordering is
    /// returned unchanged, composite fields left empty.
    pub async fn score_batch(
        &self,
        description: &str,
        batch: Vec<ScoredCandidate>,
    ) -> Vec<ScoredCandidate> {
        if batch.is_empty() || description.trim().is_empty() {
            return batch;
        }
        match self.rescore(description, batch.clone()).await {
            Ok(rescored) => rescored,
            Err(e) => {
                warn!(error = ?e, "engagement stage failed; keeping lexical ranking");
                batch
            }
        }
    }

    async fn rescore(
        &self,
        description: &str,
        mut batch: Vec<ScoredCandidate>,
    ) -> Result<Vec<ScoredCandidate>> {
        let texts: Vec<String> = batch
            .iter()
            .map(|c| normalize_text(&c.item.full_text()))
            .collect();

        // All provider calls are batched per invocation.
        let description_text = [description.to_string()];
        let desc_vec = self
            .embedder
            .embed_batch(&description_text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("empty embedding response for description"))?;
        let text_vecs = self.embedder.embed_batch(&texts).await?;
        let sentiments = self.sentiment.classify_batch(&texts).await?;
        let intents = self.intent.classify_batch(&texts, &INTENT_LABELS).await?;

        if text_vecs.len() != batch.len()
            || sentiments.len() != batch.len()
            || intents.len() != batch.len()
        {
            return Err(anyhow!("provider returned short batch"));
        }

        for (i, cand) in batch.iter_mut().enumerate() {
            let semantic = dense_cosine(&desc_vec, &text_vecs[i]);
            let (sent_label, sent_score) = sentiments[i];
            let (intent_label, intent_score) = intents[i]
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("intent classifier returned no labels"))?;

            cand.promo_score = Some(promo_score(
                semantic,
                &intent_label,
                intent_score,
                sent_label,
                sent_score,
            ));
            cand.semantic_score = Some(semantic);
            cand.sentiment_label = Some(sent_label.to_string());
            cand.sentiment_score = Some(sent_score);
            cand.intent_label = Some(intent_label);
            cand.intent_score = Some(intent_score);
        }

        sort_by_promo(&mut batch);
        Ok(batch)
    }
}

/// Cosine over dense vectors; 0 for mismatched or zero-norm inputs.
pub fn dense_cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}
