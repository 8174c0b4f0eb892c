// tests/engage_composite.rs
// Composite stage: promo-score fusion over a batch with mock providers,
// and the lexical-only fallback when a provider fails.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use post_relevance_ranker::candidate::{CandidateItem, ScoredCandidate};
use post_relevance_ranker::engage::{
    EmbeddingProvider, EngagementScorer, MockInference,
};

fn scored(id: &str, title: &str, body: &str, similarity: f32) -> ScoredCandidate {
    ScoredCandidate::new(
        CandidateItem {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            url: format!("https://example.com/{id}"),
            popularity: 10,
            created_at: Utc::now() - Duration::hours(1),
            comment_count: 2,
            group: "coffee_talk".into(),
            group_subscribers: 50_000,
            author: Some("alice".into()),
            flair: None,
        },
        similarity,
        similarity,
        0.0,
    )
}

const DESCRIPTION: &str =
    "We make a compact, quiet espresso machine for small kitchens.";

#[tokio::test]
async fn batch_gains_composite_fields_and_promo_order() {
    let batch = vec![
        scored(
            "chat",
            "Morning espresso routine",
            "Just sharing my espresso routine, nothing fancy.",
            0.9,
        ),
        scored(
            "ask",
            "Which espresso machine should I buy?",
            "Can anyone recommend a quiet espresso machine? Looking for something compact.",
            0.5,
        ),
    ];

    let out = EngagementScorer::mock()
        .score_batch(DESCRIPTION, batch)
        .await;

    assert_eq!(out.len(), 2);
    for c in &out {
        assert!(c.promo_score.is_some(), "{}", c.item.id);
        assert!(c.semantic_score.is_some());
        assert!(c.sentiment_label.is_some());
        assert!(c.intent_label.is_some());
        let intent = c.intent_score.unwrap();
        let sentiment = c.sentiment_score.unwrap();
        assert!((0.0..=1.0).contains(&intent));
        assert!((0.0..=1.0).contains(&sentiment));
    }

    // The recommendation-seeking post gets the 1.5x intent boost and must
    // outrank the idle chat despite the lower lexical score.
    assert_eq!(out[0].item.id, "ask");
    assert_eq!(out[0].intent_label.as_deref(), Some("seeking recommendation"));
    assert!(out[0].promo_score.unwrap() > out[1].promo_score.unwrap());
}

struct BrokenEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        anyhow::bail!("inference endpoint down")
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn provider_failure_falls_back_to_lexical_order() {
    let mock = Arc::new(MockInference::default());
    let scorer = EngagementScorer::new(Arc::new(BrokenEmbedder), mock.clone(), mock);

    let batch = vec![
        scored("first", "Espresso question one", "Espresso body one.", 0.8),
        scored("second", "Espresso question two", "Espresso body two.", 0.6),
    ];
    let out = scorer.score_batch(DESCRIPTION, batch.clone()).await;

    // Order and contents unchanged; no composite fields attached.
    assert_eq!(out, batch);
    assert!(out.iter().all(|c| c.promo_score.is_none()));
}

#[tokio::test]
async fn empty_batch_and_empty_description_are_noops() {
    let scorer = EngagementScorer::mock();
    assert!(scorer.score_batch(DESCRIPTION, vec![]).await.is_empty());

    let batch = vec![scored("a", "Espresso", "Body.", 0.5)];
    let out = scorer.score_batch("   ", batch.clone()).await;
    assert_eq!(out, batch);
}
