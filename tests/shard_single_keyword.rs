// tests/shard_single_keyword.rs
// A profile with exactly one primary keyword must still search (one
// size-1 shard), not silently produce an empty plan.

use std::sync::Arc;

use chrono::{Duration, Utc};
use post_relevance_ranker::candidate::CandidateItem;
use post_relevance_ranker::filter::{AdmissionFilter, FilterPolicy};
use post_relevance_ranker::pipeline::RankingPipeline;
use post_relevance_ranker::profile::InterestProfile;
use post_relevance_ranker::source::StaticSource;

#[tokio::test]
async fn single_keyword_profile_still_finds_posts() {
    let post = CandidateItem {
        id: "t3_solo".into(),
        title: "Espresso tamping pressure".into(),
        body: "Does tamping pressure actually change espresso extraction much?".into(),
        url: "https://example.com/t3_solo".into(),
        popularity: 25,
        created_at: Utc::now() - Duration::hours(2),
        comment_count: 7,
        group: "espresso".into(),
        group_subscribers: 200_000,
        author: Some("carol".into()),
        flair: None,
    };

    let profile = InterestProfile::with_weights(
        vec!["espresso".into()],
        vec![],
        0.7,
        0.3,
        0.1,
        10,
    )
    .unwrap();

    let pipeline = RankingPipeline::new(
        Arc::new(StaticSource::from_items(vec![post])),
        AdmissionFilter::new(FilterPolicy::default()),
    );

    let ranked = pipeline.run(&profile, None).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].item.id, "t3_solo");
}
