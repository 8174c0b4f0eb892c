// src/ranker.rs
//! Final ordering and bounding: threshold, sort, truncate. Popularity is
//! only ever a tie-break, never the primary key, and truncation never
//! reorders.

use crate::candidate::ScoredCandidate;

/// Keep candidates at or above `min_similarity`, sort by
/// (score desc, popularity desc), truncate to `cap`. The output is a strict
/// prefix of the full sorted list.
pub fn rank(mut pool: Vec<ScoredCandidate>, min_similarity: f32, cap: usize) -> Vec<ScoredCandidate> {
    pool.retain(|c| c.similarity_score >= min_similarity);
    sort_by_score(&mut pool);
    pool.truncate(cap);
    pool
}

/// Stable sort: equal (score, popularity) pairs keep their input order,
/// which makes reruns over a fixed pool deterministic.
pub fn sort_by_score(pool: &mut [ScoredCandidate]) {
    pool.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| b.item.popularity.cmp(&a.item.popularity))
    });
}

/// Re-sort by the composite engagement score, falling back to the lexical
/// score for candidates the engagement stage did not reach.
pub fn sort_by_promo(pool: &mut [ScoredCandidate]) {
    pool.sort_by(|a, b| {
        let ka = a.promo_score.unwrap_or(a.similarity_score);
        let kb = b.promo_score.unwrap_or(b.similarity_score);
        kb.total_cmp(&ka)
            .then_with(|| b.item.popularity.cmp(&a.item.popularity))
    });
}
