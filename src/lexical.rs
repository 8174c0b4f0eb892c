// src/lexical.rs
//! Lexical relevance scorer: a shared TF-IDF vector space over the whole
//! candidate pool plus the two keyword queries, fused with literal keyword
//! coverage.
//!
//! Pure cosine similarity over short, noisy social text is unreliable on
//! its own, and pure keyword presence ignores context and word order. Each
//! tier therefore averages the two signals, and the final score weights the
//! tiers:
//!
//! ```text
//! combined_primary   = (cosine(text, primary_query)   + primary_coverage)   / 2
//! combined_secondary = (cosine(text, secondary_query) + secondary_coverage) / 2
//! score = primary_weight * combined_primary + secondary_weight * combined_secondary
//! ```
//!
//! The space is built once per pool: word 1..3-grams, English stop words
//! removed, vocabulary capped at 5000 terms by corpus frequency (ties
//! broken lexicographically so reruns are deterministic).

use crate::profile::InterestProfile;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const MAX_FEATURES: usize = 5_000;
pub const NGRAM_MAX: usize = 3;

/// Per-candidate output of the scorer. All values in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalScores {
    pub primary_score: f32,
    pub secondary_score: f32,
    pub score: f32,
}

/// Score every text in the pool against the profile's keyword tiers.
/// Returns one entry per input text, in input order.
pub fn score_pool(texts: &[String], profile: &InterestProfile) -> Vec<LexicalScores> {
    if texts.is_empty() {
        return Vec::new();
    }

    let primary = profile.effective_primary();
    let secondary = profile.effective_secondary();
    let primary_query = primary.join(" ");
    let secondary_query = secondary.join(" ");

    // One space over {candidates, primary query, secondary query}.
    let mut docs: Vec<&str> = texts.iter().map(String::as_str).collect();
    docs.push(&primary_query);
    docs.push(&secondary_query);

    let vectors = TfIdfVectorizer::default().fit_transform(&docs);
    let primary_vec = &vectors[texts.len()];
    let secondary_vec = &vectors[texts.len() + 1];
    let cand_vecs = &vectors[..texts.len()];

    cand_vecs
        .iter()
        .zip(texts.iter())
        .map(|(vec, text)| {
            let text_lower = text.to_lowercase();

            let primary_sim = cosine(vec, primary_vec);
            let secondary_sim = if secondary.is_empty() {
                0.0
            } else {
                cosine(vec, secondary_vec)
            };

            let primary_cov = keyword_coverage(&text_lower, primary);
            let secondary_cov = keyword_coverage(&text_lower, secondary);

            let combined_primary = ((primary_sim + primary_cov) / 2.0).clamp(0.0, 1.0);
            let combined_secondary = ((secondary_sim + secondary_cov) / 2.0).clamp(0.0, 1.0);

            let score = (profile.primary_weight * combined_primary
                + profile.secondary_weight * combined_secondary)
                .clamp(0.0, 1.0);

            LexicalScores {
                primary_score: combined_primary,
                secondary_score: combined_secondary,
                score,
            }
        })
        .collect()
}

/// Fraction of keywords literally present (case-insensitive substring) in
/// the text. 0 for an empty keyword list.
pub fn keyword_coverage(text_lower: &str, keywords: &[String]) -> f32 {
    let usable: Vec<&String> = keywords.iter().filter(|k| !k.trim().is_empty()).collect();
    if usable.is_empty() {
        return 0.0;
    }
    let hits = usable
        .iter()
        .filter(|k| text_lower.contains(&k.to_lowercase()))
        .count();
    hits as f32 / usable.len() as f32
}

/* ----------------------------
TF-IDF vector space
---------------------------- */

/// Sparse L2-normalized document vector: (term index, weight), sorted by
/// term index.
type SparseVec = Vec<(u32, f32)>;

#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    pub max_features: usize,
    pub ngram_max: usize,
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self {
            max_features: MAX_FEATURES,
            ngram_max: NGRAM_MAX,
        }
    }
}

impl TfIdfVectorizer {
    /// Build the vocabulary over all docs and return one normalized vector
    /// per doc, in input order.
    pub fn fit_transform(&self, docs: &[&str]) -> Vec<SparseVec> {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| self.terms(d)).collect();

        // Corpus totals and document frequencies.
        let mut totals: HashMap<&str, u64> = HashMap::new();
        let mut dfs: HashMap<&str, u32> = HashMap::new();
        for terms in &tokenized {
            let mut seen_here: HashSet<&str> = HashSet::new();
            for t in terms {
                *totals.entry(t.as_str()).or_insert(0) += 1;
                if seen_here.insert(t.as_str()) {
                    *dfs.entry(t.as_str()).or_insert(0) += 1;
                }
            }
        }

        // Keep the most frequent terms; lexicographic tie-break keeps the
        // vocabulary stable across runs.
        let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let vocab: HashMap<&str, u32> = ranked
            .iter()
            .enumerate()
            .map(|(i, (t, _))| (*t, i as u32))
            .collect();

        let n_docs = docs.len() as f32;
        let idf: HashMap<u32, f32> = vocab
            .iter()
            .map(|(t, &i)| {
                let df = *dfs.get(t).unwrap_or(&0) as f32;
                // Smoothed IDF; never zero, so rare terms keep weight.
                (i, ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0)
            })
            .collect();

        tokenized
            .iter()
            .map(|terms| {
                let mut counts: HashMap<u32, f32> = HashMap::new();
                for t in terms {
                    if let Some(&i) = vocab.get(t.as_str()) {
                        *counts.entry(i).or_insert(0.0) += 1.0;
                    }
                }
                let mut vec: SparseVec = counts
                    .into_iter()
                    .map(|(i, tf)| (i, tf * idf[&i]))
                    .collect();
                vec.sort_by_key(|(i, _)| *i);

                let norm = vec.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut vec {
                        *w /= norm;
                    }
                }
                vec
            })
            .collect()
    }

    /// Stop-word-filtered word 1..n-grams of the document.
    fn terms(&self, doc: &str) -> Vec<String> {
        let words: Vec<String> = tokenize(doc)
            .filter(|w| !STOP_WORDS.contains(w.as_str()))
            .collect();

        let mut terms = Vec::with_capacity(words.len() * self.ngram_max);
        for n in 1..=self.ngram_max {
            if words.len() < n {
                break;
            }
            for window in words.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }
}

/// Cosine similarity of two L2-normalized sparse vectors (a merge-join dot
/// product). Zero vectors yield 0.
pub fn cosine(a: &SparseVec, b: &SparseVec) -> f32 {
    let mut dot = 0.0f32;
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot.clamp(0.0, 1.0)
}

fn tokenize(input: &str) -> impl Iterator<Item = String> + '_ {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w+\b").expect("tokenizer regex"));
    RE.find_iter(input).map(|m| m.as_str().to_lowercase())
}

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "aren", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "doing",
        "down", "during", "each", "few", "for", "from", "further", "had", "has", "have",
        "having", "he", "her", "here", "hers", "herself", "him", "himself", "his", "how", "i",
        "if", "in", "into", "is", "isn", "it", "its", "itself", "just", "me", "more", "most",
        "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or",
        "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
        "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
        "then", "there", "these", "they", "this", "those", "through", "to", "too", "under",
        "until", "up", "very", "was", "we", "were", "what", "when", "where", "which", "while",
        "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
        "yourselves",
    ]
    .into_iter()
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(primary: &[&str], secondary: &[&str]) -> InterestProfile {
        InterestProfile::with_weights(
            primary.iter().map(|s| s.to_string()).collect(),
            secondary.iter().map(|s| s.to_string()).collect(),
            0.7,
            0.3,
            0.2,
            10,
        )
        .unwrap()
    }

    #[test]
    fn coverage_counts_literal_matches() {
        let kws = vec!["coffee".to_string(), "espresso".to_string()];
        assert_eq!(keyword_coverage("fresh coffee beans", &kws), 0.5);
        assert_eq!(keyword_coverage("coffee and espresso", &kws), 1.0);
        assert_eq!(keyword_coverage("gardening tips", &kws), 0.0);
        assert_eq!(keyword_coverage("anything", &[]), 0.0);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let texts = vec![
            "espresso machine espresso machine espresso".to_string(),
            "coffee once in a promotional wall of text".to_string(),
            "tomato seedlings and raised garden beds".to_string(),
        ];
        let p = profile(&["coffee", "espresso"], &["machine"]);
        for s in score_pool(&texts, &p) {
            assert!((0.0..=1.0).contains(&s.primary_score), "{s:?}");
            assert!((0.0..=1.0).contains(&s.secondary_score), "{s:?}");
            assert!((0.0..=1.0).contains(&s.score), "{s:?}");
        }
    }

    #[test]
    fn on_topic_text_outscores_off_topic() {
        let texts = vec![
            "my espresso machine pulls great espresso shots".to_string(),
            "tomato seedlings and raised garden beds".to_string(),
        ];
        let p = profile(&["coffee", "espresso"], &["machine"]);
        let scores = score_pool(&texts, &p);
        assert!(scores[0].score > scores[1].score);
        assert!(scores[1].score < 0.1, "off-topic text: {:?}", scores[1]);
    }

    #[test]
    fn empty_secondary_tier_scores_zero() {
        let texts = vec!["coffee coffee coffee".to_string()];
        let p = profile(&["coffee"], &[]);
        let scores = score_pool(&texts, &p);
        assert_eq!(scores[0].secondary_score, 0.0);
        assert!(scores[0].primary_score > 0.5);
    }

    #[test]
    fn empty_pool_is_not_an_error() {
        let p = profile(&["coffee"], &[]);
        assert!(score_pool(&[], &p).is_empty());
    }

    #[test]
    fn vectorizer_is_deterministic() {
        let docs = ["espresso machine", "machine espresso", "coffee grinder"];
        let v = TfIdfVectorizer::default();
        assert_eq!(v.fit_transform(&docs), v.fit_transform(&docs));
    }

    #[test]
    fn identical_docs_have_unit_cosine() {
        let v = TfIdfVectorizer::default();
        let vecs = v.fit_transform(&["espresso machine shots", "espresso machine shots"]);
        let sim = cosine(&vecs[0], &vecs[1]);
        assert!((sim - 1.0).abs() < 1e-5, "sim = {sim}");
    }

    #[test]
    fn vocabulary_cap_keeps_most_frequent_terms() {
        let v = TfIdfVectorizer {
            max_features: 2,
            ngram_max: 1,
        };
        // "espresso" appears 3 times, "machine" twice, "grinder" once.
        let vecs = v.fit_transform(&["espresso espresso machine", "espresso machine grinder"]);
        // Every doc vector only uses the two retained indices.
        for vec in &vecs {
            assert!(vec.iter().all(|(i, _)| *i < 2));
        }
    }
}
