// src/pipeline.rs
//! End-to-end ranking pipeline: shard fan-out against the candidate
//! source, admission filtering, cross-shard dedup, pool-wide lexical
//! scoring, final ranking, and the optional engagement stage.
//!
//! Scoring runs over the fully merged pool. Per-shard scoring would be
//! wrong: the TF-IDF space is built once over everything that survived
//! admission.

use crate::candidate::{CandidateItem, ScoredCandidate};
use crate::dedup::DedupTracker;
use crate::engage::EngagementScorer;
use crate::filter::AdmissionFilter;
use crate::lexical;
use crate::profile::InterestProfile;
use crate::ranker;
use crate::shard::{plan_shards, shard_query};
use crate::source::CandidateSource;
use anyhow::Result;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("rank_shards_total", "Shard queries issued.");
        describe_counter!(
            "rank_shard_errors_total",
            "Shard queries that failed or timed out."
        );
        describe_counter!("rank_fetched_total", "Raw candidates returned by shards.");
        describe_counter!("rank_rejected_total", "Candidates rejected by the admission filter.");
        describe_counter!("rank_deduped_total", "Candidates dropped as cross-shard duplicates.");
        describe_counter!("rank_returned_total", "Candidates in final ranked output.");
        describe_gauge!("rank_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Shard fetches in flight at once.
    pub max_concurrent_shards: usize,
    /// Per-shard fetch budget; a slow shard degrades recall, it does not
    /// abort the run.
    pub shard_timeout_secs: u64,
    /// Page size requested from the source per shard.
    pub per_shard_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_shards: 4,
            shard_timeout_secs: 10,
            per_shard_limit: 100,
        }
    }
}

pub struct RankingPipeline {
    source: Arc<dyn CandidateSource>,
    filter: AdmissionFilter,
    config: PipelineConfig,
    engagement: Option<EngagementScorer>,
}

impl RankingPipeline {
    pub fn new(source: Arc<dyn CandidateSource>, filter: AdmissionFilter) -> Self {
        Self {
            source,
            filter,
            config: PipelineConfig::default(),
            engagement: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_engagement(mut self, scorer: Option<EngagementScorer>) -> Self {
        self.engagement = scorer;
        self
    }

    /// Run the whole pipeline for one profile. `description`, when present
    /// and an engagement scorer is configured, re-ranks the final slice by
    /// promotion worthiness.
    pub async fn run(
        &self,
        profile: &InterestProfile,
        description: Option<&str>,
    ) -> Result<Vec<ScoredCandidate>> {
        ensure_metrics_described();

        let raw = self.fetch_shards(profile).await;
        let ranked = self.rank_pool(profile, raw);

        gauge!("rank_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        let ranked = match (&self.engagement, description) {
            (Some(scorer), Some(desc)) => scorer.score_batch(desc, ranked).await,
            _ => ranked,
        };

        counter!("rank_returned_total").increment(ranked.len() as u64);
        Ok(ranked)
    }

    /// Fetch all shards with bounded parallelism and a per-shard timeout.
    /// Results are merged in shard-plan order so dedup keeps the same copy
    /// across reruns.
    async fn fetch_shards(&self, profile: &InterestProfile) -> Vec<CandidateItem> {
        let shards = plan_shards(profile);
        if shards.is_empty() {
            return Vec::new();
        }
        counter!("rank_shards_total").increment(shards.len() as u64);

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_shards.max(1)));
        let budget = Duration::from_secs(self.config.shard_timeout_secs.max(1));
        let mut set: JoinSet<(usize, Vec<CandidateItem>)> = JoinSet::new();

        for (idx, shard) in shards.iter().enumerate() {
            let query = shard_query(shard);
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let window = profile.recency_window;
            let limit = self.config.per_shard_limit;

            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                match timeout(budget, source.search(&query, window, limit)).await {
                    Ok(Ok(items)) => (idx, items),
                    Ok(Err(e)) => {
                        warn!(error = ?e, %query, "shard query failed; continuing with zero items");
                        counter!("rank_shard_errors_total").increment(1);
                        (idx, Vec::new())
                    }
                    Err(_) => {
                        warn!(%query, timeout_secs = budget.as_secs(), "shard query timed out");
                        counter!("rank_shard_errors_total").increment(1);
                        (idx, Vec::new())
                    }
                }
            });
        }

        let mut per_shard: Vec<Vec<CandidateItem>> = vec![Vec::new(); shards.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, items)) => per_shard[idx] = items,
                Err(e) => warn!(error = ?e, "shard task panicked"),
            }
        }

        let merged: Vec<CandidateItem> = per_shard.into_iter().flatten().collect();
        counter!("rank_fetched_total").increment(merged.len() as u64);
        merged
    }

    /// Admission + dedup + pool-wide scoring + ranking over an already
    /// fetched pool. Exposed separately so callers with their own item
    /// batch can rank without a source round-trip.
    pub fn rank_pool(
        &self,
        profile: &InterestProfile,
        raw: Vec<CandidateItem>,
    ) -> Vec<ScoredCandidate> {
        ensure_metrics_described();
        let now = Utc::now();
        let total = raw.len();

        let mut rejected = 0usize;
        let mut deduped = 0usize;
        let mut tracker = DedupTracker::seeded(profile.seen.clone());
        let mut pool = Vec::with_capacity(raw.len());

        for item in raw {
            if !self.filter.evaluate(&item, now, profile).is_admitted() {
                rejected += 1;
                continue;
            }
            if !tracker.admit(&item) {
                deduped += 1;
                continue;
            }
            pool.push(item);
        }

        counter!("rank_rejected_total").increment(rejected as u64);
        counter!("rank_deduped_total").increment(deduped as u64);

        let texts: Vec<String> = pool
            .iter()
            .map(|it| crate::candidate::normalize_text(&it.full_text()))
            .collect();
        let scores = lexical::score_pool(&texts, profile);

        let scored: Vec<ScoredCandidate> = pool
            .into_iter()
            .zip(scores)
            .map(|(item, s)| ScoredCandidate::new(item, s.score, s.primary_score, s.secondary_score))
            .collect();

        let ranked = ranker::rank(scored, profile.min_similarity, profile.result_cap);
        info!(
            target: "pipeline",
            fetched = total,
            rejected,
            deduped,
            returned = ranked.len(),
            "ranked pool"
        );
        ranked
    }
}
