use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::candidate::{CandidateItem, IdentityKey, ScoredCandidate};
use crate::pipeline::RankingPipeline;
use crate::profile::{
    InterestProfile, RecencyWindow, DEFAULT_MIN_SIMILARITY, DEFAULT_PRIMARY_WEIGHT,
    DEFAULT_SECONDARY_WEIGHT,
};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<RankingPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<RankingPipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/rank", post(rank))
        .route("/rank/pool", post(rank_pool))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Profile fields as posted by callers. Weights and threshold default the
/// same way library construction does.
#[derive(serde::Deserialize)]
struct ProfileSpec {
    primary_keywords: Vec<String>,
    #[serde(default)]
    secondary_keywords: Vec<String>,
    #[serde(default = "default_primary_weight")]
    primary_weight: f32,
    #[serde(default = "default_secondary_weight")]
    secondary_weight: f32,
    #[serde(default = "default_min_similarity")]
    min_similarity: f32,
    #[serde(default = "default_result_cap")]
    result_cap: usize,
    #[serde(default)]
    recency_window: RecencyWindow,
    #[serde(default)]
    excluded_groups: Vec<String>,
    #[serde(default)]
    seen: Vec<IdentityKey>,
}

fn default_primary_weight() -> f32 {
    DEFAULT_PRIMARY_WEIGHT
}
fn default_secondary_weight() -> f32 {
    DEFAULT_SECONDARY_WEIGHT
}
fn default_min_similarity() -> f32 {
    DEFAULT_MIN_SIMILARITY
}
fn default_result_cap() -> usize {
    25
}

impl ProfileSpec {
    fn into_profile(self) -> Result<InterestProfile, (StatusCode, String)> {
        InterestProfile::with_weights(
            self.primary_keywords,
            self.secondary_keywords,
            self.primary_weight,
            self.secondary_weight,
            self.min_similarity,
            self.result_cap,
        )
        .map(|p| {
            p.recency(self.recency_window)
                .excluding(self.excluded_groups)
                .already_seen(self.seen)
        })
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

#[derive(serde::Deserialize)]
struct RankReq {
    #[serde(flatten)]
    profile: ProfileSpec,
    /// Product/interest description driving the engagement stage; omit to
    /// keep lexical ranking only.
    #[serde(default)]
    description: Option<String>,
}

async fn rank(
    State(state): State<AppState>,
    Json(body): Json<RankReq>,
) -> Result<Json<Vec<ScoredCandidate>>, (StatusCode, String)> {
    let profile = body.profile.into_profile()?;
    let ranked = state
        .pipeline
        .run(&profile, body.description.as_deref())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(ranked))
}

#[derive(serde::Deserialize)]
struct RankPoolReq {
    #[serde(flatten)]
    profile: ProfileSpec,
    /// Pre-fetched candidates; the source adapter is bypassed.
    items: Vec<CandidateItem>,
}

async fn rank_pool(
    State(state): State<AppState>,
    Json(body): Json<RankPoolReq>,
) -> Result<Json<Vec<ScoredCandidate>>, (StatusCode, String)> {
    let profile = body.profile.into_profile()?;
    Ok(Json(state.pipeline.rank_pool(&profile, body.items)))
}
