//! Relevance Ranking Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring the pipeline, routes, and metrics.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use post_relevance_ranker::engage::{load_engage_config, EngagementScorer};
use post_relevance_ranker::filter::{AdmissionFilter, FilterPolicy};
use post_relevance_ranker::metrics::Metrics;
use post_relevance_ranker::pipeline::RankingPipeline;
use post_relevance_ranker::source::StaticSource;
use post_relevance_ranker::{create_router, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("post_relevance_ranker=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Candidate source for local runs: a captured JSON fixture pointed to by
/// `POSTS_FIXTURE_PATH`, or an empty source when unset. Production deploys
/// plug a real search backend in behind `CandidateSource`.
fn build_source() -> anyhow::Result<StaticSource> {
    match std::env::var("POSTS_FIXTURE_PATH") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)?;
            let source = StaticSource::from_json(&json)?;
            tracing::info!(%path, "loaded candidate fixture");
            Ok(source)
        }
        Err(_) => Ok(StaticSource::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init();

    let engagement = EngagementScorer::from_config(&load_engage_config())?;
    let pipeline = RankingPipeline::new(
        Arc::new(build_source()?),
        AdmissionFilter::new(FilterPolicy::load_default()),
    )
    .with_engagement(engagement);

    let router = create_router(AppState::new(Arc::new(pipeline))).merge(metrics.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}
