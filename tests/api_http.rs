// tests/api_http.rs
use std::sync::Arc;

use axum::body::Body;
use chrono::{Duration, Utc};
use http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use post_relevance_ranker::filter::{AdmissionFilter, FilterPolicy};
use post_relevance_ranker::pipeline::RankingPipeline;
use post_relevance_ranker::source::StaticSource;
use post_relevance_ranker::{create_router, AppState};

fn router() -> axum::Router {
    let pipeline = RankingPipeline::new(
        Arc::new(StaticSource::from_items(vec![])),
        AdmissionFilter::new(FilterPolicy::default()),
    );
    create_router(AppState::new(Arc::new(pipeline)))
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let resp = router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn rank_pool_ranks_posted_items() {
    let created = (Utc::now() - Duration::hours(2)).to_rfc3339();
    let payload = json!({
        "primary_keywords": ["coffee", "espresso"],
        "secondary_keywords": ["machine"],
        "min_similarity": 0.0,
        "result_cap": 5,
        "items": [
            {
                "id": "t3_onto",
                "title": "Espresso machine advice",
                "body": "Looking for a compact espresso machine for good coffee.",
                "url": "https://example.com/t3_onto",
                "popularity": 12,
                "created_at": created,
                "comment_count": 4,
                "group": "coffee_talk",
                "group_subscribers": 90000,
                "author": "alice"
            },
            {
                "id": "t3_garden",
                "title": "Compost ratio help",
                "body": "Tomato seedlings in raised beds, which compost mix?",
                "url": "https://example.com/t3_garden",
                "popularity": 50,
                "created_at": created,
                "comment_count": 4,
                "group": "gardening",
                "group_subscribers": 90000,
                "author": "bob"
            }
        ]
    });

    let resp = router()
        .oneshot(
            Request::post("/rank/pool")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let out = body_json(resp).await;
    let arr = out.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], "t3_onto");
    assert!(arr[0]["similarity_score"].as_f64().unwrap() >= arr[1]["similarity_score"].as_f64().unwrap());
}

#[tokio::test]
async fn bad_weights_are_a_client_error() {
    let payload = json!({
        "primary_keywords": ["coffee"],
        "primary_weight": 0.7,
        "secondary_weight": 0.7,
        "items": []
    });

    let resp = router()
        .oneshot(
            Request::post("/rank/pool")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rank_with_empty_source_returns_empty_list() {
    let payload = json!({
        "primary_keywords": ["coffee", "espresso"],
        "result_cap": 5
    });

    let resp = router()
        .oneshot(
            Request::post("/rank")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}
