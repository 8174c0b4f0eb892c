// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod candidate;
pub mod dedup;
pub mod filter;
pub mod lexical;
pub mod metrics;
pub mod pipeline;
pub mod profile;
pub mod ranker;
pub mod shard;
pub mod source;

// Engagement refinement stage (embeddings, sentiment, intent, fusion)
pub mod engage;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::candidate::{CandidateItem, IdentityKey, ScoredCandidate};
pub use crate::engage::EngagementScorer;
pub use crate::filter::{Admission, AdmissionFilter, FilterPolicy, RejectReason};
pub use crate::pipeline::{PipelineConfig, RankingPipeline};
pub use crate::profile::{InterestProfile, RecencyWindow};
pub use crate::source::{CandidateSource, StaticSource};
