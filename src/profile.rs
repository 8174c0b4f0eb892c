// src/profile.rs
//! Interest profile: immutable configuration describing what "relevant"
//! means for one ranking request. Validated at construction; a bad profile
//! is a caller error and fails only that request.

use crate::candidate::IdentityKey;
use anyhow::{bail, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_PRIMARY_WEIGHT: f32 = 0.7;
pub const DEFAULT_SECONDARY_WEIGHT: f32 = 0.3;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.2;

/// Bounded lookback for candidate admission. Candidates older than the
/// window are excluded regardless of score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecencyWindow {
    #[default]
    Unbounded,
    Day,
    Week,
    Month,
}

impl RecencyWindow {
    /// Maximum allowed age, or `None` for unbounded.
    pub fn max_age(&self) -> Option<Duration> {
        match self {
            RecencyWindow::Unbounded => None,
            RecencyWindow::Day => Some(Duration::hours(24)),
            RecencyWindow::Week => Some(Duration::days(7)),
            RecencyWindow::Month => Some(Duration::days(30)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestProfile {
    pub primary_keywords: Vec<String>,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    pub primary_weight: f32,
    pub secondary_weight: f32,
    /// Candidates scoring below this are dropped. In [0, 1].
    pub min_similarity: f32,
    pub result_cap: usize,
    #[serde(default)]
    pub recency_window: RecencyWindow,
    /// Source groups never surfaced for this profile.
    #[serde(default)]
    pub excluded_groups: HashSet<String>,
    /// Identity keys delivered previously; seeds the dedup tracker so the
    /// same post is not surfaced twice across runs.
    #[serde(default)]
    pub seen: HashSet<IdentityKey>,
}

impl InterestProfile {
    /// Validating constructor with default weights and threshold.
    pub fn new(primary_keywords: Vec<String>, result_cap: usize) -> Result<Self> {
        Self::with_weights(
            primary_keywords,
            Vec::new(),
            DEFAULT_PRIMARY_WEIGHT,
            DEFAULT_SECONDARY_WEIGHT,
            DEFAULT_MIN_SIMILARITY,
            result_cap,
        )
    }

    /// Full validating constructor. Invariants: primary keywords non-empty,
    /// weights sum to 1.0, `min_similarity` in [0, 1].
    pub fn with_weights(
        primary_keywords: Vec<String>,
        secondary_keywords: Vec<String>,
        primary_weight: f32,
        secondary_weight: f32,
        min_similarity: f32,
        result_cap: usize,
    ) -> Result<Self> {
        if primary_keywords.iter().all(|k| k.trim().is_empty())
            && secondary_keywords.iter().all(|k| k.trim().is_empty())
        {
            bail!("profile needs at least one non-empty keyword");
        }
        if !(0.0..=1.0).contains(&primary_weight) || !(0.0..=1.0).contains(&secondary_weight) {
            bail!("keyword weights must lie in [0, 1]");
        }
        if ((primary_weight + secondary_weight) - 1.0).abs() > 1e-6 {
            bail!(
                "primary_weight + secondary_weight must equal 1.0 (got {})",
                primary_weight + secondary_weight
            );
        }
        if !(0.0..=1.0).contains(&min_similarity) {
            bail!("min_similarity must lie in [0, 1] (got {min_similarity})");
        }

        Ok(Self {
            primary_keywords,
            secondary_keywords,
            primary_weight,
            secondary_weight,
            min_similarity,
            result_cap,
            recency_window: RecencyWindow::Unbounded,
            excluded_groups: HashSet::new(),
            seen: HashSet::new(),
        })
    }

    pub fn recency(mut self, window: RecencyWindow) -> Self {
        self.recency_window = window;
        self
    }

    pub fn excluding(mut self, groups: impl IntoIterator<Item = String>) -> Self {
        self.excluded_groups.extend(groups);
        self
    }

    pub fn already_seen(mut self, keys: impl IntoIterator<Item = IdentityKey>) -> Self {
        self.seen.extend(keys);
        self
    }

    /// Primary keyword list after slot promotion: a UI that fills only the
    /// secondary slot sends `primary = [""]`, in which case the secondary
    /// list becomes the sole source of shards and scoring.
    pub fn effective_primary(&self) -> &[String] {
        if self.primary_keywords.iter().all(|k| k.trim().is_empty())
            && !self.secondary_keywords.is_empty()
        {
            &self.secondary_keywords
        } else {
            &self.primary_keywords
        }
    }

    /// Secondary list after slot promotion; empty when the secondary slot
    /// was promoted to primary.
    pub fn effective_secondary(&self) -> &[String] {
        if self.primary_keywords.iter().all(|k| k.trim().is_empty()) {
            &[]
        } else {
            &self.secondary_keywords
        }
    }
}
