// src/filter.rs
//! Recency and promotional admission filter. Rule-based, applied to every
//! raw candidate before it can enter the pool; rejection is binary, there
//! is no partial credit.

use crate::candidate::CandidateItem;
use crate::profile::InterestProfile;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_FILTER_POLICY_PATH: &str = "config/filter_policy.toml";
pub const ENV_FILTER_POLICY_PATH: &str = "FILTER_POLICY_PATH";

/// Tunable thresholds for the admission filter. Loaded from TOML; every
/// field has a default so a missing file or a partial file still works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// Bodies longer than this many characters are rejected.
    pub body_char_cap: usize,
    /// Source groups with fewer subscribers are rejected.
    pub min_group_subscribers: u64,
    /// Admit empty-body posts that already gathered some discussion.
    /// When false, an empty body always rejects.
    pub allow_bodyless_discussions: bool,
    /// Comment floor for the bodyless exception above, and for the
    /// link-wall rule below.
    pub min_comments_for_exception: u32,
    /// Word count above which a URL-bearing, heavily formatted body is
    /// treated as a link wall.
    pub link_wall_word_limit: usize,
    pub link_wall_max_headers: usize,
    pub link_wall_max_bullets: usize,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            body_char_cap: 2_500,
            min_group_subscribers: 100,
            allow_bodyless_discussions: true,
            min_comments_for_exception: 3,
            link_wall_word_limit: 300,
            link_wall_max_headers: 3,
            link_wall_max_bullets: 3,
        }
    }
}

impl FilterPolicy {
    /// Load from an explicit TOML path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("failed to read filter policy at {}: {}", path.display(), e)
        })?;
        let mut policy: FilterPolicy = toml::from_str(&content)?;
        policy.sanitize();
        Ok(policy)
    }

    /// Load using `$FILTER_POLICY_PATH`, then the default path, then
    /// built-in defaults if neither exists.
    pub fn load_default() -> Self {
        let path = std::env::var(ENV_FILTER_POLICY_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FILTER_POLICY_PATH));
        match Self::load_from(&path) {
            Ok(p) => p,
            Err(_) => FilterPolicy::default(),
        }
    }

    // Basic parameter hygiene.
    fn sanitize(&mut self) {
        if self.body_char_cap == 0 {
            self.body_char_cap = 2_500;
        }
        if self.link_wall_word_limit == 0 {
            self.link_wall_word_limit = 300;
        }
    }
}

/// Why an item was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Malformed,
    ExcludedGroup,
    EmptyBody,
    PromoTag,
    PromoPattern,
    PromoFlair,
    HiringOrCoupon,
    LinkWall,
    BodyTooLong,
    Stale,
    SmallGroup,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::Malformed => "malformed",
            RejectReason::ExcludedGroup => "excluded_group",
            RejectReason::EmptyBody => "empty_body",
            RejectReason::PromoTag => "promo_tag",
            RejectReason::PromoPattern => "promo_pattern",
            RejectReason::PromoFlair => "promo_flair",
            RejectReason::HiringOrCoupon => "hiring_or_coupon",
            RejectReason::LinkWall => "link_wall",
            RejectReason::BodyTooLong => "body_too_long",
            RejectReason::Stale => "stale",
            RejectReason::SmallGroup => "small_group",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(RejectReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admit)
    }
}

const TAG_WORDS: &str =
    "hiring|ad|advertisement|sponsored|promo|promotion|deal|sale|discount|giveaway|contest|affiliate|referral";

static PREFIX_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^\s*(\[({TAG_WORDS})\]|\(({TAG_WORDS})\))")).expect("prefix tag regex")
});

static PROMO_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d+\s*%\s*off",
        r"save\s*\$?\d+",
        r"limited\s*time\s*offer",
        r"click\s*here",
        r"dm\s*for\s*promo",
        r"(discount|promo)\s*code",
        r"exclusive\s*offer",
        r"special\s*price",
        r"(buy|order)\s*now",
        r"sale\s*ends",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("promo pattern regex"))
    .collect()
});

static HIRING_TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhir(?:e|ing)\b").expect("hiring regex"));
static HIRING_BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhiring\b").expect("hiring body regex"));

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s)]+").expect("url regex"));
static MARKDOWN_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]+\]\([^)]+\)").expect("markdown url regex"));

const FLAIR_TERMS: [&str; 4] = ["ad", "sponsored", "advertisement", "promotion"];

/// Stateless admission filter over a policy. Shareable across requests.
#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    policy: FilterPolicy,
}

impl AdmissionFilter {
    pub fn new(policy: FilterPolicy) -> Self {
        let mut policy = policy;
        policy.sanitize();
        Self { policy }
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// Evaluate one raw candidate at `now` against the profile's recency
    /// window and exclusion set. Any single failing rule rejects.
    pub fn evaluate(
        &self,
        item: &CandidateItem,
        now: DateTime<Utc>,
        profile: &InterestProfile,
    ) -> Admission {
        if !item.is_well_formed() {
            return self.reject(item, RejectReason::Malformed);
        }

        if profile
            .excluded_groups
            .iter()
            .any(|g| g.eq_ignore_ascii_case(&item.group))
        {
            return self.reject(item, RejectReason::ExcludedGroup);
        }

        let title = item.title.to_lowercase();
        let body = item.body.to_lowercase();

        if PREFIX_TAG_RE.is_match(&title) || PREFIX_TAG_RE.is_match(&body) {
            return self.reject(item, RejectReason::PromoTag);
        }

        if PROMO_PATTERNS.iter().any(|re| re.is_match(&title)) {
            return self.reject(item, RejectReason::PromoPattern);
        }

        if let Some(flair) = &item.flair {
            let flair = flair.to_lowercase();
            if FLAIR_TERMS.iter().any(|t| flair.contains(t)) {
                return self.reject(item, RejectReason::PromoFlair);
            }
        }

        const CODE_PHRASES: [&str; 3] = ["coupon code", "promo code", "discount code"];
        if CODE_PHRASES
            .iter()
            .any(|p| title.contains(p) || body.contains(p))
            || HIRING_TITLE_RE.is_match(&title)
            || HIRING_BODY_RE.is_match(&body)
        {
            return self.reject(item, RejectReason::HiringOrCoupon);
        }

        if body.trim().is_empty() {
            let excused = self.policy.allow_bodyless_discussions
                && item.comment_count >= self.policy.min_comments_for_exception;
            if !excused {
                return self.reject(item, RejectReason::EmptyBody);
            }
        }

        if self.is_link_wall(&body, item.comment_count) {
            return self.reject(item, RejectReason::LinkWall);
        }

        if body.chars().count() > self.policy.body_char_cap {
            return self.reject(item, RejectReason::BodyTooLong);
        }

        if let Some(max_age) = profile.recency_window.max_age() {
            if now.signed_duration_since(item.created_at) > max_age {
                return self.reject(item, RejectReason::Stale);
            }
        }

        if item.group_subscribers < self.policy.min_group_subscribers {
            return self.reject(item, RejectReason::SmallGroup);
        }

        Admission::Admit
    }

    /// A body that links out, runs long, and is formatted like a landing
    /// page, while nobody bothered to comment.
    fn is_link_wall(&self, body: &str, comment_count: u32) -> bool {
        if comment_count >= self.policy.min_comments_for_exception {
            return false;
        }
        if !(URL_RE.is_match(body) || MARKDOWN_URL_RE.is_match(body)) {
            return false;
        }
        if body.split_whitespace().count() <= self.policy.link_wall_word_limit {
            return false;
        }
        let headers = body
            .lines()
            .filter(|l| l.trim_start().starts_with('#'))
            .count();
        let bullets = body
            .lines()
            .filter(|l| {
                let t = l.trim_start();
                t.starts_with('*') || t.starts_with('-') || t.starts_with('+')
            })
            .count();
        headers > self.policy.link_wall_max_headers && bullets > self.policy.link_wall_max_bullets
    }

    fn reject(&self, item: &CandidateItem, reason: RejectReason) -> Admission {
        if dev_logging_enabled() {
            // Never log raw text, only a hashed id.
            debug!(target: "filter", id = %anon_hash(&item.full_text()), %reason, "rejected");
        }
        Admission::Reject(reason)
    }
}

// Dev logging gate: RANKER_DEV_LOG=1 in a debug build.
fn dev_logging_enabled() -> bool {
    cfg!(debug_assertions) && std::env::var("RANKER_DEV_LOG").ok().as_deref() == Some("1")
}

pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
