// src/shard.rs
//! Shard planner: splits a keyword set into overlapping two-keyword query
//! shards. Pairing keywords raises recall over a single OR-query while
//! keeping each query under source length limits; the overlap is resolved
//! downstream by the dedup tracker.

use crate::profile::InterestProfile;

/// All unordered 2-combinations of the effective primary keyword list, in
/// list order. A single usable keyword yields one size-1 shard instead of
/// an empty plan.
pub fn plan_shards(profile: &InterestProfile) -> Vec<Vec<String>> {
    let keywords: Vec<&String> = profile
        .effective_primary()
        .iter()
        .filter(|k| !k.trim().is_empty())
        .collect();

    match keywords.len() {
        0 => Vec::new(),
        1 => vec![vec![keywords[0].clone()]],
        _ => {
            let mut plan = Vec::with_capacity(keywords.len() * (keywords.len() - 1) / 2);
            for i in 0..keywords.len() {
                for j in (i + 1)..keywords.len() {
                    plan.push(vec![keywords[i].clone(), keywords[j].clone()]);
                }
            }
            plan
        }
    }
}

/// Query text for one shard: keywords quoted and OR-joined.
pub fn shard_query(shard: &[String]) -> String {
    shard
        .iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}
