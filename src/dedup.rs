use std::collections::HashSet;

use tracing::debug;

use crate::model::JobPosting;

/// Drop postings whose URL is already stored, and repeated URLs within the
/// batch (first occurrence wins). No field-level merging.
pub fn select_new(existing: &HashSet<String>, batch: Vec<JobPosting>) -> Vec<JobPosting> {
    let mut seen: HashSet<String> = HashSet::with_capacity(batch.len());
    let total = batch.len();
    let fresh: Vec<JobPosting> = batch
        .into_iter()
        .filter(|p| !existing.contains(&p.url) && seen.insert(p.url.clone()))
        .collect();
    debug!(
        "Deduplication kept {} of {} postings ({} known URLs)",
        fresh.len(),
        total,
        existing.len()
    );
    fresh
}

// ── Tests ──
