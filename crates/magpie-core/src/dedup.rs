use std::collections::HashSet;

use crate::record::JobPosting;

pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Single-pass, order-preserving deduplicator.
///
/// Uniqueness is decided against both an externally supplied set of
/// already-known apply URLs and the records accepted earlier in the same
/// batch. Near-duplicate state is batch-local; only the known-URL set is
/// assumed to survive between runs.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
        }
    }

    /// Overrides the title-similarity threshold for the near-duplicate
    /// check.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Filters `jobs` down to first-seen unique records, in input order.
    pub fn dedupe(&self, jobs: Vec<JobPosting>, known_urls: &HashSet<String>) -> Vec<JobPosting> {
        let total = jobs.len();
        let mut seen: HashSet<String> = known_urls.iter().map(|u| u.trim().to_string()).collect();
        let mut accepted: Vec<JobPosting> = Vec::with_capacity(total);
        let mut dropped_empty = 0usize;
        let mut dropped_exact = 0usize;
        let mut dropped_similar = 0usize;

        for job in jobs {
            let url = job.apply_url.trim();
            if url.is_empty() {
                tracing::warn!(title = %job.title, source = %job.source, "Dropping job without apply URL");
                dropped_empty += 1;
                continue;
            }
            if seen.contains(url) {
                dropped_exact += 1;
                continue;
            }
            if self.near_duplicate_of(&job, &accepted) {
                dropped_similar += 1;
                continue;
            }
            seen.insert(url.to_string());
            accepted.push(job);
        }

        let removed = dropped_empty + dropped_exact + dropped_similar;
        if removed > 0 {
            tracing::info!(
                %removed,
                exact = %dropped_exact,
                similar = %dropped_similar,
                empty = %dropped_empty,
                kept = %accepted.len(),
                total = %total,
                "Removed duplicate jobs"
            );
        }
        accepted
    }

    fn near_duplicate_of(&self, job: &JobPosting, accepted: &[JobPosting]) -> bool {
        let company = job.company.trim().to_lowercase();
        let tokens = title_tokens(&job.title);
        accepted.iter().any(|kept| {
            kept.company.trim().to_lowercase() == company
                && jaccard(&tokens, &title_tokens(&kept.title)) >= self.threshold
        })
    }
}

/// Title word set for the similarity check.
///
/// Tokens that are wholly bracketed, like `(Remote)` or `[Contract]`,
/// are annotations rather than part of the role name and are excluded,
/// so a re-post differing only by such a suffix compares as identical.
fn title_tokens(title: &str) -> HashSet<String> {
    title
        .split_whitespace()
        .filter(|t| !is_bracketed(t))
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_bracketed(token: &str) -> bool {
    (token.starts_with('(') && token.ends_with(')'))
        || (token.starts_with('[') && token.ends_with(']'))
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(title: &str, company: &str, url: &str) -> JobPosting {
        JobPosting::new(title, company, url, "Test")
    }

    fn urls(jobs: &[JobPosting]) -> Vec<&str> {
        jobs.iter().map(|j| j.apply_url.as_str()).collect()
    }

    #[test]
    fn test_exact_url_duplicates_are_dropped() {
        let jobs = vec![
            job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
            job("Backend Engineer (repost)", "Acme", "https://acme.dev/jobs/1"),
            job("Data Engineer", "Acme", "https://acme.dev/jobs/2"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        assert_eq!(urls(&unique), vec!["https://acme.dev/jobs/1", "https://acme.dev/jobs/2"]);
    }

    #[test]
    fn test_known_urls_are_respected() {
        let known: HashSet<String> = ["https://acme.dev/jobs/1".to_string()].into();
        let jobs = vec![
            job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
            job("Data Engineer", "Acme", "https://acme.dev/jobs/2"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &known);
        assert_eq!(urls(&unique), vec!["https://acme.dev/jobs/2"]);
    }

    #[test]
    fn test_empty_url_is_dropped() {
        let jobs = vec![
            job("Backend Engineer", "Acme", "   "),
            job("Data Engineer", "Acme", "https://acme.dev/jobs/2"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].apply_url, "https://acme.dev/jobs/2");
    }

    #[test]
    fn test_repost_with_remote_suffix_is_a_near_duplicate() {
        let jobs = vec![
            job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
            job("Backend Engineer (Remote)", "Acme", "https://acme.dev/jobs/9"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        assert_eq!(urls(&unique), vec!["https://acme.dev/jobs/1"]);
    }

    #[test]
    fn test_different_titles_same_company_are_kept() {
        let jobs = vec![
            job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
            job("Frontend Designer", "Acme", "https://acme.dev/jobs/2"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_same_title_different_company_is_kept() {
        let jobs = vec![
            job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
            job("Backend Engineer", "Globex", "https://globex.dev/jobs/1"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_company_match_is_case_insensitive() {
        let jobs = vec![
            job("Backend Engineer", "Acme Corp", "https://acme.dev/jobs/1"),
            job("Backend Engineer", "  ACME CORP ", "https://acme.dev/jobs/9"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_order_is_preserved() {
        let jobs = vec![
            job("A", "Acme", "https://acme.dev/jobs/3"),
            job("B", "Acme", "https://acme.dev/jobs/1"),
            job("C", "Acme", "https://acme.dev/jobs/2"),
        ];
        let unique = Deduplicator::new().dedupe(jobs, &HashSet::new());
        let titles: Vec<&str> = unique.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let jobs = vec![
            job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
            job("Backend Engineer (Remote)", "Acme", "https://acme.dev/jobs/2"),
            job("Frontend Designer", "Acme", "https://acme.dev/jobs/3"),
        ];
        let dedup = Deduplicator::new();
        let once = dedup.dedupe(jobs, &HashSet::new());
        let twice = dedup.dedupe(once.clone(), &HashSet::new());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_threshold_is_tunable() {
        let jobs = || {
            vec![
                job("Backend Engineer", "Acme", "https://acme.dev/jobs/1"),
                job("Senior Backend Engineer", "Acme", "https://acme.dev/jobs/2"),
            ]
        };
        // Jaccard here is 2/3, below the default threshold.
        assert_eq!(Deduplicator::new().dedupe(jobs(), &HashSet::new()).len(), 2);
        assert_eq!(
            Deduplicator::new()
                .with_threshold(0.5)
                .dedupe(jobs(), &HashSet::new())
                .len(),
            1
        );
    }

    #[test]
    fn test_title_tokens_strip_annotations_and_punctuation() {
        let a = title_tokens("Backend Engineer (Remote)");
        let b = title_tokens("backend engineer,");
        assert_eq!(a, b);
    }
}
