use std::collections::HashSet;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::enrich::classifier::KeywordClassifier;
use crate::enrich::EnrichmentCoordinator;
use crate::model::JobPosting;

/// Drop repeated URLs (first occurrence wins) and records that cannot be
/// identified by a reader (no title or no company). List sanitizing
/// already happened when the posting was built.
pub fn clean(batch: Vec<JobPosting>) -> Vec<JobPosting> {
    let total = batch.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let kept: Vec<JobPosting> = batch
        .into_iter()
        .filter(|p| {
            if !seen.insert(p.url.clone()) {
                debug!("Dropping repeated {}", p.url);
                return false;
            }
            let keep = p.title.is_some() && p.company.is_some();
            if !keep {
                debug!("Dropping {} (title or company missing)", p.url);
            }
            keep
        })
        .collect();
    info!("Cleaning kept {} of {} postings", kept.len(), total);
    kept
}

/// Backfill missing sections for the whole batch through one coordinator,
/// so every record draws from the same call budget.
pub async fn enrich_batch<C: KeywordClassifier>(
    coordinator: &mut EnrichmentCoordinator<C>,
    batch: &mut [JobPosting],
) {
    let pb = ProgressBar::new(batch.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    for posting in batch.iter_mut() {
        pb.set_message(format!("{} calls", coordinator.report().calls));
        coordinator.enrich_posting(posting).await;
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = coordinator.report();
    info!(
        "Enrichment made {} classifier calls, filled {} fields, {} failures",
        report.calls,
        report.filled,
        report.failures.len()
    );
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::enrich::classifier::ClassifierError;
    use crate::enrich::limiter::RateLimiter;
    use crate::model::{PostingDraft, Source};

    struct EchoCategory;

    #[async_trait]
    impl KeywordClassifier for EchoCategory {
        async fn classify(&self, _system: &str, prompt: &str) -> Result<String, ClassifierError> {
            match prompt.split_whitespace().next() {
                Some("benefits") => Ok("Health Insurance".into()),
                Some("requirements") => Ok("SQL, Python".into()),
                _ => Err(ClassifierError::Malformed("unexpected category".into())),
            }
        }
    }

    fn posting(url: &str, title: Option<&str>, company: Option<&str>, desc: &str) -> JobPosting {
        JobPosting::from_draft(
            url,
            Source::Jsearch,
            PostingDraft {
                title: title.map(String::from),
                company: company.map(String::from),
                description: Some(desc.into()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn clean_drops_unidentifiable_records() {
        let batch = vec![
            posting("https://x/1", Some("Data Engineer"), Some("Acme"), ""),
            posting("https://x/2", None, Some("Acme"), ""),
            posting("https://x/3", Some("ETL Dev"), Some("  "), ""),
        ];
        let kept = clean(batch);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://x/1");
    }

    #[test]
    fn clean_keeps_first_of_repeated_urls() {
        let batch = vec![
            posting("https://x/1", Some("Data Engineer"), Some("Acme"), "first"),
            posting("https://x/1", Some("Data Engineer"), Some("Acme"), "second"),
            posting("https://x/2", Some("ETL Dev"), Some("Globex"), ""),
        ];
        let kept = clean(batch);
        let urls: Vec<&str> = kept.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/1", "https://x/2"]);
        assert_eq!(kept[0].description.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn repeated_url_is_enriched_once() {
        let mut coordinator = EnrichmentCoordinator::new(
            EchoCategory,
            RateLimiter::per_minute(15, Duration::from_millis(100)),
        );
        let desc = "Requirements:\n- SQL\nBenefits:\n* Medical care";
        let mut batch = clean(vec![
            posting("https://x/1", Some("Data Engineer"), Some("Acme"), desc),
            posting("https://x/1", Some("Data Engineer"), Some("Acme"), desc),
        ]);
        enrich_batch(&mut coordinator, &mut batch).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(coordinator.report().calls, 2);
    }

    #[tokio::test]
    async fn batch_enrichment_fills_and_isolates() {
        let mut coordinator = EnrichmentCoordinator::new(
            EchoCategory,
            RateLimiter::per_minute(15, Duration::from_millis(100)),
        );
        let mut batch = vec![
            posting(
                "https://x/1",
                Some("Data Engineer"),
                Some("Acme"),
                "Requirements:\n- SQL\nResponsibilities:\n- Build pipelines",
            ),
            posting("https://x/2", Some("ETL Dev"), Some("Acme"), "Benefits:\n* Medical care"),
        ];
        enrich_batch(&mut coordinator, &mut batch).await;

        assert_eq!(batch[0].requirements, Some(vec!["SQL".to_string(), "Python".to_string()]));
        assert!(batch[0].responsibilities.is_none());
        assert_eq!(batch[1].benefits, Some(vec!["Health Insurance".to_string()]));

        let report = coordinator.into_report();
        assert_eq!(report.calls, 3);
        assert_eq!(report.filled, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].reason, "malformed");
    }
}
