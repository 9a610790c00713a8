//! Best-effort backfill of missing description sections through the
//! keyword classifier, throttled by a sliding-window budget shared by
//! the whole batch.

pub mod classifier;
pub mod limiter;
pub mod prompt;

use tracing::{debug, warn};

use crate::model::JobPosting;
use crate::normalize::sections::{extract_sections, Section};
use classifier::{parse_keywords, ClassifierError, KeywordClassifier};
use limiter::RateLimiter;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentFailure {
    pub url: Option<String>,
    pub section: Section,
    pub reason: &'static str,
    pub detail: String,
}

#[derive(Debug, Default, Clone)]
pub struct EnrichmentReport {
    pub calls: usize,
    pub filled: usize,
    pub failures: Vec<EnrichmentFailure>,
}

pub struct EnrichmentCoordinator<C> {
    classifier: C,
    limiter: RateLimiter,
    report: EnrichmentReport,
    // Posting being enriched, attached to recorded failures.
    current_url: Option<String>,
}

impl<C: KeywordClassifier> EnrichmentCoordinator<C> {
    pub fn new(classifier: C, limiter: RateLimiter) -> Self {
        EnrichmentCoordinator {
            classifier,
            limiter,
            report: EnrichmentReport::default(),
            current_url: None,
        }
    }

    pub fn report(&self) -> &EnrichmentReport {
        &self.report
    }

    pub fn into_report(self) -> EnrichmentReport {
        self.report
    }

    /// Fill one field. A present non-empty `value` is returned untouched, as
    /// is any value when there are no `raw` lines to classify. Otherwise the
    /// call waits for budget, and on failure the incoming value comes back
    /// with the failure recorded.
    pub async fn process(
        &mut self,
        value: Option<Vec<String>>,
        raw: &[String],
        section: Section,
    ) -> Option<Vec<String>> {
        if value.as_ref().is_some_and(|v| !v.is_empty()) || raw.is_empty() {
            return value;
        }

        self.limiter.acquire().await;
        self.report.calls += 1;
        let user = prompt::user_prompt(section, raw);
        debug!("Classifying {} ({} lines)", section.as_str(), raw.len());

        let outcome = self
            .classifier
            .classify(&prompt::SYSTEM_PROMPT, &user)
            .await
            .and_then(|text| {
                let keywords = parse_keywords(&text);
                if keywords.is_empty() {
                    Err(ClassifierError::EmptyResponse)
                } else {
                    Ok(keywords)
                }
            });

        match outcome {
            Ok(keywords) => {
                self.report.filled += 1;
                Some(keywords)
            }
            Err(e) => {
                warn!(
                    "Enrichment of {} failed [{}] for {}: {}",
                    section.as_str(),
                    e.code(),
                    self.current_url.as_deref().unwrap_or("-"),
                    e
                );
                self.report.failures.push(EnrichmentFailure {
                    url: self.current_url.clone(),
                    section,
                    reason: e.code(),
                    detail: e.to_string(),
                });
                value
            }
        }
    }

    /// Backfill every absent section of a posting from its description.
    pub async fn enrich_posting(&mut self, posting: &mut JobPosting) {
        let missing = posting.missing_sections();
        if missing.is_empty() {
            return;
        }
        let Some(description) = posting.description.as_deref() else {
            debug!("No description to enrich {}", posting.url);
            return;
        };
        let sections = extract_sections(description);
        self.current_url = Some(posting.url.clone());

        for section in missing {
            let current = posting.section(section).clone();
            let filled = self.process(current, sections.get(section), section).await;
            posting.set_section(section, filled);
        }
        self.current_url = None;
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::model::{PostingDraft, Source};

    /// Replays canned answers and records every prompt it receives.
    struct ScriptedClassifier {
        answers: Mutex<VecDeque<Result<String, ClassifierError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClassifier {
        fn new(answers: Vec<Result<String, ClassifierError>>) -> Self {
            ScriptedClassifier {
                answers: Mutex::new(answers.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn always(answer: &str, n: usize) -> Self {
            Self::new((0..n).map(|_| Ok(answer.to_string())).collect())
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KeywordClassifier for ScriptedClassifier {
        async fn classify(&self, _system: &str, prompt: &str) -> Result<String, ClassifierError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ClassifierError::EmptyResponse))
        }
    }

    fn coordinator(classifier: ScriptedClassifier) -> EnrichmentCoordinator<ScriptedClassifier> {
        EnrichmentCoordinator::new(classifier, RateLimiter::per_minute(15, Duration::from_millis(100)))
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let mut c = coordinator(ScriptedClassifier::always("Bonuses", 1));
        let out = c.process(Some(vec![]), &[], Section::Benefits).await;
        assert_eq!(out, Some(vec![]));
        let out = c.process(None, &[], Section::Benefits).await;
        assert_eq!(out, None);
        assert_eq!(c.report().calls, 0);
        assert!(c.classifier.prompts().is_empty());
    }

    #[tokio::test]
    async fn present_value_is_kept() {
        let mut c = coordinator(ScriptedClassifier::always("Bonuses", 1));
        let existing = Some(lines(&["Health Insurance"]));
        let out = c
            .process(existing.clone(), &lines(&["- owocowe czwartki"]), Section::Benefits)
            .await;
        assert_eq!(out, existing);
        assert_eq!(c.report().calls, 0);
    }

    #[tokio::test]
    async fn success_parses_keywords() {
        let mut c = coordinator(ScriptedClassifier::always("ETL, AWS, 5+ YOE", 1));
        let raw = lines(&["- 6 years of ETL", "- AWS Glue"]);
        let out = c.process(None, &raw, Section::Requirements).await;
        assert_eq!(out, Some(lines(&["ETL", "AWS", "5+ YOE"])));
        assert_eq!(c.classifier.prompts(), vec!["requirements - 6 years of ETL, - AWS Glue"]);
        assert_eq!(c.report().filled, 1);
    }

    #[tokio::test]
    async fn failure_keeps_value_and_is_recorded() {
        let mut c = coordinator(ScriptedClassifier::new(vec![
            Err(ClassifierError::RateLimited("slow down".into())),
            Ok(" , ".into()),
        ]));
        let raw = lines(&["- Python"]);
        assert_eq!(c.process(None, &raw, Section::Requirements).await, None);
        assert_eq!(c.process(None, &raw, Section::Responsibilities).await, None);
        let report = c.report();
        assert_eq!(report.calls, 2);
        assert_eq!(report.filled, 0);
        let reasons: Vec<_> = report.failures.iter().map(|f| f.reason).collect();
        assert_eq!(reasons, vec!["rate_limited", "empty_response"]);
        assert!(report.failures.iter().all(|f| f.url.is_none()));
    }

    #[tokio::test]
    async fn posting_fields_fail_independently() {
        let mut c = coordinator(ScriptedClassifier::new(vec![
            Err(ClassifierError::Connection("refused".into())),
            Ok("Health Insurance, Bonuses".into()),
        ]));
        let draft = PostingDraft {
            title: Some("Data Engineer".into()),
            description: Some(
                "Requirements:\n- Python\nBenefits:\n* Private medical care\n* Annual bonus".into(),
            ),
            ..Default::default()
        };
        let mut posting = JobPosting::from_draft("https://example.com/a", Source::Jsearch, draft);
        c.enrich_posting(&mut posting).await;

        // Responsibilities had no lines, requirements failed, benefits filled.
        assert!(posting.responsibilities.is_none());
        assert!(posting.requirements.is_none());
        assert_eq!(posting.benefits, Some(lines(&["Health Insurance", "Bonuses"])));
        assert_eq!(c.report().calls, 2);
        assert_eq!(c.report().failures[0].url.as_deref(), Some("https://example.com/a"));
        assert_eq!(c.report().failures[0].section, Section::Requirements);

        // A later standalone call is no longer attributed to that posting.
        c.process(None, &lines(&["- Go"]), Section::Requirements).await;
        assert!(c.report().failures.last().unwrap().url.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_shares_one_budget() {
        let mut c = coordinator(ScriptedClassifier::always("SQL", 16));
        let raw = lines(&["- SQL"]);
        let start = Instant::now();
        for _ in 0..15 {
            c.process(None, &raw, Section::Requirements).await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        c.process(None, &raw, Section::Requirements).await;
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(c.report().calls, 16);
    }
}
