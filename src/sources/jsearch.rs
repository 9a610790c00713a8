use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::JsearchSettings;
use crate::model::{JobPosting, PostingDraft, Source};
use crate::normalize::compensation::{normalize, Period, SalaryObservation};
use crate::normalize::taxonomy::{match_text, Vocabulary};

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<ApiJob>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiJob {
    job_title: Option<String>,
    employer_name: Option<String>,
    job_description: Option<String>,
    job_location: Option<String>,
    job_city: Option<String>,
    job_country: Option<String>,
    job_employment_type: Option<String>,
    job_is_remote: Option<bool>,
    job_highlights: Option<Highlights>,
    job_benefits: Option<Vec<String>>,
    job_min_salary: Option<f64>,
    job_max_salary: Option<f64>,
    job_salary_period: Option<String>,
    job_apply_link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Highlights {
    #[serde(default)]
    responsibilities: Vec<String>,
    #[serde(default)]
    qualifications: Vec<String>,
    #[serde(default)]
    benefits: Vec<String>,
}

impl ApiJob {
    /// `None` when the result has no apply link to key it by.
    pub fn into_posting(self) -> Option<JobPosting> {
        let url = self.job_apply_link.filter(|u| !u.trim().is_empty())?;

        let location = self.job_location.filter(|l| !l.trim().is_empty()).or_else(|| {
            let parts: Vec<String> = [self.job_city, self.job_country]
                .into_iter()
                .flatten()
                .filter(|p| !p.trim().is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        });

        let highlights = self.job_highlights.unwrap_or_default();
        let benefits = if highlights.benefits.is_empty() {
            self.job_benefits.unwrap_or_default()
        } else {
            highlights.benefits
        };

        let employment = self.job_employment_type.as_deref();
        let salary = (self.job_min_salary.is_some() || self.job_max_salary.is_some())
            .then(|| SalaryObservation {
                min: self.job_min_salary,
                max: self.job_max_salary,
                period: self.job_salary_period,
                ..Default::default()
            })
            .and_then(|obs| normalize(&obs, Period::Monthly));

        let draft = PostingDraft {
            level: self
                .job_title
                .as_deref()
                .map(|t| match_text(t, Vocabulary::Level))
                .unwrap_or_default(),
            schedule: employment
                .map(|e| match_text(e, Vocabulary::Schedule))
                .unwrap_or_default(),
            contract: employment
                .map(|e| match_text(e, Vocabulary::Contract))
                .unwrap_or_default(),
            mode: if self.job_is_remote == Some(true) {
                vec!["remote".to_string()]
            } else {
                Vec::new()
            },
            title: self.job_title,
            company: self.employer_name,
            description: self.job_description,
            location,
            responsibilities: highlights.responsibilities,
            requirements: highlights.qualifications,
            benefits,
            salary,
        };
        Some(JobPosting::from_draft(url, Source::Jsearch, draft))
    }
}

pub fn map_response(body: SearchResponse) -> Vec<JobPosting> {
    let total = body.data.len();
    let postings: Vec<JobPosting> = body
        .data
        .into_iter()
        .filter_map(ApiJob::into_posting)
        .collect();
    if postings.len() < total {
        warn!("Skipped {} jsearch results without an apply link", total - postings.len());
    }
    debug!("Jsearch API: mapped {} jobs", postings.len());
    postings
}

/// A non-200 answer, a transport error or missing credentials all give an
/// empty batch for this source only.
pub async fn extract(settings: &JsearchSettings) -> Vec<JobPosting> {
    let (Some(key), Some(host)) = (settings.api_key.as_deref(), settings.host.as_deref()) else {
        warn!("RAPIDAPI_KEY / RAPIDAPI_HOST not set, skipping jsearch");
        return Vec::new();
    };
    match fetch(settings, key, host).await {
        Ok(postings) => postings,
        Err(e) => {
            error!("Jsearch extraction failed: {:#}", e);
            Vec::new()
        }
    }
}

async fn fetch(settings: &JsearchSettings, key: &str, host: &str) -> Result<Vec<JobPosting>> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;
    let base = settings
        .base_url
        .clone()
        .unwrap_or_else(|| format!("https://{}", host));
    let url = format!("{}/search", base.trim_end_matches('/'));
    info!("Running {}", url);

    let response = client
        .get(&url)
        .header("x-rapidapi-key", key)
        .header("x-rapidapi-host", host)
        .query(&[
            ("query", settings.query.as_str()),
            ("page", settings.page.as_str()),
            ("num_pages", settings.num_pages.as_str()),
            ("country", settings.country.as_str()),
        ])
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    let status = response.status();
    if status != StatusCode::OK {
        bail!("Failed to retrieve data from {}, status code: {}", url, status);
    }
    let body: SearchResponse = response
        .json()
        .await
        .context("Malformed jsearch response")?;
    Ok(map_response(body))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_once;

    fn fixture() -> SearchResponse {
        let raw = std::fs::read_to_string("tests/fixtures/jsearch_response.json").unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn maps_fixture_and_skips_missing_links() {
        let postings = map_response(fixture());
        assert_eq!(postings.len(), 2);
        assert!(postings.iter().all(|p| p.source == Source::Jsearch));
    }

    #[test]
    fn full_record() {
        let p = &map_response(fixture())[0];
        assert_eq!(p.url, "https://careers.example.com/jobs/123");
        assert_eq!(p.title.as_deref(), Some("Senior Data Engineer"));
        assert_eq!(p.company.as_deref(), Some("Initech"));
        assert_eq!(p.location.as_deref(), Some("Warsaw, Poland"));
        assert_eq!(p.level, Some(vec!["senior".to_string()]));
        assert_eq!(p.schedule, Some(vec!["full-time".to_string()]));
        assert_eq!(p.contract, Some(vec!["other".to_string()]));
        assert_eq!(p.mode, Some(vec!["remote".to_string()]));
        assert_eq!(
            p.requirements,
            Some(vec!["5+ years with Spark".to_string(), "Strong SQL".to_string()])
        );
        assert_eq!(p.benefits, Some(vec!["Private healthcare".to_string()]));
        let s = p.salary.unwrap();
        assert_eq!((s.min(), s.max()), (10000, 12000));
    }

    #[test]
    fn sparse_record_falls_back() {
        let p = &map_response(fixture())[1];
        assert_eq!(p.location.as_deref(), Some("Warszawa, PL"));
        assert_eq!(p.level, Some(vec!["other".to_string()]));
        assert_eq!(p.contract, Some(vec!["contract".to_string()]));
        assert!(p.mode.is_none());
        assert!(p.responsibilities.is_none());
        assert_eq!(p.benefits, Some(vec!["dental_coverage".to_string()]));
        let s = p.salary.unwrap();
        assert_eq!((s.min(), s.max()), (24000, 24000));
    }

    #[test]
    fn missing_data_array() {
        let body: SearchResponse = serde_json::from_str(r#"{"status":"ERROR"}"#).unwrap();
        assert!(map_response(body).is_empty());
    }

    fn settings(api_key: Option<&str>, base_url: Option<String>) -> JsearchSettings {
        JsearchSettings {
            api_key: api_key.map(String::from),
            host: Some("jsearch.p.rapidapi.com".into()),
            base_url,
            query: "Data engineer in Warsaw".into(),
            page: "1".into(),
            num_pages: "1".into(),
            country: "us".into(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn missing_credentials_skip_source() {
        assert!(extract(&settings(None, None)).await.is_empty());
    }

    #[tokio::test]
    async fn ok_response_is_mapped() {
        let body = std::fs::read_to_string("tests/fixtures/jsearch_response.json").unwrap();
        let (base, request) = serve_once("200 OK", body).await;
        let postings = extract(&settings(Some("secret"), Some(base))).await;
        assert_eq!(postings.len(), 2);

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /search?"));
        assert!(request.contains("x-rapidapi-key: secret"));
        assert!(request.contains("x-rapidapi-host: jsearch.p.rapidapi.com"));
    }

    #[tokio::test]
    async fn non_200_yields_empty_batch() {
        let (base, _) = serve_once("500 Internal Server Error", r#"{"message":"down"}"#.into()).await;
        assert!(extract(&settings(Some("secret"), Some(base))).await.is_empty());

        let (base, _) = serve_once("429 Too Many Requests", r#"{"message":"quota"}"#.into()).await;
        assert!(extract(&settings(Some("secret"), Some(base))).await.is_empty());
    }

    #[tokio::test]
    async fn undecodable_body_yields_empty_batch() {
        let (base, _) = serve_once("200 OK", "<html>gateway</html>".into()).await;
        assert!(extract(&settings(Some("secret"), Some(base))).await.is_empty());
    }
}
