use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;

const PRACUJ_LISTING: &str =
    "https://it.pracuj.pl/praca/data%20engineer;kw/warszawa;wp/ostatnich%2024h;p,1?sc=0";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub jsearch: JsearchSettings,
    pub pracuj: PracujSettings,
    pub classifier: ClassifierSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsearchSettings {
    pub api_key: Option<String>,
    pub host: Option<String>,
    /// Scheme and authority to call; `https://{host}` when unset.
    pub base_url: Option<String>,
    pub query: String,
    pub page: String,
    pub num_pages: String,
    pub country: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PracujSettings {
    pub listing_url: String,
    pub spider_api_key: Option<String>,
    pub recruiter_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSettings {
    pub endpoint: String,
    pub model: String,
    pub token: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub calls_per_minute: usize,
    pub safety_margin_ms: u64,
    pub timeout_secs: u64,
}

impl Settings {
    /// Defaults, then `.env`, then `JOBS_*` variables (`__` separates
    /// nested keys, e.g. `JOBS_CLASSIFIER__MODEL`). The bare credential
    /// variables of the existing deployment are honoured too.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let builder = Self::defaults()?
            .add_source(
                Environment::with_prefix("JOBS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("jsearch.api_key", std::env::var("RAPIDAPI_KEY").ok())?
            .set_override_option("jsearch.host", std::env::var("RAPIDAPI_HOST").ok())?
            .set_override_option("pracuj.spider_api_key", std::env::var("SPIDER_API_KEY").ok())?
            .set_override_option("classifier.token", std::env::var("GITHUB_TOKEN").ok())?;
        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
        let builder = Config::builder()
            .set_default("database_path", "data/jobs.sqlite")?
            .set_default("jsearch.query", "Data engineer in Warsaw via Linkedin, Warsaw, Poland")?
            .set_default("jsearch.page", "1")?
            .set_default("jsearch.num_pages", "1")?
            .set_default("jsearch.country", "us")?
            .set_default("jsearch.timeout_secs", 10_i64)?
            .set_default("pracuj.listing_url", PRACUJ_LISTING)?
            .set_default("pracuj.recruiter_prefix", "https://pracodawcy.pracuj.pl/")?
            .set_default("classifier.endpoint", "https://models.inference.ai.azure.com")?
            .set_default("classifier.model", "gpt-4o")?
            .set_default("classifier.temperature", 0.5_f64)?
            .set_default("classifier.top_p", 1.0_f64)?
            .set_default("classifier.max_tokens", 1000_i64)?
            .set_default("classifier.calls_per_minute", 15_i64)?
            .set_default("classifier.safety_margin_ms", 100_i64)?
            .set_default("classifier.timeout_secs", 60_i64)?;
        Ok(builder)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        builder
            .build()
            .context("Failed to assemble settings")?
            .try_deserialize()
            .context("Invalid settings")
    }
}

// ── Tests ──
