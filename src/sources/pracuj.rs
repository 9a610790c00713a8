use std::sync::LazyLock;

use indicatif::{ProgressBar, ProgressStyle};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};

use crate::config::PracujSettings;
use crate::model::{JobPosting, PostingDraft, Salary, Source};
use crate::normalize::compensation::{normalize, observation_from_text, Period};
use crate::normalize::taxonomy::{
    match_fragments, match_level_badge, match_text, split_fragments, Vocabulary,
};
use crate::sources::renderer::PageRenderer;

fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

// ── Listing selectors ──

static OFFER: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"div[data-test="positioned-offer"], div[data-test="default-offer"]"#)
});
static COMPANY: LazyLock<Selector> = LazyLock::new(|| sel(r#"h3[data-test="text-company-name"]"#));
static REGION: LazyLock<Selector> = LazyLock::new(|| sel(r#"h4[data-test="text-region"]"#));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| sel("a"));

// ── Detail selectors ──

static TITLE: LazyLock<Selector> = LazyLock::new(|| sel(r#"h1[data-scroll-id="job-title"]"#));
static LEVEL_BADGE: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"li[data-scroll-id="position-levels"] div[data-test="offer-badge-title"]"#)
});
static CONTRACT_BADGE: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"li[data-scroll-id="contract-types"] div[data-test="offer-badge-title"]"#)
});
static MODE_BADGE: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"li[data-scroll-id="work-modes"] div[data-test="offer-badge-title"]"#)
});
static SCHEDULE_BADGE: LazyLock<Selector> = LazyLock::new(|| {
    sel(r#"li[data-scroll-id="work-schedules"] div[data-test="offer-badge-title"]"#)
});
static ABOUT_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"ul[data-test="text-about-project"] li"#));
static SALARY_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"div[data-test="section-salaryPerContractType"]"#));
static EARNING_AMOUNT: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"div[data-test="text-earningAmount"]"#));
static DIV: LazyLock<Selector> = LazyLock::new(|| sel("div"));
static RESPONSIBILITIES: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"section[data-test="section-responsibilities"] li"#));
static REQUIREMENTS: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"section[data-test="section-requirements"] li"#));
static OFFERED: LazyLock<Selector> = LazyLock::new(|| sel(r#"section[data-test="section-offered"]"#));
static BENEFITS: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"section[data-test="section-benefits"]"#));
static LI: LazyLock<Selector> = LazyLock::new(|| sel("li"));
static BENEFIT_TITLE: LazyLock<Selector> =
    LazyLock::new(|| sel(r#"div[data-test="text-benefit-title"]"#));

/// One offer card from the search listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub url: String,
    pub company: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Default)]
pub struct PracujReport {
    pub listed: usize,
    pub skipped_recruiter: usize,
    pub failed: Vec<(String, String)>,
}

/// Text content with each node trimmed and glued together.
fn stripped_text(el: ElementRef) -> String {
    el.text().map(str::trim).collect::<Vec<_>>().join("")
}

/// Text content as it appears, trimmed at the ends.
fn item_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(item_text)
        .filter(|t| !t.is_empty())
}

/// Badge text, node by node trimmed, lower-cased for matching.
fn badge_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(stripped_text)
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

pub fn parse_listing(html: &str, recruiter_prefix: &str) -> (Vec<ListingEntry>, usize) {
    let doc = Html::parse_document(html);
    let mut entries = Vec::new();
    let mut skipped = 0;

    for card in doc.select(&OFFER) {
        let Some(href) = card
            .select(&ANCHOR)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            debug!("Offer card without a link, skipping");
            continue;
        };
        if href.starts_with(recruiter_prefix) {
            skipped += 1;
            continue;
        }
        entries.push(ListingEntry {
            url: href.to_string(),
            company: first_text(card, &COMPANY),
            location: first_text(card, &REGION),
        });
    }
    (entries, skipped)
}

pub fn parse_detail(html: &str, entry: &ListingEntry) -> JobPosting {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let badge = |selector: &Selector| badge_text(root, selector);

    let description = {
        let lines: Vec<String> = root.select(&ABOUT_ITEMS).map(item_text).collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    };

    let draft = PostingDraft {
        title: first_text(root, &TITLE),
        company: entry.company.clone(),
        location: entry.location.clone(),
        description,
        level: badge(&LEVEL_BADGE)
            .map(|t| match_level_badge(&t))
            .unwrap_or_default(),
        contract: badge(&CONTRACT_BADGE)
            .map(|t| match_text(&t, Vocabulary::Contract))
            .unwrap_or_default(),
        mode: badge(&MODE_BADGE)
            .map(|t| match_fragments(&split_fragments(&t), Vocabulary::Mode))
            .unwrap_or_default(),
        schedule: badge(&SCHEDULE_BADGE)
            .map(|t| match_fragments(&split_fragments(&t), Vocabulary::Schedule))
            .unwrap_or_default(),
        responsibilities: root.select(&RESPONSIBILITIES).map(item_text).collect(),
        requirements: root.select(&REQUIREMENTS).map(item_text).collect(),
        benefits: benefits(root),
        salary: root
            .select(&SALARY_BLOCK)
            .next()
            .and_then(|block| block.select(&EARNING_AMOUNT).next())
            .and_then(salary),
    };
    JobPosting::from_draft(entry.url.clone(), Source::Pracuj, draft)
}

/// Benefits are a plain list on some offers and titled tiles on others.
fn benefits(root: ElementRef) -> Vec<String> {
    let Some(section) = root
        .select(&OFFERED)
        .next()
        .or_else(|| root.select(&BENEFITS).next())
    else {
        return Vec::new();
    };
    let items: Vec<String> = section.select(&LI).map(item_text).collect();
    if !items.is_empty() {
        return items;
    }
    section.select(&BENEFIT_TITLE).map(item_text).collect()
}

/// Amount text, currency in its first child div, "brutto / mies." in the
/// next sibling div.
fn salary(amount: ElementRef) -> Option<Salary> {
    let currency = amount.select(&DIV).next().map(stripped_text);
    let tax_period = amount
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "div")
        .map(item_text);
    let obs = observation_from_text(
        &stripped_text(amount),
        currency.as_deref(),
        tax_period.as_deref(),
    );
    if obs.min.is_none() {
        return None;
    }
    normalize(&obs, Period::Monthly)
}

/// Render the listing, then every offer page through the same session.
/// A page that fails is logged and skipped.
pub async fn extract<R: PageRenderer>(
    renderer: &R,
    settings: &PracujSettings,
    limit: Option<usize>,
) -> (Vec<JobPosting>, PracujReport) {
    let mut report = PracujReport::default();
    info!("Running {}", settings.listing_url);

    let listing = match renderer.render(&settings.listing_url).await {
        Ok(html) => html,
        Err(e) => {
            error!("Failed to retrieve listing {}: {:#}", settings.listing_url, e);
            return (Vec::new(), report);
        }
    };

    let (mut entries, skipped) = parse_listing(&listing, &settings.recruiter_prefix);
    report.skipped_recruiter = skipped;
    if let Some(n) = limit {
        entries.truncate(n);
    }
    report.listed = entries.len();
    info!(
        "Listing has {} offers ({} recruiter links skipped)",
        entries.len(),
        skipped
    );

    let pb = ProgressBar::new(entries.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("pracuj");

    let mut postings = Vec::with_capacity(entries.len());
    for entry in &entries {
        match renderer.render(&entry.url).await {
            Ok(html) => {
                let posting = parse_detail(&html, entry);
                debug!("Parsed {} ({:?})", entry.url, posting.title);
                postings.push(posting);
            }
            Err(e) => {
                warn!("Failed to retrieve job details from {}: {:#}", entry.url, e);
                report.failed.push((entry.url.clone(), e.to_string()));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    (postings, report)
}

// ── Tests ──
