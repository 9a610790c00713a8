use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::Salary;

static RANGE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[–-]").unwrap());
static NON_NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\d,.]").unwrap());

const HOURS_PER_MONTH: f64 = 160.0;
const HOURS_PER_YEAR: f64 = 2080.0;
const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Hourly,
    Monthly,
    Yearly,
}

impl Period {
    /// Parse a locale-specific period token ("godz", "mies.", "yr", "YEAR", ...).
    pub fn from_token(token: &str) -> Option<Period> {
        let t = token.trim().trim_end_matches('.').trim().to_lowercase();
        match t.as_str() {
            "godz" | "hr" | "hour" => Some(Period::Hourly),
            "mies" | "mth" | "month" => Some(Period::Monthly),
            "rok" | "yr" | "year" => Some(Period::Yearly),
            _ => None,
        }
    }
}

/// One salary observation as a source reports it, before conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryObservation {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    pub tax_basis: Option<String>,
    pub period: Option<String>,
}

/// Multiplier taking an amount from `from` into `to`.
///
/// An unknown or missing period counts as already being in the target
/// unit (factor 1). That fallback is kept as observed upstream and logged.
pub fn conversion_factor(from: Option<Period>, to: Period) -> f64 {
    let Some(from) = from else {
        return 1.0;
    };
    match (from, to) {
        (Period::Hourly, Period::Hourly) => 1.0,
        (Period::Hourly, Period::Monthly) => HOURS_PER_MONTH,
        (Period::Hourly, Period::Yearly) => HOURS_PER_YEAR,
        (Period::Monthly, Period::Hourly) => 1.0 / HOURS_PER_MONTH,
        (Period::Monthly, Period::Monthly) => 1.0,
        (Period::Monthly, Period::Yearly) => MONTHS_PER_YEAR,
        (Period::Yearly, Period::Hourly) => 1.0 / HOURS_PER_YEAR,
        (Period::Yearly, Period::Monthly) => 1.0 / MONTHS_PER_YEAR,
        (Period::Yearly, Period::Yearly) => 1.0,
    }
}

/// Convert an observation into a `(min, max)` range in `target` terms.
///
/// A single amount becomes a degenerate range. Arithmetic stays in `f64`
/// and is rounded once when the `Salary` is built.
pub fn normalize(obs: &SalaryObservation, target: Period) -> Option<Salary> {
    let (min, max) = match (obs.min, obs.max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min),
        (None, Some(max)) => (max, max),
        (None, None) => return None,
    };

    let period = obs.period.as_deref().and_then(Period::from_token);
    if period.is_none() {
        warn!(
            "Unrecognized salary period {:?}, treating amounts as already {:?}",
            obs.period, target
        );
    }
    let factor = conversion_factor(period, target);
    let salary = Salary::from_amounts(min * factor, max * factor);
    debug!(
        "Normalized {:?}-{:?} {} {} per {:?} -> {:?}",
        obs.min,
        obs.max,
        obs.currency.as_deref().unwrap_or("?"),
        obs.tax_basis.as_deref().unwrap_or("-"),
        period,
        salary
    );
    salary
}

/// Parse an amount like "10 000–15 000 zł" or "120,50 zł" into (min, max).
/// Decimal commas become points; a single amount fills both ends.
pub fn parse_amount_range(text: &str) -> (Option<f64>, Option<f64>) {
    let parts: Vec<&str> = RANGE_SPLIT_RE.split(text).collect();
    match parts.as_slice() {
        [single] => {
            let v = parse_amount(single);
            (v, v)
        }
        [low, high] => (parse_amount(low), parse_amount(high)),
        _ => (None, None),
    }
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC_RE.replace_all(raw, "").replace(',', ".");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Build an observation from the amount text, currency and the
/// "brutto / mies." style tax-and-period line.
pub fn observation_from_text(
    amount: &str,
    currency: Option<&str>,
    tax_period: Option<&str>,
) -> SalaryObservation {
    let (min, max) = parse_amount_range(amount);
    let (tax_basis, period) = match tax_period {
        Some(tp) => {
            let mut parts = tp.splitn(2, '/');
            let tax = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            let period = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
            (tax, period)
        }
        None => (None, None),
    };
    SalaryObservation {
        min,
        max,
        currency: currency.map(str::trim).filter(|c| !c.is_empty()).map(String::from),
        tax_basis,
        period,
    }
}

// ── Tests ──
