/// Closed categorical vocabularies a posting field can be mapped onto.
///
/// Synonym lists are bilingual (English / Polish) and matched as-is, no
/// translation step in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
    Level,
    Mode,
    Schedule,
    Contract,
}

pub const OTHER: &str = "other";

const LEVELS: &[(&str, &[&str])] = &[
    ("junior", &["junior", "graduate"]),
    ("mid", &["mid", "regular"]),
    ("senior", &["senior", "lead"]),
];

const MODES: &[(&str, &[&str])] = &[
    (
        "remote",
        &["remote", "remote work", "home office work", "zdalnie", "praca zdalna"],
    ),
    ("hybrid", &["hybrid", "hybrid work", "praca hybrydowa"]),
    ("office", &["office", "full office work", "praca stacjonarna"]),
    ("mobile", &["mobile work", "praca mobilna"]),
];

const SCHEDULES: &[(&str, &[&str])] = &[
    ("full-time", &["full-time", "pełny etat", "full time", "fulltime"]),
    ("part-time", &["part-time", "pół etatu", "part time", "parttime"]),
];

const CONTRACTS: &[(&str, &[&str])] = &[
    ("permanent", &["umowa o pracę", "contract of employment"]),
    ("b2b", &["kontrakt b2b", "b2b contract"]),
    ("contract", &["umowa zlecenie", "umowa o dzieło", "contractor"]),
];

impl Vocabulary {
    pub fn synonyms(self) -> &'static [(&'static str, &'static [&'static str])] {
        match self {
            Vocabulary::Level => LEVELS,
            Vocabulary::Mode => MODES,
            Vocabulary::Schedule => SCHEDULES,
            Vocabulary::Contract => CONTRACTS,
        }
    }

    /// Canonical labels, including the `other` sentinel where the vocabulary has one.
    pub fn labels(self) -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = self.synonyms().iter().map(|(l, _)| *l).collect();
        if self.falls_back_to_other() {
            labels.push(OTHER);
        }
        labels
    }

    /// Work mode has no sentinel: nothing recognised means nothing tagged.
    pub fn falls_back_to_other(self) -> bool {
        !matches!(self, Vocabulary::Mode)
    }

    fn finish(self, labels: Vec<String>) -> Vec<String> {
        if labels.is_empty() && self.falls_back_to_other() {
            vec![OTHER.to_string()]
        } else {
            labels
        }
    }
}

/// Substring match of every synonym against a free-text fragment.
/// Several labels may match at once; order follows the vocabulary table.
pub fn match_text(text: &str, vocab: Vocabulary) -> Vec<String> {
    let lower = text.to_lowercase();
    let labels = vocab
        .synonyms()
        .iter()
        .filter(|(_, synonyms)| synonyms.iter().any(|s| lower.contains(s)))
        .map(|(label, _)| label.to_string())
        .collect();
    vocab.finish(labels)
}

/// Set-membership match against pre-split fragments (e.g. a comma
/// separated badge). A fragment has to equal a synonym after trimming,
/// so "home office work" does not also count as "office".
pub fn match_fragments<S: AsRef<str>>(fragments: &[S], vocab: Vocabulary) -> Vec<String> {
    let cleaned: Vec<String> = fragments
        .iter()
        .map(|f| f.as_ref().trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();
    let labels = vocab
        .synonyms()
        .iter()
        .filter(|(_, synonyms)| synonyms.iter().any(|s| cleaned.iter().any(|f| f == s)))
        .map(|(label, _)| label.to_string())
        .collect();
    vocab.finish(labels)
}

/// Split a comma separated badge into fragments for [`match_fragments`].
pub fn split_fragments(raw: &str) -> Vec<String> {
    raw.split(',').map(|f| f.trim().to_lowercase()).collect()
}

/// Level badges carry the level inside parentheses: "specjalista (Mid / Regular)".
pub fn parenthesized_fragments(raw: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            break;
        };
        fragments.extend(
            after[..close]
                .split('/')
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty()),
        );
        rest = &after[close + 1..];
    }
    fragments
}

/// Level from a badge: parenthesised fragments when present, the whole text otherwise.
pub fn match_level_badge(raw: &str) -> Vec<String> {
    let fragments = parenthesized_fragments(raw);
    if fragments.is_empty() {
        match_text(raw, Vocabulary::Level)
    } else {
        match_fragments(&fragments, Vocabulary::Level)
    }
}

// ── Tests ──
