use serde::{Deserialize, Serialize};

/// Text blocks a job description is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Responsibilities,
    Requirements,
    Benefits,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::Responsibilities,
        Section::Requirements,
        Section::Benefits,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Responsibilities => "responsibilities",
            Section::Requirements => "requirements",
            Section::Benefits => "benefits",
        }
    }

    fn headers(&self) -> &'static [&'static str] {
        match self {
            Section::Responsibilities => &[
                "responsibilities",
                "duties",
                "tasks",
                "key responsibilities",
                "as a",
                "you will",
                "role",
            ],
            Section::Requirements => &[
                "requirements",
                "qualifications",
                "skills",
                "education",
                "experience",
                "we are looking for",
                "poszukujemy",
            ],
            Section::Benefits => &[
                "benefits",
                "what we offer",
                "perks",
                "compensation",
                "offers",
                "oferujemy",
                "benefity",
            ],
        }
    }

    fn from_header(line_lower: &str) -> Option<Section> {
        Section::ALL
            .into_iter()
            .find(|s| s.headers().contains(&line_lower))
    }
}

// "â€¢" is a UTF-8 bullet read back as cp1252, still present in older descriptions.
const BULLETS: &[&str] = &["•", "â€¢", "-", "*"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptionSections {
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
}

impl DescriptionSections {
    pub fn get(&self, section: Section) -> &[String] {
        match section {
            Section::Responsibilities => &self.responsibilities,
            Section::Requirements => &self.requirements,
            Section::Benefits => &self.benefits,
        }
    }

    fn push(&mut self, section: Section, line: String) {
        match section {
            Section::Responsibilities => self.responsibilities.push(line),
            Section::Requirements => self.requirements.push(line),
            Section::Benefits => self.benefits.push(line),
        }
    }
}

/// Single pass over the description lines. A header line switches the
/// active section; bulleted lines under an active section are kept
/// verbatim (trimmed). Everything else is skipped without resetting state.
pub fn extract_sections(description: &str) -> DescriptionSections {
    let mut sections = DescriptionSections::default();
    let mut current: Option<Section> = None;

    for line in description.lines().map(str::trim) {
        let lower = line.to_lowercase();
        let header = lower.trim_end_matches(':');

        if let Some(found) = Section::from_header(header) {
            current = Some(found);
        } else if let Some(section) = current {
            if BULLETS.iter().any(|b| line.starts_with(b)) {
                sections.push(section, line.to_string());
            }
        }
    }

    sections
}

// ── Tests ──
