//! # SOP Document Normalization
//!
//! Policy documents arrive as files named after their document codes, e.g.
//! `OP.MRC.CT Fire_Drill Policy.txt` or `CC.12.MRC - Intake Procedure.md`,
//! filed in folders such as `Safety (SF)`. This module turns a file name,
//! its folder and its text into the fields stored on an SOP.

use std::sync::LazyLock;

use regex::Regex;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("BUG: hardcoded pattern rejected by regex")
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s+"));
static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| compile(r"\s{2,}"));
static DOC_CODE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[A-Z]{2}(\.[A-Za-z0-9]+)+\.?\s*[-–—]?\s*"));
static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bP\s*&\s*P\b",
        r"(?i)\bPolicy\s*&\s*Procedures?\b",
        r"(?i)\bPolicy\b",
        r"(?i)\bProcedure\b",
        r"(?i)\bSOP\b",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});
static DASHES: LazyLock<Regex> = LazyLock::new(|| compile(r"[-–—]+"));
static FOLDER_CODE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(.*?)\s*\([A-Z]{2,3}\)$"));
static LAST_REVIEWED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)last\s+reviewed:\s*([0-1]?\d/\d{4})"));
static ADMIN_HEADERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Last\s+Reviewed:[^\n]*",
        r"(?i)Additional\s+Authority:[^\n]*",
        r"(?i)CARF\s+Reference:[^\n]*",
        r"(?i)Regulation:[^\n]*",
        r"(?i)Attachment\(s\):[^\n]*",
    ]
    .iter()
    .map(|p| compile(p))
    .collect()
});
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| compile(r"\n{3,}"));

/// Fallback category when no rule matches.
pub const DEFAULT_CATEGORY: &str = "Operations";

/// Keyword rules, first match wins.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    (
        "Admissions",
        &["admission", "intake", "screening", "referral", "assessment", "eligibility"],
    ),
    (
        "Medication",
        &["medication", "prescription", "controlled", "narcan", "drug destruction", "med log"],
    ),
    ("Incident Reporting", &["incident", "injury", "report", "event"]),
    (
        "Safety",
        &["fire", "evacuation", "drill", "emergency", "crisis", "overdose", "contraband", "search"],
    ),
    (
        "Compliance",
        &["roi", "release of information", "42 cfr", "part 2", "confidential", "hipaa"],
    ),
    (
        "Staffing",
        &["staffing", "training", "orientation", "competency", "background check"],
    ),
];

const DOCUMENT_EXTENSIONS: &[&str] = &[".docx", ".txt", ".md"];

/// Derive a display title from a document file name.
pub fn clean_title(file_name: &str) -> String {
    let mut title = file_name.to_string();
    for ext in DOCUMENT_EXTENSIONS {
        if let Some(stripped) = title.strip_suffix(ext) {
            title = stripped.to_string();
            break;
        }
    }
    let title = title.replace('_', " ");
    let title = WHITESPACE.replace_all(title.trim(), " ");
    let mut title = DOC_CODE_PREFIX.replace(&title, "").into_owned();
    for pattern in BOILERPLATE.iter() {
        title = pattern.replace_all(&title, "").into_owned();
    }
    let title = DASHES.replace_all(&title, " ");
    MULTI_SPACE.replace_all(title.trim(), " ").trim().to_string()
}

/// Category from a folder named like `Client Care (CC)`.
pub fn folder_category(folder: &str) -> Option<String> {
    FOLDER_CODE
        .captures(folder.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Guess a category from title and content keywords.
pub fn infer_category(title: &str, content: &str) -> &'static str {
    let haystack = format!("{title}\n{content}").to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map_or(DEFAULT_CATEGORY, |(category, _)| category)
}

/// `Last Reviewed: 3/2024` → `3/2024`.
pub fn extract_last_reviewed(content: &str) -> Option<String> {
    LAST_REVIEWED
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Remove administrative header lines and collapse blank lines.
pub fn strip_admin_header_lines(content: &str) -> String {
    let mut text = content.to_string();
    for pattern in ADMIN_HEADERS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Join non-empty trimmed paragraphs with a blank line.
pub fn normalize_paragraphs(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// An SOP read from a document file, ready to upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SopDocument {
    pub title: String,
    pub category: String,
    pub content: String,
    pub content_clean: String,
    pub last_reviewed: Option<String>,
}

impl SopDocument {
    /// Build from a file name, the name of its parent folder, and its text.
    ///
    /// Returns `None` for documents with no text or no usable title.
    pub fn from_text(file_name: &str, folder: Option<&str>, raw: &str) -> Option<Self> {
        let content = normalize_paragraphs(raw);
        if content.is_empty() {
            return None;
        }
        let title = clean_title(file_name);
        if title.is_empty() {
            return None;
        }
        let category = folder
            .and_then(folder_category)
            .unwrap_or_else(|| infer_category(&title, &content).to_string());
        Some(Self {
            last_reviewed: extract_last_reviewed(&content),
            content_clean: strip_admin_header_lines(&content),
            title,
            category,
            content,
        })
    }
}
