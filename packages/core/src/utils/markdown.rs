//! Card markdown format
//!
//! Serialization between [`Card`] values and the heading-based outline
//! format stored on both sides of the sync engine:
//!
//! ```text
//! ---
//! id: 7b0c9f0e-...
//! created: 2026-01-10T08:00:00.000Z
//! modified: 2026-01-12T17:30:00.000Z
//! ---
//!
//! # Title
//!
//! Free-form description, preserved verbatim.
//!
//! ## Section heading
//! - [ ] open item
//! - [x] done item
//! ```
//!
//! `parse` and `serialize` are a pure function pair: id, title, sections,
//! and the description's internal blank lines survive a round trip. Leading
//! and trailing blank lines of the description are normalized away — they
//! are indistinguishable from the format's own separators.

use crate::models::{Card, CardMeta, Section, SectionItem, SectionKind};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors produced while parsing a card document
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Document has no front-matter block")]
    MissingFrontMatter,

    #[error("Front matter is missing required field: {0}")]
    MissingField(String),

    #[error("Front matter field '{field}' has unparseable timestamp: {value}")]
    BadTimestamp { field: String, value: String },

    #[error("Document has no title heading")]
    MissingTitle,
}

/// `## heading` line
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^##\s+(.*)$").unwrap());

/// Checklist item: `- [ ] text` / `- [x] text`
static CHECKLIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[([ xX])\]\s?(.*)$").unwrap());

/// Ordered item: `1. text`
static ORDERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());

/// Unordered item: `- text` (also tolerates `*` and `+` markers)
static UNORDERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*+]\s+(.*)$").unwrap());

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a card to its markdown document
pub fn serialize(card: &Card) -> String {
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str(&format!("id: {}\n", card.meta.id));
    out.push_str(&format!("created: {}\n", format_timestamp(card.meta.created)));
    out.push_str(&format!("modified: {}\n", format_timestamp(card.meta.modified)));
    out.push_str("---\n\n");

    out.push_str(&format!("# {}\n", card.title));

    let description = card.description.trim_matches('\n');
    if !description.is_empty() {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }

    for section in &card.sections {
        out.push('\n');
        out.push_str(&format!("## {}\n", section.heading));
        for (index, item) in section.items.iter().enumerate() {
            match section.kind {
                SectionKind::Unordered => out.push_str(&format!("- {}\n", item.text)),
                SectionKind::Ordered => out.push_str(&format!("{}. {}\n", index + 1, item.text)),
                SectionKind::Checklist => {
                    let mark = if item.checked { 'x' } else { ' ' };
                    out.push_str(&format!("- [{}] {}\n", mark, item.text));
                }
            }
        }
    }

    out
}

/// Parse a markdown document back into a card
pub fn parse(text: &str) -> Result<Card, FormatError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;

    // Front matter
    while i < lines.len() && lines[i].trim().is_empty() {
        i += 1;
    }
    if i >= lines.len() || lines[i].trim() != "---" {
        return Err(FormatError::MissingFrontMatter);
    }
    i += 1;

    let mut id = None;
    let mut created = None;
    let mut modified = None;
    let mut closed = false;
    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if line.trim() == "---" {
            closed = true;
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim();
            match key.trim() {
                "id" => id = Some(value.to_string()),
                "created" => created = Some(parse_timestamp("created", value)?),
                "modified" => modified = Some(parse_timestamp("modified", value)?),
                _ => {} // Unknown keys are ignored for forward compatibility
            }
        }
    }
    if !closed {
        return Err(FormatError::MissingFrontMatter);
    }

    let id = id
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FormatError::MissingField("id".to_string()))?;
    let created = created.ok_or_else(|| FormatError::MissingField("created".to_string()))?;
    let modified = modified.ok_or_else(|| FormatError::MissingField("modified".to_string()))?;

    // Title
    while i < lines.len() && lines[i].trim().is_empty() {
        i += 1;
    }
    let title = match lines.get(i) {
        Some(line) if line.starts_with("# ") => line[2..].trim().to_string(),
        _ => return Err(FormatError::MissingTitle),
    };
    i += 1;

    // Description: everything up to the first section heading, with the
    // leading/trailing separator blanks stripped and internal blanks kept
    let mut description_lines: Vec<&str> = Vec::new();
    while i < lines.len() && !SECTION_RE.is_match(lines[i]) {
        description_lines.push(lines[i]);
        i += 1;
    }
    while description_lines
        .first()
        .is_some_and(|l| l.trim().is_empty())
    {
        description_lines.remove(0);
    }
    while description_lines
        .last()
        .is_some_and(|l| l.trim().is_empty())
    {
        description_lines.pop();
    }
    let description = description_lines.join("\n");

    // Sections
    let mut sections = Vec::new();
    while i < lines.len() {
        let Some(caps) = SECTION_RE.captures(lines[i]) else {
            i += 1;
            continue;
        };
        let heading = caps[1].trim().to_string();
        i += 1;

        let mut kind: Option<SectionKind> = None;
        let mut items = Vec::new();
        while i < lines.len() && !SECTION_RE.is_match(lines[i]) {
            let line = lines[i];
            i += 1;
            if line.trim().is_empty() {
                continue;
            }

            let (line_kind, text, checked) = if let Some(caps) = CHECKLIST_RE.captures(line) {
                let checked = !caps[1].trim().is_empty();
                (SectionKind::Checklist, caps[2].to_string(), checked)
            } else if let Some(caps) = ORDERED_RE.captures(line) {
                (SectionKind::Ordered, caps[1].to_string(), false)
            } else if let Some(caps) = UNORDERED_RE.captures(line) {
                (SectionKind::Unordered, caps[1].to_string(), false)
            } else {
                // Bare text under a heading (hand-edited file): keep it as
                // an item rather than dropping user content
                (
                    kind.unwrap_or(SectionKind::Unordered),
                    line.trim().to_string(),
                    false,
                )
            };

            // The first item fixes the section kind
            let kind = *kind.get_or_insert(line_kind);
            items.push(SectionItem {
                text,
                checked: checked && kind == SectionKind::Checklist,
            });
        }

        sections.push(Section {
            heading,
            kind: kind.unwrap_or(SectionKind::Unordered),
            items,
        });
    }

    Ok(Card {
        title,
        meta: CardMeta {
            id,
            created,
            modified,
        },
        description,
        sections,
    })
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, FormatError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| FormatError::BadTimestamp {
            field: field.to_string(),
            value: value.to_string(),
        })
}
