//! Card Data Structures
//!
//! This module defines the core `Card` struct and related types for Cardbox's
//! note-card documents.
//!
//! # Architecture
//!
//! - **Whole-document unit**: a Card is the atom of synchronization; there is
//!   no field-level merge between stores
//! - **Stable identity**: `meta.id` is assigned once at creation and never
//!   changes for the lifetime of the document
//! - **Monotonic modification time**: every persisted edit goes through
//!   [`Card::touch`], which guarantees `meta.modified` strictly increases
//!
//! # Examples
//!
//! ```rust
//! use cardbox_core::models::{Card, Section, SectionItem, SectionKind};
//!
//! let mut card = Card::new("Groceries".to_string());
//! card.description = "Weekly shopping run".to_string();
//! card.sections.push(Section {
//!     heading: "Produce".to_string(),
//!     kind: SectionKind::Checklist,
//!     items: vec![SectionItem::new("Apples"), SectionItem::new("Kale")],
//! });
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for Card operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid card ID format: {0}")]
    InvalidId(String),

    #[error("Invalid section kind: {0}")]
    InvalidSectionKind(String),
}

/// Identity and lifecycle metadata for a Card.
///
/// `id` is immutable once assigned. `created` is set once; `modified` must
/// strictly increase on every persisted write visible to either store, which
/// [`Card::touch`] enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMeta {
    /// Unique identifier (UUID), stable for the document's lifetime
    pub id: String,

    /// Creation timestamp
    pub created: DateTime<Utc>,

    /// Last modification timestamp (strictly increasing across edits)
    pub modified: DateTime<Utc>,
}

/// The list style of a section's items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    /// Bulleted list (`- item`)
    Unordered,
    /// Numbered list (`1. item`)
    Ordered,
    /// Task list with checkboxes (`- [ ] item`)
    Checklist,
}

/// A single entry within a section
///
/// `checked` is only meaningful for [`SectionKind::Checklist`] sections and
/// stays `false` for the other kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    pub text: String,

    #[serde(default)]
    pub checked: bool,
}

impl SectionItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            checked: false,
        }
    }

    pub fn checked(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            checked: true,
        }
    }
}

/// A titled, ordered group of items within a Card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub heading: String,
    pub kind: SectionKind,
    pub items: Vec<SectionItem>,
}

/// A note-card document — the unit synchronized by the engine.
///
/// # Fields
///
/// - `title`: display title of the card
/// - `meta`: identity and timestamps ([`CardMeta`])
/// - `description`: free-form body text, preserved verbatim (including
///   internal blank lines) across serialization
/// - `sections`: ordered sequence of [`Section`]s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub title: String,

    pub meta: CardMeta,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Card {
    /// Create a new Card with an auto-generated UUID and current timestamps
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use cardbox_core::models::Card;
    /// let card = Card::new("Reading list".to_string());
    /// assert_eq!(card.meta.created, card.meta.modified);
    /// ```
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            title,
            meta: CardMeta {
                id: Uuid::new_v4().to_string(),
                created: now,
                modified: now,
            },
            description: String::new(),
            sections: Vec::new(),
        }
    }

    /// Create a Card with an explicit id (used when re-hydrating from a store
    /// or from serialized text)
    pub fn new_with_id(id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            title,
            meta: CardMeta {
                id,
                created: now,
                modified: now,
            },
            description: String::new(),
            sections: Vec::new(),
        }
    }

    /// Bump `meta.modified` for a new edit.
    ///
    /// Guarantees a strict increase even when the wall clock has not advanced
    /// since the previous edit (sub-millisecond edits, clock stepping): the
    /// new value is `max(now, modified + 1ms)`.
    ///
    /// Persistence itself never calls this — saving an unchanged card must be
    /// idempotent. Callers invoke it at the edit boundary.
    pub fn touch(&mut self) {
        let now = Utc::now();
        let floor = self.meta.modified + Duration::milliseconds(1);
        self.meta.modified = if now > floor { now } else { floor };
    }

    /// Remote filename for this card (`<id>.md`)
    pub fn remote_name(&self) -> String {
        format!("{}.md", self.meta.id)
    }

    /// Validate structural invariants before persisting
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.meta.id.trim().is_empty() {
            return Err(ValidationError::InvalidId(self.meta.id.clone()));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title".to_string()));
        }
        Ok(())
    }
}
