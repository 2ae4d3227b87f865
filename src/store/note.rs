use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Hard ceiling on the number of notes the store will hold.
pub const MAX_NOTES: usize = 10;
/// Hard cap on note content, enforced again by the store on every update.
pub const MAX_CONTENT_CHARS: usize = 5000;
/// Title cap, enforced at the input boundary (CLI/editor), not by the store.
pub const MAX_TITLE_CHARS: usize = 100;

pub const DEFAULT_TITLE: &str = "New Note";

/// A single user-authored note, shaped exactly like its persisted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Note {
    /// A brand-new note with default title, empty content, and both
    /// timestamps set to the same instant.
    pub(crate) fn fresh() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            content: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn word_count(&self) -> usize {
        let trimmed = self.content.trim();
        if trimmed.is_empty() {
            0
        } else {
            trimmed.split_whitespace().count()
        }
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Field changes submitted by an editor surface. `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteDraft {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}
