use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use time::OffsetDateTime;

use crate::storage::StoreFile;

mod note;
mod selection;

pub use note::{Note, NoteDraft, DEFAULT_TITLE, MAX_CONTENT_CHARS, MAX_NOTES, MAX_TITLE_CHARS};
pub use selection::Selection;

/// Minimum interval between successful note creations.
pub const CREATE_THROTTLE: Duration = Duration::from_millis(2000);

#[derive(Debug, Error)]
pub enum StoreError {
    /// Creation attempted before the throttle window elapsed.
    #[error("creation throttled, wait before creating another note")]
    Throttled,
    /// Creation attempted while the collection is at its ceiling.
    #[error("note limit of 10 reached")]
    CapacityExceeded,
    /// The collection mutated in memory but could not be written out.
    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

/// Result of an update request. Rejections are ordinary outcomes, not
/// errors: the caller decides whether anything needs surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The change would push content past the cap; nothing was mutated.
    ContentTooLong,
    /// No note with that id; benign, it may have just been deleted by
    /// another instance.
    NotFound,
}

/// Transient user-facing messages produced by store mutations, drained
/// and rendered by the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Throttled,
    CapacityReached,
    NoteDeleted,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Notice::Throttled => "Please wait before creating another note",
            Notice::CapacityReached => "Maximum of 10 notes allowed",
            Notice::NoteDeleted => "The note has been deleted",
        };
        f.write_str(message)
    }
}

/// Owns the canonical note collection and its selection, persisting the
/// collection after every mutation. Opening the store adopts whatever
/// the file currently holds and never writes by itself.
#[derive(Debug)]
pub struct NoteStore {
    file: StoreFile,
    notes: Vec<Note>,
    selection: Selection,
    last_created: Option<Instant>,
    throttle: Duration,
    notices: Vec<Notice>,
}

impl NoteStore {
    pub fn open(file: StoreFile) -> Self {
        let notes = file.load();
        let mut selection = Selection::default();
        selection.repair(&notes);
        tracing::debug!(count = notes.len(), "opened note store");
        Self {
            file,
            notes,
            selection,
            last_created: None,
            throttle: CREATE_THROTTLE,
            notices: Vec::new(),
        }
    }

    pub fn file(&self) -> &StoreFile {
        &self.file
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn selected_note_id(&self) -> Option<&str> {
        self.selection.current()
    }

    pub fn selected_note(&self) -> Option<&Note> {
        let id = self.selection.current()?;
        self.notes.iter().find(|note| note.id == id)
    }

    /// Manual selection. Accepted only when the target note exists.
    pub fn select(&mut self, id: &str) -> bool {
        if self.note(id).is_some() {
            self.selection.set(id);
            true
        } else {
            false
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Create a new note at the head of the collection and select it.
    /// Throttled and at-capacity attempts leave the collection untouched.
    pub fn create(&mut self) -> Result<String, StoreError> {
        if let Some(last) = self.last_created {
            if last.elapsed() < self.throttle {
                self.notices.push(Notice::Throttled);
                return Err(StoreError::Throttled);
            }
        }
        if self.notes.len() >= MAX_NOTES {
            self.notices.push(Notice::CapacityReached);
            return Err(StoreError::CapacityExceeded);
        }

        let note = Note::fresh();
        let id = note.id.clone();
        self.notes.insert(0, note);
        self.last_created = Some(Instant::now());
        self.selection.set(id.clone());
        self.file.persist(&self.notes)?;
        tracing::debug!(%id, "created note");
        Ok(id)
    }

    /// Apply field changes to the note matching `id`. The content cap is
    /// re-validated here regardless of what the input boundary promised.
    pub fn update(&mut self, id: &str, draft: NoteDraft) -> Result<UpdateOutcome, StoreError> {
        let Some(index) = self.notes.iter().position(|note| note.id == id) else {
            tracing::debug!(%id, "update for unknown note ignored");
            return Ok(UpdateOutcome::NotFound);
        };
        if let Some(content) = draft.content.as_deref() {
            if content.chars().count() > MAX_CONTENT_CHARS {
                tracing::debug!(%id, "rejected update exceeding content cap");
                return Ok(UpdateOutcome::ContentTooLong);
            }
        }
        if draft.is_empty() {
            return Ok(UpdateOutcome::Applied);
        }

        let note = &mut self.notes[index];
        if let Some(title) = draft.title {
            note.title = title;
        }
        if let Some(content) = draft.content {
            note.content = content;
        }
        note.updated_at = OffsetDateTime::now_utc();
        self.file.persist(&self.notes)?;
        Ok(UpdateOutcome::Applied)
    }

    /// Remove the note matching `id`. Unknown ids are ignored. Selection
    /// is repaired before this returns.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        if self.notes.len() == before {
            tracing::debug!(%id, "delete for unknown note ignored");
            return Ok(false);
        }
        self.selection.repair(&self.notes);
        self.file.persist(&self.notes)?;
        self.notices.push(Notice::NoteDeleted);
        tracing::debug!(%id, "deleted note");
        Ok(true)
    }

    /// Adopt the collection another process persisted: replace local
    /// state wholesale and repair the selection. Never writes back.
    pub fn reconcile(&mut self) {
        self.notes = self.file.load();
        self.selection.repair(&self.notes);
        tracing::debug!(count = self.notes.len(), "reconciled store after external write");
    }

    #[cfg(test)]
    pub(crate) fn set_throttle(&mut self, throttle: Duration) {
        self.throttle = throttle;
    }
}
