use super::note::Note;

/// Tracks the single active note id. Whenever set, the id references a
/// note present in the owning store's collection; the store re-establishes
/// that invariant with [`Selection::repair`] before any mutation returns.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    current: Option<String>,
}

impl Selection {
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn set(&mut self, id: impl Into<String>) {
        self.current = Some(id.into());
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Keep the current id if it survived the collection change,
    /// otherwise fall back to the first (newest) note, or none when the
    /// collection is empty.
    pub fn repair(&mut self, notes: &[Note]) {
        let still_present = self
            .current
            .as_deref()
            .is_some_and(|id| notes.iter().any(|note| note.id == id));
        if !still_present {
            self.current = notes.first().map(|note| note.id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(ids: &[&str]) -> Vec<Note> {
        ids.iter()
            .map(|id| {
                let mut note = Note::fresh();
                note.id = (*id).to_string();
                note
            })
            .collect()
    }

    #[test]
    fn repair_keeps_surviving_selection() {
        let mut selection = Selection::default();
        selection.set("b");
        selection.repair(&notes(&["a", "b", "c"]));
        assert_eq!(selection.current(), Some("b"));
    }

    #[test]
    fn repair_falls_back_to_first_note() {
        let mut selection = Selection::default();
        selection.set("gone");
        selection.repair(&notes(&["a", "b"]));
        assert_eq!(selection.current(), Some("a"));
    }

    #[test]
    fn repair_clears_selection_when_collection_is_empty() {
        let mut selection = Selection::default();
        selection.set("gone");
        selection.repair(&[]);
        assert_eq!(selection.current(), None);
    }

    #[test]
    fn repair_adopts_first_note_when_nothing_was_selected() {
        let mut selection = Selection::default();
        selection.repair(&notes(&["a", "b"]));
        assert_eq!(selection.current(), Some("a"));
    }
}
