use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::store::Note;

/// Render a note the way the download surface ships it: title, blank
/// line, content.
pub fn render(note: &Note) -> String {
    format!("{}\n\n{}", note.title, note.content)
}

/// Export file name for a title: every character outside ASCII
/// alphanumerics becomes an underscore, the rest is lowercased, and a
/// `.txt` extension is appended.
pub fn file_name(title: &str) -> String {
    let mut sanitized = String::with_capacity(title.len() + 4);
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
        } else {
            sanitized.push('_');
        }
    }
    sanitized.push_str(".txt");
    sanitized
}

/// Write the note's export rendering into `dir`, returning the path.
pub fn write_note(note: &Note, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(file_name(&note.title));
    fs::write(&path, render(note))
        .with_context(|| format!("writing export file {}", path.display()))?;
    tracing::debug!(id = %note.id, path = %path.display(), "exported note");
    Ok(path)
}
