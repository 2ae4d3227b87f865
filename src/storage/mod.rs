use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::store::Note;

const STORE_TMP_EXTENSION: &str = "json.tmp";

/// Handle to the shared on-disk note store. Cheap to clone; every clone
/// observes the same self-write marker, which the watcher uses to tell
/// this process's writes apart from external ones.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: Arc<PathBuf>,
    last_write: Arc<Mutex<Option<Instant>>>,
}

impl StoreFile {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            last_write: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted collection. Missing or unparseable data is an
    /// empty store, never a fatal condition.
    pub fn load(&self) -> Vec<Note> {
        let raw = match fs::read(&*self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                tracing::warn!(?err, path = %self.path.display(), "store file unreadable, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(notes) => notes,
            Err(err) => {
                tracing::warn!(?err, path = %self.path.display(), "store file malformed, starting empty");
                Vec::new()
            }
        }
    }

    /// Serialize the collection and atomically replace the store file,
    /// so concurrent readers never observe a torn value.
    pub fn persist(&self, notes: &[Note]) -> Result<()> {
        let json = serde_json::to_vec_pretty(notes).context("serialising note store")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating store directory {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension(STORE_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary store file {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &*self.path)
            .with_context(|| format!("replacing store file {}", self.path.display()))?;
        *self.last_write.lock() = Some(Instant::now());
        tracing::trace!(count = notes.len(), "persisted note store");
        Ok(())
    }

    /// True when this process wrote the store within the given window.
    pub(crate) fn wrote_recently(&self, window: Duration) -> bool {
        self.last_write
            .lock()
            .is_some_and(|at| at.elapsed() < window)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn sample_notes() -> Vec<Note> {
        ["Newest", "Middle", "Oldest"]
            .into_iter()
            .map(|title| {
                let now = time::OffsetDateTime::now_utc();
                Note {
                    id: uuid::Uuid::new_v4().to_string(),
                    title: title.to_string(),
                    content: format!("{title} body"),
                    created_at: now,
                    updated_at: now,
                }
            })
            .collect()
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("absent.json"));
        assert!(file.load().is_empty());
    }

    #[test]
    fn malformed_file_loads_as_empty() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("notes.json");
        fs::write(&path, b"{not json!").expect("writing junk");
        let file = StoreFile::new(path);
        assert!(file.load().is_empty());
    }

    #[test]
    fn persist_then_load_preserves_notes_and_order() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("notes.json"));
        let notes = sample_notes();

        file.persist(&notes).expect("persist");
        let loaded = file.load();

        assert_eq!(loaded, notes);
        assert_eq!(loaded[0].title, "Newest");
        assert_eq!(loaded[2].title, "Oldest");
    }

    #[test]
    fn persist_overwrites_prior_value_even_with_empty_collection() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("notes.json"));
        file.persist(&sample_notes()).expect("seed persist");

        file.persist(&[]).expect("empty persist");
        assert!(file.load().is_empty());
    }

    #[test]
    fn persist_leaves_no_temporary_file_behind() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("notes.json"));
        file.persist(&sample_notes()).expect("persist");

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("notes.json")]);
    }

    #[test]
    fn write_marker_expires_with_the_window() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("notes.json"));
        assert!(!file.wrote_recently(Duration::from_secs(1)));

        file.persist(&[]).expect("persist");
        assert!(file.wrote_recently(Duration::from_secs(5)));
        assert!(!file.wrote_recently(Duration::ZERO));
    }
}
