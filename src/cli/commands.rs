use std::env;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::export;
use crate::store::{
    NoteDraft, NoteStore, StoreError, UpdateOutcome, MAX_CONTENT_CHARS, MAX_TITLE_CHARS,
};
use crate::sync::StoreWatcher;

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (defaults to "New Note")
    #[arg()]
    pub title: Option<String>,
    /// Provide the note content inline. If omitted, reads from stdin.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note id (a unique prefix is enough)
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Note id (a unique prefix is enough)
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New content. If both flags are omitted, content is read from stdin.
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// Note id (a unique prefix is enough)
    pub id: String,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Note id (a unique prefix is enough)
    pub id: String,
    /// Directory to write the .txt file into (defaults to the current directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Note id (a unique prefix is enough)
    pub id: String,
}

pub fn list_notes(store: &NoteStore) -> Result<()> {
    if store.is_empty() {
        println!("No notes yet.");
        return Ok(());
    }
    for note in store.notes() {
        println!("{}  {}", note.id, note.title);
        println!("    updated {}", format_timestamp(note.updated_at));
    }
    Ok(())
}

pub fn new_note(store: &mut NoteStore, args: NewArgs) -> Result<()> {
    if let Some(title) = args.title.as_deref() {
        check_title(title)?;
    }
    let content = match args.content {
        Some(content) => Some(content),
        None => read_stdin()?,
    };
    if let Some(content) = content.as_deref() {
        check_content(content)?;
    }

    let id = match store.create() {
        Ok(id) => id,
        Err(StoreError::Throttled | StoreError::CapacityExceeded) => {
            for notice in store.drain_notices() {
                eprintln!("{notice}");
            }
            return Ok(());
        }
        Err(StoreError::Persist(err)) => return Err(err),
    };

    let draft = NoteDraft {
        title: args.title,
        content,
    };
    if !draft.is_empty() {
        apply_update(store, &id, draft)?;
    }
    println!("Created note {id}");
    Ok(())
}

fn apply_update(store: &mut NoteStore, id: &str, draft: NoteDraft) -> Result<UpdateOutcome> {
    let outcome = store.update(id, draft)?;
    if outcome == UpdateOutcome::ContentTooLong {
        bail!("note content is limited to {MAX_CONTENT_CHARS} characters");
    }
    Ok(outcome)
}

pub fn show_note(store: &NoteStore, args: ShowArgs) -> Result<()> {
    let id = resolve_note_id(store, &args.id)?;
    let note = store.note(&id).context("note vanished while reading")?;
    println!("{}", note.content);
    Ok(())
}

pub fn edit_note(store: &mut NoteStore, args: EditArgs) -> Result<()> {
    let id = resolve_note_id(store, &args.id)?;

    let content = match args.content {
        Some(content) => Some(content),
        None if args.title.is_none() => read_stdin()?,
        None => None,
    };
    let draft = NoteDraft {
        title: args.title,
        content,
    };
    if draft.is_empty() {
        bail!("nothing to change, pass --title or --content (or pipe new content)");
    }
    if let Some(title) = draft.title.as_deref() {
        check_title(title)?;
    }
    if let Some(content) = draft.content.as_deref() {
        check_content(content)?;
    }

    if apply_update(store, &id, draft)? == UpdateOutcome::Applied {
        println!("Updated note {id}");
    }
    Ok(())
}

pub fn delete_note(store: &mut NoteStore, args: DeleteArgs) -> Result<()> {
    let id = resolve_note_id(store, &args.id)?;
    let title = store
        .note(&id)
        .map(|note| note.title.clone())
        .unwrap_or_default();

    if !args.yes && !confirm(&format!("Delete '{title}'?"))? {
        println!("Kept note {id}");
        return Ok(());
    }

    store.delete(&id)?;
    for notice in store.drain_notices() {
        println!("{notice}");
    }
    Ok(())
}

pub fn export_note(store: &NoteStore, args: ExportArgs) -> Result<()> {
    let id = resolve_note_id(store, &args.id)?;
    let note = store.note(&id).context("note vanished while reading")?;

    if !args.yes && !confirm(&format!("Download note '{}'?", note.title))? {
        return Ok(());
    }

    let dir = match args.out {
        Some(dir) => dir,
        None => env::current_dir().context("resolving current directory")?,
    };
    let path = export::write_note(note, &dir)?;
    println!("Exported {}", path.display());
    Ok(())
}

pub fn info_note(store: &NoteStore, args: InfoArgs) -> Result<()> {
    let id = resolve_note_id(store, &args.id)?;
    let note = store.note(&id).context("note vanished while reading")?;

    println!("Title       {}", note.title);
    println!("Id          {}", note.id);
    println!("Created     {}", format_timestamp(note.created_at));
    println!("Updated     {}", format_timestamp(note.updated_at));
    println!("Words       {}", note.word_count());
    println!("Characters  {}", note.char_count());
    Ok(())
}

pub fn watch(config: &AppConfig, store: &mut NoteStore) -> Result<()> {
    let watcher = StoreWatcher::start(store.file().clone(), &config.watch)?;
    println!(
        "Watching {} (Ctrl-C to stop)",
        store.file().path().display()
    );
    print_collection(store);

    loop {
        if watcher.wait_timeout(Duration::from_millis(250)).is_some() {
            store.reconcile();
            println!("Store changed in another instance:");
            print_collection(store);
        }
    }
}

fn print_collection(store: &NoteStore) {
    if store.is_empty() {
        println!("  (no notes)");
        return;
    }
    for note in store.notes() {
        let marker = if store.selected_note_id() == Some(note.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            " {marker} {}  updated {}",
            note.title,
            format_timestamp(note.updated_at)
        );
    }
}

/// Resolve user input to a note id, accepting a unique id prefix.
fn resolve_note_id(store: &NoteStore, input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        bail!("note id cannot be empty");
    }
    if store.note(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<&str> = store
        .notes()
        .iter()
        .filter(|note| note.id.starts_with(input))
        .map(|note| note.id.as_str())
        .collect();
    match matches.as_slice() {
        [] => bail!("no note matching '{input}'"),
        [only] => Ok((*only).to_string()),
        _ => bail!("note id '{input}' is ambiguous"),
    }
}

fn check_title(title: &str) -> Result<()> {
    if title.chars().count() > MAX_TITLE_CHARS {
        bail!("note titles are limited to {MAX_TITLE_CHARS} characters");
    }
    Ok(())
}

fn check_content(content: &str) -> Result<()> {
    if content.chars().count() > MAX_CONTENT_CHARS {
        bail!("note content is limited to {MAX_CONTENT_CHARS} characters");
    }
    Ok(())
}

fn confirm(message: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{message} [y/N] ")?;
    stdout.flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    if buf.is_empty() {
        Ok(None)
    } else {
        Ok(Some(buf))
    }
}

fn format_timestamp(dt: OffsetDateTime) -> String {
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| dt.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::storage::StoreFile;
    use crate::store::Note;

    fn store_with_ids(temp: &TempDir, ids: &[&str]) -> NoteStore {
        let now = OffsetDateTime::now_utc();
        let notes: Vec<Note> = ids
            .iter()
            .map(|id| Note {
                id: (*id).to_string(),
                title: format!("Note {id}"),
                content: String::new(),
                created_at: now,
                updated_at: now,
            })
            .collect();
        let file = StoreFile::new(temp.path().join("notes.json"));
        file.persist(&notes).expect("seeding store");
        NoteStore::open(file)
    }

    #[test]
    fn resolve_accepts_exact_id_and_unique_prefix() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_with_ids(&temp, &["aaa-1", "bbb-2"]);

        assert_eq!(resolve_note_id(&store, "aaa-1").expect("exact"), "aaa-1");
        assert_eq!(resolve_note_id(&store, "bbb").expect("prefix"), "bbb-2");
    }

    #[test]
    fn resolve_rejects_unknown_ambiguous_and_empty_input() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_with_ids(&temp, &["aaa-1", "aaa-2"]);

        assert!(resolve_note_id(&store, "zzz").is_err());
        assert!(resolve_note_id(&store, "aaa").is_err());
        assert!(resolve_note_id(&store, "  ").is_err());
    }

    #[test]
    fn new_note_applies_title_and_content() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("notes.json"));
        let mut store = NoteStore::open(file);
        store.set_throttle(Duration::ZERO);

        new_note(
            &mut store,
            NewArgs {
                title: Some("Groceries".into()),
                content: Some("milk, eggs".into()),
            },
        )
        .expect("new note");

        assert_eq!(store.len(), 1);
        let note = &store.notes()[0];
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.content, "milk, eggs");
    }

    #[test]
    fn new_note_rejects_over_long_title_before_creating_anything() {
        let temp = TempDir::new().expect("temp dir");
        let file = StoreFile::new(temp.path().join("notes.json"));
        let mut store = NoteStore::open(file);
        store.set_throttle(Duration::ZERO);

        let result = new_note(
            &mut store,
            NewArgs {
                title: Some("t".repeat(MAX_TITLE_CHARS + 1)),
                content: Some("body".into()),
            },
        );

        assert!(result.is_err());
        assert!(store.is_empty(), "boundary check must run before create");
    }

    #[test]
    fn edit_note_rejects_over_long_content_at_the_boundary() {
        let temp = TempDir::new().expect("temp dir");
        let mut store = store_with_ids(&temp, &["aaa-1"]);

        let result = edit_note(
            &mut store,
            EditArgs {
                id: "aaa-1".into(),
                title: None,
                content: Some("x".repeat(MAX_CONTENT_CHARS + 1)),
            },
        );

        assert!(result.is_err());
        assert!(store.notes()[0].content.is_empty());
    }

    #[test]
    fn edit_note_updates_title() {
        let temp = TempDir::new().expect("temp dir");
        let mut store = store_with_ids(&temp, &["aaa-1"]);

        edit_note(
            &mut store,
            EditArgs {
                id: "aaa".into(),
                title: Some("Renamed".into()),
                content: None,
            },
        )
        .expect("edit");

        assert_eq!(store.notes()[0].title, "Renamed");
    }
}
