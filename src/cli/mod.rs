use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ConfigLoader;
use crate::storage::StoreFile;
use crate::store::NoteStore;

pub mod commands;

use self::commands::{DeleteArgs, EditArgs, ExportArgs, InfoArgs, NewArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(
    name = "quicknotes",
    version,
    about = "Local-first plain-text notes shared across running instances"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over QUICKNOTES_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over QUICKNOTES_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all notes, newest first (default)
    List,
    /// Create a new note
    New(NewArgs),
    /// Print a note's content
    Show(ShowArgs),
    /// Change a note's title or content
    Edit(EditArgs),
    /// Delete a note permanently
    Delete(DeleteArgs),
    /// Export a note as a plain-text file
    Export(ExportArgs),
    /// Show a note's metadata and statistics
    Info(InfoArgs),
    /// Run in the foreground, mirroring changes made by other instances
    Watch,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("QUICKNOTES_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("QUICKNOTES_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;

    let file = StoreFile::new(config.storage.store_path.clone());
    let mut store = NoteStore::open(file);

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => commands::list_notes(&store),
        Commands::New(args) => commands::new_note(&mut store, args),
        Commands::Show(args) => commands::show_note(&store, args),
        Commands::Edit(args) => commands::edit_note(&mut store, args),
        Commands::Delete(args) => commands::delete_note(&mut store, args),
        Commands::Export(args) => commands::export_note(&store, args),
        Commands::Info(args) => commands::info_note(&store, args),
        Commands::Watch => commands::watch(&config, &mut store),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
