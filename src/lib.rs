pub mod cli;
pub mod config;
pub mod export;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use storage::StoreFile;
pub use store::{Note, NoteStore};
