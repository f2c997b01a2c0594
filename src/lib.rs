pub mod cli;
pub mod config;
pub mod core;
pub mod host;
pub mod utils;

pub use config::Settings;
pub use core::{
    BatchOrchestrator, BatchReport, MetadataResolver, NoteWriter, RedirectResolver, UrlDiscovery,
    VideoRecord,
};
