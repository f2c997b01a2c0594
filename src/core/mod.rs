pub mod batch;
pub mod discover;
pub mod record;
pub mod redirect;
pub mod resolver;
pub mod template;
pub mod writer;

pub use batch::{BatchOrchestrator, BatchReport};
pub use discover::UrlDiscovery;
pub use record::{BatchItemResult, ContentKind, ItemOutcome, ResolutionMethod, VideoRecord};
pub use redirect::RedirectResolver;
pub use resolver::MetadataResolver;
pub use writer::{NoteWriter, WriteOutcome};
