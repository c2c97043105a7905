// Declare submodules for the archive domain
pub mod types;
pub mod sanitize;
pub mod scanner;
pub mod assembler;

pub use types::{Archive, Entry, EntryKind, EntryMetadata, OpenedArchive, RawEntry};
pub use sanitize::{sanitize_path, validate_entry_path, PathRejection};
pub use scanner::ArchiveScanner;
pub use assembler::{EntryOutcome, ResultAssembler};
