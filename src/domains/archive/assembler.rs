//! Output archive serialization

use std::io::{Cursor, Write};
use tokio::task;
use zip::{write::FileOptions, ZipWriter};

use crate::errors::{DomainError, DomainResult};
use super::types::{Archive, Entry};

/// What happens to one entry on the way out
#[derive(Debug, Clone)]
pub enum EntryOutcome {
    /// Copy the original bytes (directories, opaque files, fallbacks)
    Unchanged,
    /// Substitute new bytes for a document
    Replaced(Vec<u8>),
}

/// Writes entries back out in their original order and under their original names
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler {
    compression_level: i32,
}

impl ResultAssembler {
    pub fn new(compression_level: i32) -> Self {
        Self { compression_level }
    }

    /// Serialize on a blocking thread; the archive is consumed.
    pub async fn assemble(&self, archive: Archive, outcomes: Vec<EntryOutcome>) -> DomainResult<Vec<u8>> {
        let assembler = *self;
        task::spawn_blocking(move || assembler.assemble_sync(&archive, &outcomes))
            .await
            .map_err(|e| DomainError::Internal(format!("Task join error: {}", e)))?
    }

    pub fn assemble_sync(&self, archive: &Archive, outcomes: &[EntryOutcome]) -> DomainResult<Vec<u8>> {
        if archive.len() != outcomes.len() {
            return Err(DomainError::Internal(format!(
                "Entry outcome count {} does not match archive entry count {}",
                outcomes.len(),
                archive.len()
            )));
        }

        let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (entry, outcome) in archive.entries().iter().zip(outcomes) {
            let options = self.options_for(entry);

            if entry.is_dir() {
                zip_writer.add_directory(entry.name.as_str(), options)
                    .map_err(|e| DomainError::Archive(format!("Failed to add directory {}: {}", entry.name, e)))?;
                continue;
            }

            let data: &[u8] = match outcome {
                EntryOutcome::Replaced(bytes) => bytes,
                EntryOutcome::Unchanged => &entry.data,
            };

            zip_writer.start_file(entry.name.as_str(), options)
                .map_err(|e| DomainError::Archive(format!("Failed to create file in ZIP: {}", e)))?;
            zip_writer.write_all(data)
                .map_err(|e| DomainError::Archive(format!("Failed to write to ZIP: {}", e)))?;
        }

        let cursor = zip_writer.finish()
            .map_err(|e| DomainError::Archive(format!("Failed to finalize ZIP: {}", e)))?;

        Ok(cursor.into_inner())
    }

    fn options_for(&self, entry: &Entry) -> FileOptions {
        let mut options = FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level))
            .last_modified_time(entry.metadata.last_modified)
            .large_file(entry.data.len() as u64 >= u32::MAX as u64);
        if let Some(mode) = entry.metadata.unix_mode {
            options = options.unix_permissions(mode);
        }
        options
    }
}
