//! Opens archive bytes, validates every entry path and classifies entries

use std::io::{Cursor, Read};
use std::sync::Arc;
use tokio::task;
use zip::ZipArchive;

use crate::config::ProcessorConfig;
use crate::domains::compression::compressors::has_extension;
use crate::errors::{DomainError, DomainResult};
use super::sanitize::{validate_entry_path, PathRejection};
use super::types::{Archive, Entry, EntryKind, EntryMetadata, OpenedArchive, RawEntry};

/// Turns raw container bytes into a validated `Archive`
#[derive(Debug, Clone)]
pub struct ArchiveScanner {
    max_name_length: usize,
    document_extensions: Vec<String>,
    max_input_bytes: u64,
    max_extracted_bytes: u64,
}

impl ArchiveScanner {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            max_name_length: config.max_name_length,
            document_extensions: config.document_extensions.clone(),
            max_input_bytes: config.max_input_bytes,
            max_extracted_bytes: config.max_extracted_bytes,
        }
    }

    /// Parse the container on a blocking thread.
    pub async fn open(&self, bytes: Arc<Vec<u8>>) -> DomainResult<OpenedArchive> {
        let scanner = self.clone();
        task::spawn_blocking(move || scanner.open_sync(&bytes))
            .await
            .map_err(|e| DomainError::Internal(format!("Task join error: {}", e)))?
    }

    /// Parse the container and read every entry in its stored order.
    pub fn open_sync(&self, bytes: &[u8]) -> DomainResult<OpenedArchive> {
        if bytes.len() as u64 > self.max_input_bytes {
            return Err(DomainError::Archive(format!(
                "Archive too large for in-memory processing: {} bytes > {} bytes",
                bytes.len(),
                self.max_input_bytes
            )));
        }

        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DomainError::Archive(format!("Failed to read archive: {}", e)))?;

        let mut entries = Vec::with_capacity(archive.len());
        let mut extracted: u64 = 0;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)
                .map_err(|e| DomainError::Archive(format!("Failed to read entry {} in archive: {}", i, e)))?;

            let name = file.name().to_owned();
            let is_dir = name.ends_with('/') || name.ends_with('\\');
            let metadata = EntryMetadata {
                last_modified: file.last_modified(),
                unix_mode: file.unix_mode(),
            };

            let remaining = self.max_extracted_bytes.saturating_sub(extracted);
            if file.size() > remaining {
                return Err(self.expansion_error());
            }

            // Headers are not trusted: the read itself stops one byte past the allowance
            let mut data = Vec::new();
            if !is_dir {
                (&mut file)
                    .take(remaining.saturating_add(1))
                    .read_to_end(&mut data)
                    .map_err(|e| DomainError::Archive(format!("Failed to read entry {}: {}", name, e)))?;
            }
            extracted += data.len() as u64;
            if extracted > self.max_extracted_bytes {
                return Err(self.expansion_error());
            }

            entries.push(RawEntry {
                name,
                is_dir,
                data,
                metadata,
            });
        }

        Ok(OpenedArchive {
            entries,
            size_bytes: bytes.len(),
        })
    }

    /// Sanitize and length-check every entry; the first bad path rejects the archive.
    fn expansion_error(&self) -> DomainError {
        DomainError::Archive(format!("Archive expands beyond {} bytes", self.max_extracted_bytes))
    }

    pub fn validate(&self, opened: OpenedArchive) -> DomainResult<Archive> {
        let mut archive = Archive::new(opened.size_bytes);

        for raw in opened.entries {
            let path = match validate_entry_path(&raw.name, self.max_name_length) {
                Ok(path) => path,
                Err(rejection) => return Err(invalid_archive(&rejection, &raw.name)),
            };

            let kind = self.classify(&path, raw.is_dir);
            let entry = Entry {
                name: raw.name,
                path,
                kind,
                data: raw.data,
                metadata: raw.metadata,
            };

            if let Err(duplicate) = archive.push(entry) {
                return Err(invalid_archive(&PathRejection::Duplicate, &duplicate.name));
            }
        }

        Ok(archive)
    }

    /// Number of entries the engine will be offered.
    pub fn count_documents(&self, archive: &Archive) -> usize {
        archive.document_count()
    }

    /// Directory by trailing separator, document by extension, opaque otherwise.
    pub fn classify(&self, path: &str, is_dir: bool) -> EntryKind {
        if is_dir {
            EntryKind::Directory
        } else if has_extension(path, &self.document_extensions) {
            EntryKind::Document
        } else {
            EntryKind::Opaque
        }
    }
}

fn invalid_archive(rejection: &PathRejection, name: &str) -> DomainError {
    let reason = match rejection {
        PathRejection::NameTooLong { .. } => format!("Files with {} detected", rejection),
        other => format!("Entry rejected ({})", other),
    };
    log::warn!("Rejecting archive: {}: {}", reason, name);
    DomainError::InvalidArchive {
        reason,
        paths: vec![name.to_string()],
    }
}
