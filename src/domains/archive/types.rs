//! Type definitions for the archive domain.

use serde::Serialize;
use std::collections::HashMap;

/// How an entry is treated by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    /// Name ends with a separator; carries no bytes
    Directory,
    /// Extension marks it as eligible for the engine
    Document,
    /// Anything else, copied through untouched
    Opaque,
}

/// Codec metadata carried from the input entry to the output entry
#[derive(Debug, Clone, Copy)]
pub struct EntryMetadata {
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            last_modified: zip::DateTime::default(),
            unix_mode: None,
        }
    }
}

/// Entry as read from the container, before any path validation
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub is_dir: bool,
    pub data: Vec<u8>,
    pub metadata: EntryMetadata,
}

/// Container that parsed but has not been validated yet
#[derive(Debug, Clone)]
pub struct OpenedArchive {
    pub entries: Vec<RawEntry>,
    pub size_bytes: usize,
}

/// One validated member of an archive
#[derive(Debug, Clone)]
pub struct Entry {
    /// Name exactly as stored in the input container
    pub name: String,
    /// Sanitized, traversal-free relative path
    pub path: String,
    pub kind: EntryKind,
    pub data: Vec<u8>,
    pub metadata: EntryMetadata,
}

impl Entry {
    pub fn is_document(&self) -> bool {
        self.kind == EntryKind::Document
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Validated archive: entries in original order, indexed by sanitized path
#[derive(Debug, Clone, Default)]
pub struct Archive {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    size_bytes: usize,
}

impl Archive {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            size_bytes,
        }
    }

    /// Append an entry, handing it back if its sanitized path is already taken.
    pub fn push(&mut self, entry: Entry) -> Result<(), Entry> {
        if self.index.contains_key(&entry.path) {
            return Err(entry);
        }
        self.index.insert(entry.path.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn document_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_document()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, kind: EntryKind) -> Entry {
        Entry {
            name: path.to_string(),
            path: path.to_string(),
            kind,
            data: Vec::new(),
            metadata: EntryMetadata::default(),
        }
    }

    #[test]
    fn test_archive_keeps_order_and_rejects_duplicates() {
        let mut archive = Archive::new(0);
        archive.push(entry("docs/", EntryKind::Directory)).unwrap();
        archive.push(entry("docs/b.pdf", EntryKind::Document)).unwrap();
        archive.push(entry("docs/a.txt", EntryKind::Opaque)).unwrap();
        assert!(archive.push(entry("docs/b.pdf", EntryKind::Opaque)).is_err());

        let paths: Vec<&str> = archive.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/", "docs/b.pdf", "docs/a.txt"]);
        assert_eq!(archive.document_count(), 1);
        assert_eq!(archive.get("docs/a.txt").map(|e| e.kind), Some(EntryKind::Opaque));
    }
}
