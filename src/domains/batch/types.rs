//! Type definitions for the batch domain.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::domains::compression::compressors::guess_mime_type;
use crate::errors::{DomainError, DomainResult};

/// MIME essences that mark an input item as an archive
const ARCHIVE_MIME_TYPES: [&str; 2] = ["application/zip", "application/x-zip-compressed"];

/// How many leading bytes are read to sniff a file's type
const SNIFF_LEN: usize = 8192;

/// Where an item's bytes live
#[derive(Debug, Clone)]
pub enum ItemSource {
    Memory(Arc<Vec<u8>>),
    File(PathBuf),
}

/// One caller-submitted file; never mutated by the pipeline
#[derive(Debug, Clone)]
pub struct InputItem {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub source: ItemSource,
}

impl InputItem {
    /// Wrap in-memory bytes. Without a MIME hint the type is sniffed from content,
    /// falling back to the extension.
    pub fn from_bytes(name: impl Into<String>, mime_type: Option<&str>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = match mime_type {
            Some(mime_type) => mime_type.to_string(),
            None => sniff_mime_type(&name, &data),
        };
        Self {
            size: data.len() as u64,
            name,
            mime_type,
            source: ItemSource::Memory(Arc::new(data)),
        }
    }

    /// Reference a file on disk; bytes are only loaded when the item is processed.
    pub async fn from_path(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| DomainError::File(format!("Path has no file name: {}", path.display())))?;

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| DomainError::File(format!("Failed to open {}: {}", path.display(), e)))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| DomainError::File(format!("Failed to stat {}: {}", path.display(), e)))?
            .len();

        let mut head = vec![0u8; SNIFF_LEN];
        let read = file
            .read(&mut head)
            .await
            .map_err(|e| DomainError::File(format!("Failed to read {}: {}", path.display(), e)))?;
        head.truncate(read);

        Ok(Self {
            mime_type: sniff_mime_type(&name, &head),
            name,
            size,
            source: ItemSource::File(path.to_path_buf()),
        })
    }

    /// Reference a file on disk without touching it. The type is guessed from the
    /// name and the size is left at 0; a missing file surfaces when it is read.
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            mime_type: guess_mime_type(&name).to_string(),
            name,
            size: 0,
            source: ItemSource::File(path.to_path_buf()),
        }
    }

    /// Load the raw bytes.
    pub async fn read_bytes(&self) -> DomainResult<Arc<Vec<u8>>> {
        self.source.read_bytes().await
    }

    /// Archive by MIME hint or by a `.zip` name.
    pub fn is_archive(&self) -> bool {
        let by_mime = self
            .mime_type
            .parse::<mime::Mime>()
            .map(|m| ARCHIVE_MIME_TYPES.contains(&m.essence_str()))
            .unwrap_or(false);
        by_mime || self.name.to_lowercase().ends_with(".zip")
    }
}

impl ItemSource {
    pub async fn read_bytes(&self) -> DomainResult<Arc<Vec<u8>>> {
        match self {
            ItemSource::Memory(data) => Ok(data.clone()),
            ItemSource::File(path) => tokio::fs::read(path)
                .await
                .map(Arc::new)
                .map_err(|e| DomainError::File(format!("Failed to read {}: {}", path.display(), e))),
        }
    }
}

fn sniff_mime_type(name: &str, head: &[u8]) -> String {
    infer::get(head)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| guess_mime_type(name).to_string())
}

/// Per-item processing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    PassThrough,
    Opened,
    Validated,
    Counted { documents: usize },
    Compressing { done: usize, total: usize },
    Assembling,
    Done,
    /// Bad path or oversized name
    Invalid,
    /// Unreadable input or an unexpected error in any step
    Failed,
    Cancelled,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::PassThrough
                | ItemState::Done
                | ItemState::Invalid
                | ItemState::Failed
                | ItemState::Cancelled
        )
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::Pending => write!(f, "pending"),
            ItemState::PassThrough => write!(f, "pass-through"),
            ItemState::Opened => write!(f, "opened"),
            ItemState::Validated => write!(f, "validated"),
            ItemState::Counted { documents } => write!(f, "counted({})", documents),
            ItemState::Compressing { done, total } => write!(f, "compressing({}/{})", done, total),
            ItemState::Assembling => write!(f, "assembling"),
            ItemState::Done => write!(f, "done"),
            ItemState::Invalid => write!(f, "invalid"),
            ItemState::Failed => write!(f, "failed"),
            ItemState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final status of one output item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not an archive, returned as submitted
    PassedThrough,
    /// A new archive was assembled
    Compressed,
    /// Validated only, returned as submitted
    Skipped,
    /// Rejected by path validation, returned as submitted
    Invalid,
    /// Unreadable or failed while processing, returned as submitted
    Failed,
    /// Not processed because cancellation was requested
    Cancelled,
}

/// Statistics for one processed archive
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStats {
    pub original_size: i64,
    pub output_size: i64,
    pub entries: usize,
    pub documents_found: usize,
    pub documents_compressed: usize,
    pub documents_failed: usize,
    pub documents_skipped: usize,
    pub space_saved_bytes: i64,
    pub space_saved_percentage: f64,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl ArchiveStats {
    pub fn new(original_size: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            original_size: original_size as i64,
            output_size: original_size as i64,
            entries: 0,
            documents_found: 0,
            documents_compressed: 0,
            documents_failed: 0,
            documents_skipped: 0,
            space_saved_bytes: 0,
            space_saved_percentage: 0.0,
            started_at,
            duration_ms: 0,
        }
    }

    /// Record the final size and elapsed time.
    pub fn finish(&mut self, output_size: usize) {
        self.output_size = output_size as i64;
        self.space_saved_bytes = self.original_size - self.output_size;
        self.space_saved_percentage = if self.original_size > 0 {
            (self.space_saved_bytes as f64 / self.original_size as f64) * 100.0
        } else {
            0.0
        };
        self.duration_ms = (Utc::now() - self.started_at).num_milliseconds();
    }
}

/// One result item, in the same position as its input
#[derive(Debug, Clone)]
pub struct OutputItem {
    pub name: String,
    pub mime_type: String,
    pub source: ItemSource,
    pub status: ItemStatus,
    pub error: Option<DomainError>,
    pub stats: Option<ArchiveStats>,
}

impl OutputItem {
    /// The input item itself, handed back unchanged.
    pub fn unchanged(input: &InputItem, status: ItemStatus) -> Self {
        Self {
            name: input.name.clone(),
            mime_type: input.mime_type.clone(),
            source: input.source.clone(),
            status,
            error: None,
            stats: None,
        }
    }

    pub fn with_error(mut self, error: DomainError) -> Self {
        self.error = Some(error);
        self
    }

    pub async fn read_bytes(&self) -> DomainResult<Arc<Vec<u8>>> {
        self.source.read_bytes().await
    }

    pub fn report(&self) -> ItemReport {
        ItemReport {
            name: self.name.clone(),
            status: self.status,
            error: self.error.as_ref().map(|e| e.to_string()),
            stats: self.stats.clone(),
        }
    }
}

/// Serializable summary of one output item
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub status: ItemStatus,
    pub error: Option<String>,
    pub stats: Option<ArchiveStats>,
}

/// Ordered outputs of one batch run
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub run_id: Uuid,
    pub items: Vec<OutputItem>,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }

    pub fn reports(&self) -> Vec<ItemReport> {
        self.items.iter().map(OutputItem::report).collect()
    }
}
